//! Tool executor: resolves a tool call by name to an effectful function.

use super::definition::ToolDefinition;
use super::error::ToolError;
use super::validate::validate_args;
use crate::cancellation::Cancellation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A registered tool's effectful body: takes the cancellation handle and the
/// raw JSON argument string, returns the plain string result or a
/// [`ToolError`].
pub type ToolFunction = Arc<
    dyn Fn(Cancellation, String) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>
        + Send
        + Sync,
>;

/// Dispatches tool calls by name. Implementations are expected to be safe to
/// call concurrently from multiple workers, since parallel tool dispatch
/// invokes the same executor instance from several tasks at once.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run the tool named `name` with raw JSON `args`. Fails with
    /// [`ErrorKind::ToolNotFound`](crate::error::ErrorKind::ToolNotFound) if
    /// unregistered, or with a validation/execution error otherwise.
    async fn execute(&self, ctx: &Cancellation, name: &str, args: &str) -> Result<String, ToolError>;

    async fn has_tool(&self, name: &str) -> bool;

    async fn get_available_tools(&self) -> Vec<String>;

    async fn get_tool_definitions(&self) -> Vec<ToolDefinition>;
}

/// The default, in-process [`ToolExecutor`]: a pair of registries (functions,
/// declarations) guarded by reader-writer locks, treated as frozen reads
/// after startup registration.
#[derive(Clone, Default)]
pub struct InMemoryToolExecutor {
    functions: Arc<RwLock<HashMap<String, ToolFunction>>>,
    definitions: Arc<RwLock<HashMap<String, ToolDefinition>>>,
}

impl InMemoryToolExecutor {
    pub fn new() -> Self {
        Self {
            functions: Arc::new(RwLock::new(HashMap::new())),
            definitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_tool(&self, name: impl Into<String>, function: ToolFunction) {
        self.functions.write().await.insert(name.into(), function);
    }

    pub async fn register_tool_definition(&self, definition: ToolDefinition) {
        self.definitions
            .write()
            .await
            .insert(definition.name.clone(), definition);
    }

    pub async fn unregister_tool(&self, name: &str) {
        self.functions.write().await.remove(name);
        self.definitions.write().await.remove(name);
    }
}

#[async_trait]
impl ToolExecutor for InMemoryToolExecutor {
    async fn execute(&self, ctx: &Cancellation, name: &str, args: &str) -> Result<String, ToolError> {
        let function = {
            let functions = self.functions.read().await;
            functions.get(name).cloned()
        };
        let function = function.ok_or_else(|| ToolError::not_found(name))?;

        if let Some(def) = self.definitions.read().await.get(name) {
            validate_args(def, args)?;
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("dispatching tool '{}'", name);
        }

        function(ctx.clone(), args.to_string()).await
    }

    async fn has_tool(&self, name: &str) -> bool {
        self.functions.read().await.contains_key(name)
    }

    async fn get_available_tools(&self) -> Vec<String> {
        self.functions.read().await.keys().cloned().collect()
    }

    async fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::definition::{ToolParameter, ToolParameterType};

    fn echo_tool() -> ToolFunction {
        Arc::new(|_ctx, args| Box::pin(async move { Ok(args) }))
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        let executor = InMemoryToolExecutor::new();
        executor.register_tool("echo", echo_tool()).await;

        let result = executor
            .execute(&Cancellation::none(), "echo", r#"{"a":1}"#)
            .await
            .unwrap();
        assert_eq!(result, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn missing_tool_fails_with_not_found() {
        let executor = InMemoryToolExecutor::new();
        let err = executor
            .execute(&Cancellation::none(), "missing", "{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ToolNotFound);
    }

    #[tokio::test]
    async fn validates_before_dispatch() {
        let executor = InMemoryToolExecutor::new();
        executor.register_tool("search", echo_tool()).await;
        executor
            .register_tool_definition(
                ToolDefinition::new("search", "search")
                    .with_parameter(ToolParameter::new("query", ToolParameterType::String).required()),
            )
            .await;

        let err = executor
            .execute(&Cancellation::none(), "search", "{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidToolArguments);
    }
}
