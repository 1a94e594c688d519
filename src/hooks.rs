//! Lifecycle hooks: optional callbacks that can observe or veto a
//! task/tool-call transition.
//!
//! Each hook receives an owned snapshot of the subject (a cloned [`Task`] or
//! [`ToolCall`]) rather than a borrow, so hook closures stay `'static` and
//! object-safe across an await point. `before_*` hooks that return an error
//! abort the surrounding operation; `after_*` hook errors are logged but
//! never change the outcome.

use crate::error::{EngineError, ErrorKind};
use crate::ids::AgentId;
use crate::message::ToolCall;
use crate::task::Task;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A `before_task`/`after_task`/`before_llm_call`/`after_llm_call` hook body.
pub type TaskHookFn =
    Arc<dyn Fn(AgentId, Task) -> BoxFuture<Result<(), EngineError>> + Send + Sync>;

/// A `before_tool_call`/`after_tool_call` hook body.
pub type ToolCallHookFn =
    Arc<dyn Fn(AgentId, ToolCall) -> BoxFuture<Result<(), EngineError>> + Send + Sync>;

/// The six optional lifecycle callbacks a [`crate::engine::TaskService`] fires
/// around a run. All fields default to `None` (no-op).
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_task: Option<TaskHookFn>,
    pub after_task: Option<TaskHookFn>,
    pub before_llm_call: Option<TaskHookFn>,
    pub after_llm_call: Option<TaskHookFn>,
    pub before_tool_call: Option<ToolCallHookFn>,
    pub after_tool_call: Option<ToolCallHookFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before_task(mut self, f: TaskHookFn) -> Self {
        self.before_task = Some(f);
        self
    }

    pub fn with_after_task(mut self, f: TaskHookFn) -> Self {
        self.after_task = Some(f);
        self
    }

    pub fn with_before_llm_call(mut self, f: TaskHookFn) -> Self {
        self.before_llm_call = Some(f);
        self
    }

    pub fn with_after_llm_call(mut self, f: TaskHookFn) -> Self {
        self.after_llm_call = Some(f);
        self
    }

    pub fn with_before_tool_call(mut self, f: ToolCallHookFn) -> Self {
        self.before_tool_call = Some(f);
        self
    }

    pub fn with_after_tool_call(mut self, f: ToolCallHookFn) -> Self {
        self.after_tool_call = Some(f);
        self
    }

    /// Run a `before_*`/`after_*` task hook if configured, turning its error
    /// (if any) into a [`EngineError`] tagged with [`crate::error::ErrorKind::Hook`]
    /// regardless of what kind the hook closure's own error carried.
    pub(crate) async fn run_task_hook(
        hook: &Option<TaskHookFn>,
        agent_id: &AgentId,
        task: &Task,
    ) -> Result<(), EngineError> {
        if let Some(f) = hook {
            f(agent_id.clone(), task.clone()).await.map_err(as_hook_error)
        } else {
            Ok(())
        }
    }

    pub(crate) async fn run_tool_call_hook(
        hook: &Option<ToolCallHookFn>,
        agent_id: &AgentId,
        call: &ToolCall,
    ) -> Result<(), EngineError> {
        if let Some(f) = hook {
            f(agent_id.clone(), call.clone()).await.map_err(as_hook_error)
        } else {
            Ok(())
        }
    }
}

/// Coerce a hook closure's error to [`ErrorKind::Hook`], preserving its
/// message and chaining it as the `source` so nothing is lost.
fn as_hook_error(e: EngineError) -> EngineError {
    if e.is(ErrorKind::Hook) {
        e
    } else {
        EngineError::with_source(ErrorKind::Hook, e.to_string(), e)
    }
}
