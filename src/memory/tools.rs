//! Memory tool adapters: marshal between JSON tool arguments and
//! [`MemoryStore`] operations, for exposure to the LLM as callable tools.

use super::note::{MemoryNote, SourceType, DEFAULT_IMPORTANCE};
use super::store::{MemorySearchOptions, MemoryStore};
use crate::cancellation::Cancellation;
use crate::ids::NoteId;
use crate::llm::EmbeddingClient;
use crate::tool::{ToolDefinition, ToolError, ToolExecutor, ToolFunction, ToolParameter, ToolParameterType};
use serde_json::Value as JsonValue;
use std::sync::Arc;

const TOOL_MEMORY_WRITE: &str = "memory_write";
const TOOL_MEMORY_SEARCH: &str = "memory_search";
const TOOL_MEMORY_GET: &str = "memory_get";
const TOOL_MEMORY_DELETE: &str = "memory_delete";

fn required_string(tool: &str, object: &JsonValue, field: &str) -> Result<String, ToolError> {
    object
        .get(field)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::validation(tool, format!("{}: required field missing", field)))
}

fn optional_string(object: &JsonValue, field: &str) -> Option<String> {
    object.get(field).and_then(JsonValue::as_str).map(str::to_string)
}

fn optional_string_vec(object: &JsonValue, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(JsonValue::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn optional_u64(object: &JsonValue, field: &str) -> Option<u64> {
    object.get(field).and_then(JsonValue::as_u64)
}

/// Wires a [`MemoryStore`] (and optional [`EmbeddingClient`]) behind the
/// `memory_write`/`memory_search`/`memory_get`/`memory_delete` tool contract.
///
/// `default_user_id`/`default_session_id` are applied when a call omits the
/// corresponding scope field.
pub struct MemoryToolService {
    store: Arc<dyn MemoryStore>,
    embedding_client: Option<Arc<dyn EmbeddingClient>>,
    default_user_id: Option<String>,
    default_session_id: Option<String>,
}

impl MemoryToolService {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            embedding_client: None,
            default_user_id: None,
            default_session_id: None,
        }
    }

    pub fn with_embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding_client = Some(client);
        self
    }

    pub fn with_default_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.default_user_id = Some(user_id.into());
        self
    }

    pub fn with_default_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.default_session_id = Some(session_id.into());
        self
    }

    pub async fn memory_write(&self, ctx: &Cancellation, args_json: &str) -> Result<String, ToolError> {
        let parsed: JsonValue = serde_json::from_str(args_json)
            .map_err(|e| ToolError::validation(TOOL_MEMORY_WRITE, format!("invalid JSON: {}", e)))?;

        let source_type = SourceType::parse(&required_string(TOOL_MEMORY_WRITE, &parsed, "source_type")?);
        let raw_content = required_string(TOOL_MEMORY_WRITE, &parsed, "raw_content")?;
        let summary = required_string(TOOL_MEMORY_WRITE, &parsed, "summary")?;

        let mut note = MemoryNote::new(NoteId::generate(), source_type, raw_content, summary)
            .with_context_description(optional_string(&parsed, "context_description").unwrap_or_default())
            .with_keywords(optional_string_vec(&parsed, "keywords"))
            .with_tags(optional_string_vec(&parsed, "tags"))
            .with_importance(
                optional_u64(&parsed, "importance").map(|v| v as u8).unwrap_or(DEFAULT_IMPORTANCE),
            );

        if let Some(user_id) = optional_string(&parsed, "user_id").or_else(|| self.default_user_id.clone()) {
            note = note.with_user_id(user_id);
        }
        if let Some(session_id) =
            optional_string(&parsed, "session_id").or_else(|| self.default_session_id.clone())
        {
            note = note.with_session_id(session_id);
        }
        if let Some(task_id) = optional_string(&parsed, "task_id") {
            note = note.with_task_id(task_id);
        }

        if let Some(embedder) = &self.embedding_client {
            match embedder.embed(ctx, &note.searchable_text()).await {
                Ok(vector) => note = note.with_embedding(vector),
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        log::warn!("embedding failed for memory note, persisting without one: {}", e);
                    }
                }
            }
        }

        let note_id = note.id.clone();
        self.store.write(note).await?;

        Ok(serde_json::json!({"status": "success", "note_id": note_id.as_str()}).to_string())
    }

    pub async fn memory_search(&self, _ctx: &Cancellation, args_json: &str) -> Result<String, ToolError> {
        let parsed: JsonValue = serde_json::from_str(args_json)
            .map_err(|e| ToolError::validation(TOOL_MEMORY_SEARCH, format!("invalid JSON: {}", e)))?;

        let query = required_string(TOOL_MEMORY_SEARCH, &parsed, "query")?;
        let limit = optional_u64(&parsed, "limit").unwrap_or(10) as usize;

        let mut options = MemorySearchOptions::new();
        if let Some(user_id) = optional_string(&parsed, "user_id") {
            options = options.with_user_id(user_id);
        }
        if let Some(session_id) = optional_string(&parsed, "session_id") {
            options = options.with_session_id(session_id);
        }
        if let Some(task_id) = optional_string(&parsed, "task_id") {
            options = options.with_task_id(task_id);
        }
        let source_types = optional_string_vec(&parsed, "source_types")
            .into_iter()
            .map(|s| SourceType::parse(&s))
            .collect::<Vec<_>>();
        if !source_types.is_empty() {
            options = options.with_source_types(source_types);
        }
        let tags = optional_string_vec(&parsed, "tags");
        if !tags.is_empty() {
            options = options.with_tags(tags);
        }
        if let Some(min_importance) = optional_u64(&parsed, "min_importance") {
            options = options.with_min_importance(min_importance as u8);
        }

        let notes = self.store.search(&query, limit, &options).await?;

        let results: Vec<JsonValue> = notes
            .iter()
            .map(|n| {
                serde_json::json!({
                    "id": n.id.as_str(),
                    "source_type": n.source_type.as_str(),
                    "summary": n.summary,
                    "context_description": n.context_description,
                    "tags": n.tags,
                    "importance": n.importance,
                })
            })
            .collect();

        Ok(serde_json::json!({"status": "success", "count": results.len(), "results": results}).to_string())
    }

    pub async fn memory_get(&self, _ctx: &Cancellation, args_json: &str) -> Result<String, ToolError> {
        let parsed: JsonValue = serde_json::from_str(args_json)
            .map_err(|e| ToolError::validation(TOOL_MEMORY_GET, format!("invalid JSON: {}", e)))?;
        let id = required_string(TOOL_MEMORY_GET, &parsed, "id")?;

        let note = self.store.get(&id).await?;

        Ok(serde_json::json!({"status": "success", "note": note}).to_string())
    }

    pub async fn memory_delete(&self, _ctx: &Cancellation, args_json: &str) -> Result<String, ToolError> {
        let parsed: JsonValue = serde_json::from_str(args_json)
            .map_err(|e| ToolError::validation(TOOL_MEMORY_DELETE, format!("invalid JSON: {}", e)))?;
        let id = required_string(TOOL_MEMORY_DELETE, &parsed, "id")?;

        let deleted = self.store.delete(&id).await?;

        Ok(serde_json::json!({"status": "success", "deleted": deleted}).to_string())
    }
}

/// Register the four memory tools (functions and declarations) on an
/// executor, wired to `service`.
pub async fn register_memory_tools(
    executor: &crate::tool::InMemoryToolExecutor,
    service: Arc<MemoryToolService>,
) {
    let write_service = service.clone();
    let write_fn: ToolFunction = Arc::new(move |ctx, args| {
        let service = write_service.clone();
        Box::pin(async move { service.memory_write(&ctx, &args).await })
    });
    executor.register_tool(TOOL_MEMORY_WRITE, write_fn).await;
    executor
        .register_tool_definition(
            ToolDefinition::new(TOOL_MEMORY_WRITE, "Persist a long-term memory note.")
                .with_parameter(ToolParameter::new("source_type", ToolParameterType::String).required())
                .with_parameter(ToolParameter::new("raw_content", ToolParameterType::String).required())
                .with_parameter(ToolParameter::new("summary", ToolParameterType::String).required())
                .with_parameter(ToolParameter::new("context_description", ToolParameterType::String))
                .with_parameter(ToolParameter::new("keywords", ToolParameterType::Array))
                .with_parameter(ToolParameter::new("tags", ToolParameterType::Array))
                .with_parameter(ToolParameter::new("importance", ToolParameterType::Integer)),
        )
        .await;

    let search_service = service.clone();
    let search_fn: ToolFunction = Arc::new(move |ctx, args| {
        let service = search_service.clone();
        Box::pin(async move { service.memory_search(&ctx, &args).await })
    });
    executor.register_tool(TOOL_MEMORY_SEARCH, search_fn).await;
    executor
        .register_tool_definition(
            ToolDefinition::new(TOOL_MEMORY_SEARCH, "Search long-term memory notes.")
                .with_parameter(ToolParameter::new("query", ToolParameterType::String).required())
                .with_parameter(ToolParameter::new("limit", ToolParameterType::Integer)),
        )
        .await;

    let get_service = service.clone();
    let get_fn: ToolFunction = Arc::new(move |ctx, args| {
        let service = get_service.clone();
        Box::pin(async move { service.memory_get(&ctx, &args).await })
    });
    executor.register_tool(TOOL_MEMORY_GET, get_fn).await;
    executor
        .register_tool_definition(
            ToolDefinition::new(TOOL_MEMORY_GET, "Fetch a memory note by id.")
                .with_parameter(ToolParameter::new("id", ToolParameterType::String).required()),
        )
        .await;

    let delete_service = service;
    let delete_fn: ToolFunction = Arc::new(move |ctx, args| {
        let service = delete_service.clone();
        Box::pin(async move { service.memory_delete(&ctx, &args).await })
    });
    executor.register_tool(TOOL_MEMORY_DELETE, delete_fn).await;
    executor
        .register_tool_definition(
            ToolDefinition::new(TOOL_MEMORY_DELETE, "Delete a memory note by id.")
                .with_parameter(ToolParameter::new("id", ToolParameterType::String).required()),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMemoryStore;

    fn service() -> MemoryToolService {
        MemoryToolService::new(Arc::new(InMemoryMemoryStore::new()))
    }

    #[tokio::test]
    async fn write_search_get_round_trip() {
        let service = service();
        let ctx = Cancellation::none();

        let write_result = service
            .memory_write(
                &ctx,
                r#"{"source_type":"preference","raw_content":"User prefers dark mode","summary":"Dark-mode preference","importance":4}"#,
            )
            .await
            .unwrap();
        let write_json: JsonValue = serde_json::from_str(&write_result).unwrap();
        assert_eq!(write_json["status"], "success");
        let note_id = write_json["note_id"].as_str().unwrap().to_string();

        let search_result = service
            .memory_search(&ctx, r#"{"query":"dark","limit":5}"#)
            .await
            .unwrap();
        let search_json: JsonValue = serde_json::from_str(&search_result).unwrap();
        assert_eq!(search_json["count"], 1);

        let get_result = service
            .memory_get(&ctx, &serde_json::json!({"id": note_id}).to_string())
            .await
            .unwrap();
        let get_json: JsonValue = serde_json::from_str(&get_result).unwrap();
        assert_eq!(get_json["note"]["raw_content"], "User prefers dark mode");
        assert_eq!(get_json["note"]["importance"], 4);
    }

    #[tokio::test]
    async fn get_missing_note_is_a_tool_error() {
        let service = service();
        let err = service
            .memory_get(&Cancellation::none(), r#"{"id":"missing"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MemoryStore);
    }

    #[tokio::test]
    async fn write_requires_summary() {
        let service = service();
        let err = service
            .memory_write(&Cancellation::none(), r#"{"source_type":"fact","raw_content":"x"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidToolArguments);
    }
}
