//! LLM and embedding client contracts.
//!
//! Neither trait is implemented by this crate: concrete wire formats for any
//! specific provider are out of scope. These are the seams the engine calls
//! through, following the reference toolkit's `ClientWrapper` trait shape.

use crate::cancellation::Cancellation;
use crate::error::EngineError;
use crate::message::{Message, ToolCall};
use crate::task::TokenUsage;
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The short tag an LLM response carries to tell the engine whether to
/// terminate or continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// `true` when this finish reason means "the assistant wants to invoke
    /// tools before producing a final answer".
    pub fn requests_tools(&self) -> bool {
        matches!(self, FinishReason::ToolCalls)
    }
}

/// The result of a single LLM invocation: immutable once produced.
///
/// Invariant: `tool_calls` is non-empty if and only if `finish_reason`
/// indicates tool use.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub finish_reason: FinishReason,
    pub assistant_message: Message,
    pub tool_calls: Vec<ToolCall>,
    pub token_usage: Option<TokenUsage>,
}

impl LlmResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One operation: run the conversation so far, with the currently registered
/// tool definitions, and produce the next LLM turn.
///
/// The engine places the agent's system prompt as the first message with
/// `role=system`; subsequent messages reflect the agent's window verbatim.
/// Tool definitions are re-sent on every call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn run(
        &self,
        ctx: &Cancellation,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
    ) -> Result<LlmResponse, EngineError>;

    /// Human-readable model identifier, for logging. Collaborators that don't
    /// track one can return a fixed string.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Optional collaborator used only by `memory_write`; its absence silently
/// disables embedding attachment on written notes.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, ctx: &Cancellation, text: &str) -> Result<Vec<f32>, EngineError>;
}
