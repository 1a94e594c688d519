//! Error taxonomy for the agent execution engine.
//!
//! Every fallible operation in this crate eventually surfaces an [`EngineError`]
//! carrying a stable [`ErrorKind`] sentinel, so callers can match on "what kind
//! of failure is this" without downcasting through whatever wrapped it.

use std::error::Error as StdError;
use std::fmt;

/// Stable failure taxonomy, independent of how deeply an error has been wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Ctx-done observed at an iteration boundary.
    ContextCanceled,
    /// `can_continue` became false with no terminal LLM response.
    MaxIterationsReached,
    /// LLM returned no content and no tool calls on a non-terminal finish reason.
    NoLlmResponse,
    /// The LLM client collaborator returned an error.
    LlmTransport,
    /// The executor was asked for an unregistered tool name.
    ToolNotFound,
    /// Argument validation failed against a tool's declared schema.
    InvalidToolArguments,
    /// A registered tool function returned an error.
    ToolExecution,
    /// A before-hook returned an error.
    Hook,
    /// A memory store operation returned an error.
    MemoryStore,
}

impl ErrorKind {
    /// Short machine-stable name, handy for logging and assertions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ContextCanceled => "context-canceled",
            ErrorKind::MaxIterationsReached => "max-iterations-reached",
            ErrorKind::NoLlmResponse => "no-llm-response",
            ErrorKind::LlmTransport => "llm-transport",
            ErrorKind::ToolNotFound => "tool-not-found",
            ErrorKind::InvalidToolArguments => "invalid-tool-arguments",
            ErrorKind::ToolExecution => "tool-execution",
            ErrorKind::Hook => "hook",
            ErrorKind::MemoryStore => "memory-store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-level error: the type returned by `run_task` and anything that can
/// terminate a task.
///
/// Carries structured context (a human-readable message plus, where relevant,
/// the wrapped cause) without losing its [`ErrorKind`] sentinel.
#[derive(Debug)]
pub struct EngineError {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Wrapper-transparent sentinel check: `true` iff this error's kind matches,
    /// regardless of how many layers of context it has accumulated.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn context_canceled() -> Self {
        Self::new(ErrorKind::ContextCanceled, "context canceled")
    }

    pub fn max_iterations_reached(max: u32) -> Self {
        Self::new(
            ErrorKind::MaxIterationsReached,
            format!("reached max iterations ({})", max),
        )
    }

    pub fn no_llm_response() -> Self {
        Self::new(
            ErrorKind::NoLlmResponse,
            "llm returned no content and no tool calls",
        )
    }

    /// Wrap a task id into the message, per the "task errors wrap with the task
    /// ID" contract.
    pub fn for_task(task_id: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, format!("task {}: {}", task_id, message.into()))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<crate::tool::ToolError> for EngineError {
    fn from(e: crate::tool::ToolError) -> Self {
        let kind = e.kind();
        EngineError::with_source(kind, e.to_string(), e)
    }
}

impl From<crate::memory::MemoryError> for EngineError {
    fn from(e: crate::memory::MemoryError) -> Self {
        EngineError::with_source(ErrorKind::MemoryStore, e.to_string(), e)
    }
}
