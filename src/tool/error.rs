//! Tool-scoped errors: wrap failures with the offending tool's name.

use crate::error::ErrorKind;
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ToolError {
    NotFound(String),
    ValidationFailed { tool: String, message: String },
    ExecutionFailed { tool: String, message: String },
    /// A memory store operation failed underneath a memory-* tool adapter.
    /// Kept distinct from `ExecutionFailed` so `kind()` reports
    /// `ErrorKind::MemoryStore` per the error taxonomy.
    MemoryStore { tool: String, message: String },
}

impl ToolError {
    pub fn not_found(tool: impl Into<String>) -> Self {
        ToolError::NotFound(tool.into())
    }

    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::ValidationFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn memory_store(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::MemoryStore {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) => ErrorKind::ToolNotFound,
            ToolError::ValidationFailed { .. } => ErrorKind::InvalidToolArguments,
            ToolError::ExecutionFailed { .. } => ErrorKind::ToolExecution,
            ToolError::MemoryStore { .. } => ErrorKind::MemoryStore,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "tool '{}' is not registered", name),
            ToolError::ValidationFailed { tool, message } => {
                write!(f, "tool '{}' argument validation failed: {}", tool, message)
            }
            ToolError::ExecutionFailed { tool, message } => {
                write!(f, "tool '{}' execution failed: {}", tool, message)
            }
            ToolError::MemoryStore { tool, message } => {
                write!(f, "tool '{}' memory store error: {}", tool, message)
            }
        }
    }
}

impl From<crate::memory::MemoryError> for ToolError {
    fn from(e: crate::memory::MemoryError) -> Self {
        ToolError::memory_store("memory", e.to_string())
    }
}

impl StdError for ToolError {}
