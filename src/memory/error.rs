//! Memory-store-scoped errors.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum MemoryError {
    NotFound(String),
    Backend(String),
}

impl MemoryError {
    pub fn not_found(id: impl Into<String>) -> Self {
        MemoryError::NotFound(id.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        MemoryError::Backend(message.into())
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::NotFound(id) => write!(f, "memory note '{}' not found", id),
            MemoryError::Backend(message) => write!(f, "memory store error: {}", message),
        }
    }
}

impl StdError for MemoryError {}
