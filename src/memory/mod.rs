//! Long-term memory: typed notes, a store contract, and the LLM-callable
//! tool adapters built on top of it.

mod error;
mod note;
mod store;
mod tools;

pub use error::MemoryError;
pub use note::{MemoryNote, SourceType, DEFAULT_IMPORTANCE};
pub use store::{InMemoryMemoryStore, MemorySearchOptions, MemoryStore};
pub use tools::{register_memory_tools, MemoryToolService};
