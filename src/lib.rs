//! Bounded-iteration agent execution engine.
//!
//! Drives an LLM-powered assistant through repeated "reason → (maybe) invoke
//! tools → observe → continue" rounds until it produces a final answer, runs
//! out of iterations, is cancelled, or hits a hard error. Concrete LLM
//! transport, embedding transport, and persistence are collaborators this
//! crate only references through traits ([`llm::LlmClient`],
//! [`llm::EmbeddingClient`], [`memory::MemoryStore`]) — bring your own.
//!
//! Start at [`engine::TaskService`] for the loop itself, [`agent::Agent`] for
//! the conversation state it drives, and [`memory`] for the long-term note
//! store exposed to the LLM as tools.

pub mod agent;
pub mod cancellation;
pub mod engine;
pub mod error;
pub mod event;
pub mod hooks;
pub mod ids;
pub mod llm;
pub mod memory;
pub mod message;
pub mod task;
pub mod tool;

pub use agent::{Agent, AgentOptions};
pub use cancellation::Cancellation;
pub use engine::TaskService;
pub use error::{EngineError, ErrorKind};
pub use event::{AgentEvent, EventPublisher, InMemoryEventPublisher};
pub use hooks::Hooks;
pub use ids::{AgentId, NoteId, TaskId, ToolCallId};
pub use llm::{EmbeddingClient, FinishReason, LlmClient, LlmResponse};
pub use message::{Message, Role, ToolCall, ToolCallStatus};
pub use task::{RunResult, Task, TaskStatus, TokenUsage};
