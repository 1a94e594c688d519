//! Fire-and-forget event publication.
//!
//! Four stable topics mirror the causing action: `started` before any
//! `toolcall.executed`, all of a given iteration's `toolcall.executed` events
//! before the following LLM call, and `completed`/`failed` last.

use crate::error::EngineError;
use crate::ids::{AgentId, TaskId, ToolCallId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stable event topic string, matching the reference toolkit's
/// `agent.*`-namespaced event names.
pub const TOPIC_TASK_STARTED: &str = "agent.task.started";
pub const TOPIC_TASK_COMPLETED: &str = "agent.task.completed";
pub const TOPIC_TASK_FAILED: &str = "agent.task.failed";
pub const TOPIC_TOOLCALL_EXECUTED: &str = "agent.toolcall.executed";

/// One of the four events the engine publishes.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    TaskStarted {
        agent_id: AgentId,
        task_id: TaskId,
    },
    TaskCompleted {
        agent_id: AgentId,
        task_id: TaskId,
        output: String,
        iteration_count: u32,
    },
    TaskFailed {
        agent_id: AgentId,
        task_id: TaskId,
        error: String,
        iteration_count: u32,
    },
    ToolCallExecuted {
        agent_id: AgentId,
        task_id: TaskId,
        tool_call_id: ToolCallId,
        tool_name: String,
        success: bool,
    },
}

impl AgentEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            AgentEvent::TaskStarted { .. } => TOPIC_TASK_STARTED,
            AgentEvent::TaskCompleted { .. } => TOPIC_TASK_COMPLETED,
            AgentEvent::TaskFailed { .. } => TOPIC_TASK_FAILED,
            AgentEvent::ToolCallExecuted { .. } => TOPIC_TOOLCALL_EXECUTED,
        }
    }
}

/// Publishes events. Implementations must tolerate being invoked from
/// multiple concurrent tool-dispatch workers.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AgentEvent) -> Result<(), EngineError>;
}

/// Publish `event`, swallowing (and logging at `warn`) any error so callers
/// never let event publication derail task execution.
pub async fn publish_fire_and_forget(publisher: &dyn EventPublisher, event: AgentEvent) {
    let topic = event.topic();
    if let Err(e) = publisher.publish(event).await {
        if log::log_enabled!(log::Level::Warn) {
            log::warn!("event publish failed for topic '{}': {}", topic, e);
        }
    }
}

/// Default in-process publisher: appends every event to an in-memory log.
/// Exists primarily for tests and default configurations.
#[derive(Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<AgentEvent>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of every event published so far, in publish order.
    pub async fn events(&self) -> Vec<AgentEvent> {
        self.events.read().await.clone()
    }

    /// Convenience view used by assertions: just the topic strings, in order.
    pub async fn topics(&self) -> Vec<&'static str> {
        self.events.read().await.iter().map(|e| e.topic()).collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: AgentEvent) -> Result<(), EngineError> {
        self.events.write().await.push(event);
        Ok(())
    }
}
