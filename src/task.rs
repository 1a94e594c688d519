//! Task entity: one user turn end-to-end, from input to final answer or
//! failure.

use crate::ids::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A [`Task`]'s lifecycle state. Terminal statuses (`Completed`, `Failed`)
/// are absorbing: nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One user turn. Created per turn, mutated only by the [`crate::engine::TaskService`],
/// retained in the owning agent's task log afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub input: String,
    pub status: TaskStatus,
    pub iteration_count: u32,
    pub output: Option<String>,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: input.into(),
            status: TaskStatus::Pending,
            iteration_count: 0,
            output: None,
            error: None,
            start_time: Utc::now(),
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
    }

    pub fn mark_completed(&mut self, output: impl Into<String>) {
        self.output = Some(output.into());
        self.error = None;
        self.status = TaskStatus::Completed;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = TaskStatus::Failed;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Token accounting for a single LLM invocation or an accumulated run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Produced once per `run_task`. `success` implies an empty `error`;
/// otherwise `error` carries the terminal failure.
#[derive(Debug)]
pub struct RunResult {
    pub task_id: TaskId,
    pub success: bool,
    pub output: String,
    pub error: Option<crate::error::EngineError>,
    pub duration: Duration,
    pub iteration_count: u32,
    pub tool_call_count: u32,
    pub token_usage: TokenUsage,
}

impl RunResult {
    pub fn error_kind(&self) -> Option<crate::error::ErrorKind> {
        self.error.as_ref().map(|e| e.kind())
    }
}
