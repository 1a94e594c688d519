//! Agent aggregate: per-agent mutable conversation state and its controlled
//! mutation.
//!
//! The task service takes an `Agent` by reference per call; the agent never
//! references the task service back, so there is no cyclic wiring to manage.

use crate::ids::AgentId;
use crate::message::Message;
use crate::task::{Task, TaskStatus};
use std::collections::HashMap;

/// Recognized construction options. `max_messages == 0` means unbounded.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub max_iterations: u32,
    pub max_messages: usize,
    pub metadata: HashMap<String, String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_messages: 0,
            metadata: HashMap::new(),
        }
    }
}

impl AgentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The long-lived conversational participant. Owns identity, an immutable
/// system prompt, the message window, the iteration counter, and the task
/// log.
pub struct Agent {
    id: AgentId,
    system_prompt: String,
    messages: Vec<Message>,
    iteration: u32,
    max_iterations: u32,
    max_messages: usize,
    metadata: HashMap<String, String>,
    task_log: Vec<Task>,
}

impl Agent {
    pub fn new(id: impl Into<AgentId>, system_prompt: impl Into<String>, options: AgentOptions) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            iteration: 0,
            max_iterations: options.max_iterations,
            max_messages: options.max_messages,
            metadata: options.metadata,
            task_log: Vec::new(),
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Push `message`; if `max_messages > 0` and the window now exceeds the
    /// cap, drop oldest entries until the size equals the cap (strict FIFO —
    /// see the design notes on tool/assistant pairing).
    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
        if self.max_messages > 0 {
            while self.messages.len() > self.max_messages {
                self.messages.remove(0);
            }
        }
    }

    /// Empty the window. Does not touch the iteration counter or task log.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn reset_iteration(&mut self) {
        self.iteration = 0;
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn can_continue(&self) -> bool {
        self.iteration < self.max_iterations
    }

    pub fn add_task(&mut self, task: Task) {
        self.task_log.push(task);
    }

    pub fn task_count(&self) -> usize {
        self.task_log.len()
    }

    pub fn completed_task_count(&self) -> usize {
        self.task_log
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }

    pub fn failed_task_count(&self) -> usize {
        self.task_log
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Returns `""` if the key is absent, matching the spec's "empty string
    /// on absence" contract rather than an `Option`.
    pub fn get_metadata(&self, key: &str) -> String {
        self.metadata.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_oldest_messages_past_cap() {
        let mut agent = Agent::new("a1", "you are helpful", AgentOptions::new().with_max_messages(2));
        agent.append_message(Message::user("one"));
        agent.append_message(Message::user("two"));
        agent.append_message(Message::user("three"));

        assert_eq!(agent.message_count(), 2);
        assert_eq!(agent.messages()[0].content, "two");
        assert_eq!(agent.messages()[1].content, "three");
    }

    #[test]
    fn unbounded_by_default() {
        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        for i in 0..50 {
            agent.append_message(Message::user(format!("msg {}", i)));
        }
        assert_eq!(agent.message_count(), 50);
    }

    #[test]
    fn can_continue_respects_max_iterations() {
        let mut agent = Agent::new("a1", "sys", AgentOptions::new().with_max_iterations(2));
        assert!(agent.can_continue());
        agent.increment_iteration();
        assert!(agent.can_continue());
        agent.increment_iteration();
        assert!(!agent.can_continue());
    }

    #[test]
    fn clear_messages_preserves_iteration_and_task_log() {
        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        agent.append_message(Message::user("hi"));
        agent.increment_iteration();
        agent.add_task(Task::new("t1", "turn", "hi"));

        agent.clear_messages();

        assert_eq!(agent.message_count(), 0);
        assert_eq!(agent.iteration(), 1);
        assert_eq!(agent.task_count(), 1);
    }

    #[test]
    fn metadata_defaults_to_empty_string() {
        let agent = Agent::new("a1", "sys", AgentOptions::new());
        assert_eq!(agent.get_metadata("missing"), "");
    }
}
