//! Drives a [`TaskService`] with a scripted LLM client through a turn that
//! calls the memory tools, the same way `tool_integration_tests.rs` drives
//! `Agent::send()` against a real tool end to end rather than unit-testing
//! the tool in isolation.

use agentcore::memory::{register_memory_tools, InMemoryMemoryStore, MemoryToolService};
use agentcore::tool::{InMemoryToolExecutor, ToolDefinition};
use agentcore::{
    Agent, AgentOptions, Cancellation, EngineError, FinishReason, LlmClient, LlmResponse, Message, TaskService,
    ToolCall,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Replays one scripted [`LlmResponse`] per call; panics if the script runs dry.
struct ScriptedLlmClient {
    responses: Mutex<std::collections::VecDeque<LlmResponse>>,
    calls: AtomicUsize,
}

impl ScriptedLlmClient {
    fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn run(
        &self,
        _ctx: &Cancellation,
        _messages: &[Message],
        _tool_definitions: &[ToolDefinition],
    ) -> Result<LlmResponse, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses.lock().await.pop_front().expect("scripted llm client exhausted"))
    }
}

fn tool_call_response(call: ToolCall) -> LlmResponse {
    LlmResponse {
        finish_reason: FinishReason::ToolCalls,
        assistant_message: Message::assistant_with_tool_calls("", vec![call.clone()]),
        tool_calls: vec![call],
        token_usage: None,
    }
}

fn stop_response(content: &str) -> LlmResponse {
    LlmResponse {
        finish_reason: FinishReason::Stop,
        assistant_message: Message::assistant(content),
        tool_calls: Vec::new(),
        token_usage: None,
    }
}

#[tokio::test]
async fn agent_remembers_a_preference_and_recalls_it_on_request() {
    let store = Arc::new(InMemoryMemoryStore::new());
    let memory_service = Arc::new(MemoryToolService::new(store));
    let executor = InMemoryToolExecutor::new();
    register_memory_tools(&executor, memory_service).await;

    let write_args = json!({
        "source_type": "preference",
        "raw_content": "User prefers dark mode",
        "summary": "Dark-mode preference"
    })
    .to_string();

    let llm = Arc::new(ScriptedLlmClient::new(vec![
        tool_call_response(ToolCall::new("tc-1", "memory_write", write_args)),
        stop_response("Got it, I'll remember you like dark mode."),
    ]));

    let service = TaskService::new(llm, Arc::new(executor));
    let mut agent = Agent::new("a1", "You are a helpful assistant with memory.", AgentOptions::new());

    let result = service
        .send_message(&Cancellation::none(), &mut agent, "turn-1", "Remember that I prefer dark mode.")
        .await;

    assert!(result.success);
    assert_eq!(result.tool_call_count, 1);
    assert_eq!(result.output, "Got it, I'll remember you like dark mode.");

    let tool_message = agent
        .messages()
        .iter()
        .find(|m| m.role == agentcore::Role::Tool)
        .expect("memory_write tool message");
    let written: serde_json::Value = serde_json::from_str(&tool_message.content).unwrap();
    assert_eq!(written["status"], "success");
}
