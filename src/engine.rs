//! The task service: the agent loop proper.
//!
//! Drives a [`Task`] against an [`Agent`] through repeated "reason → (maybe)
//! invoke tools → observe → continue" rounds until the LLM produces a final
//! answer, the iteration cap is hit, the caller cancels, or a hard error
//! occurs. Everything else in this crate exists to be called from here.

use crate::agent::Agent;
use crate::cancellation::Cancellation;
use crate::error::EngineError;
use crate::event::{publish_fire_and_forget, AgentEvent, EventPublisher, InMemoryEventPublisher};
use crate::hooks::Hooks;
use crate::ids::{AgentId, TaskId};
use crate::llm::{FinishReason, LlmClient};
use crate::message::{Message, ToolCall, ToolCallStatus};
use crate::task::{RunResult, Task, TokenUsage};
use crate::tool::ToolExecutor;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Default bound on concurrently in-flight tool calls when the parallel
/// dispatch strategy is enabled.
const DEFAULT_MAX_PARALLEL_TOOL_CALLS: usize = 8;

/// Executes tasks against an agent using an LLM client and a tool executor.
///
/// Cheap to clone: every field is an `Arc` or a plain value, so a clone can be
/// handed to a spawned task during parallel tool dispatch without the caller
/// losing its own handle.
#[derive(Clone)]
pub struct TaskService {
    llm_client: Arc<dyn LlmClient>,
    executor: Arc<dyn ToolExecutor>,
    event_publisher: Arc<dyn EventPublisher>,
    hooks: Hooks,
    parallel_tool_execution: bool,
    max_parallel_tool_calls: usize,
}

impl TaskService {
    /// A service with an in-memory event publisher, no hooks, and sequential
    /// tool dispatch. Use the `with_*` methods to customize.
    pub fn new(llm_client: Arc<dyn LlmClient>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            llm_client,
            executor,
            event_publisher: Arc::new(InMemoryEventPublisher::new()),
            hooks: Hooks::new(),
            parallel_tool_execution: false,
            max_parallel_tool_calls: DEFAULT_MAX_PARALLEL_TOOL_CALLS,
        }
    }

    pub fn with_event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = publisher;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Opt in to the parallel tool-dispatch strategy. It only actually
    /// engages for a response carrying more than one tool call; a single
    /// call always runs through the sequential path.
    pub fn with_parallel_tool_execution(mut self, enabled: bool) -> Self {
        self.parallel_tool_execution = enabled;
        self
    }

    pub fn with_max_parallel_tool_calls(mut self, max: usize) -> Self {
        self.max_parallel_tool_calls = max.max(1);
        self
    }

    /// Convenience wrapper around [`Self::run_task`] matching the "SendMessage"
    /// use case described in the system overview: create a task for this turn
    /// and run it.
    pub async fn send_message(
        &self,
        ctx: &Cancellation,
        agent: &mut Agent,
        task_name: impl Into<String>,
        input: impl Into<String>,
    ) -> RunResult {
        let task = Task::new(TaskId::generate(), task_name, input);
        self.run_task(ctx, agent, task).await
    }

    /// Run `task` against `agent` to completion, guaranteeing termination
    /// within `agent.max_iterations()` rounds.
    pub async fn run_task(&self, ctx: &Cancellation, agent: &mut Agent, mut task: Task) -> RunResult {
        let start = Instant::now();
        task.mark_running();
        agent.reset_iteration();

        if let Err(e) = Hooks::run_task_hook(&self.hooks.before_task, agent.id(), &task).await {
            return self.finish(agent, task, start, Err(e), 0, TokenUsage::default()).await;
        }

        publish_fire_and_forget(
            self.event_publisher.as_ref(),
            AgentEvent::TaskStarted {
                agent_id: agent.id().clone(),
                task_id: task.id.clone(),
            },
        )
        .await;

        agent.append_message(Message::user(task.input.clone()));

        let mut tool_call_count: u32 = 0;
        let mut token_usage = TokenUsage::default();
        let mut outcome: Option<Result<String, EngineError>> = None;

        while agent.can_continue() {
            if ctx.is_cancelled() {
                outcome = Some(Err(EngineError::context_canceled()));
                break;
            }

            agent.increment_iteration();
            task.iteration_count = agent.iteration();

            if let Err(e) = Hooks::run_task_hook(&self.hooks.before_llm_call, agent.id(), &task).await {
                outcome = Some(Err(e));
                break;
            }

            let mut request_messages = Vec::with_capacity(agent.messages().len() + 1);
            request_messages.push(Message::system(agent.system_prompt()));
            request_messages.extend_from_slice(agent.messages());

            let tool_definitions = self.executor.get_tool_definitions().await;

            if log::log_enabled!(log::Level::Debug) {
                log::debug!(
                    "agent '{}' task '{}': calling llm, iteration {}",
                    agent.id(),
                    task.id,
                    task.iteration_count
                );
            }

            let response = match self.llm_client.run(ctx, &request_messages, &tool_definitions).await {
                Ok(r) => r,
                Err(e) => {
                    outcome = Some(Err(e));
                    break;
                }
            };

            if let Some(usage) = &response.token_usage {
                token_usage.accumulate(usage);
            }

            // Unlike before_* hooks, an after_llm_call error is logged, not
            // fatal: it observes a round that already happened.
            if let Some(hook) = &self.hooks.after_llm_call {
                if let Err(e) = hook(agent.id().clone(), task.clone()).await {
                    if log::log_enabled!(log::Level::Warn) {
                        log::warn!("after_llm_call hook returned an error (ignored): {}", e);
                    }
                }
            }

            agent.append_message(response.assistant_message.clone());

            if response.has_tool_calls() {
                let messages = self
                    .dispatch_tool_calls(ctx, agent.id(), &task.id, response.tool_calls)
                    .await;
                tool_call_count += messages.len() as u32;
                for message in messages {
                    agent.append_message(message);
                }
                continue;
            }

            if response.finish_reason == FinishReason::Stop {
                outcome = Some(Ok(response.assistant_message.content.clone()));
            } else {
                outcome = Some(Err(EngineError::no_llm_response()));
            }
            break;
        }

        let result = outcome.unwrap_or_else(|| Err(EngineError::max_iterations_reached(agent.max_iterations())));
        self.finish(agent, task, start, result, tool_call_count, token_usage).await
    }

    /// Finalize a task: set its terminal status, fire `after_task` (never
    /// fatal), publish the matching event, record it in the agent's task log,
    /// and build the `RunResult`. Called on every path, including a
    /// `before_task` hook failure that short-circuited before the loop ran.
    async fn finish(
        &self,
        agent: &mut Agent,
        mut task: Task,
        start: Instant,
        result: Result<String, EngineError>,
        tool_call_count: u32,
        token_usage: TokenUsage,
    ) -> RunResult {
        match &result {
            Ok(output) => task.mark_completed(output.clone()),
            Err(e) => task.mark_failed(e.to_string()),
        }

        if let Some(hook) = &self.hooks.after_task {
            if let Err(e) = hook(agent.id().clone(), task.clone()).await {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("after_task hook returned an error (ignored): {}", e);
                }
            }
        }

        match &result {
            Ok(output) => {
                publish_fire_and_forget(
                    self.event_publisher.as_ref(),
                    AgentEvent::TaskCompleted {
                        agent_id: agent.id().clone(),
                        task_id: task.id.clone(),
                        output: output.clone(),
                        iteration_count: task.iteration_count,
                    },
                )
                .await;
            }
            Err(e) => {
                publish_fire_and_forget(
                    self.event_publisher.as_ref(),
                    AgentEvent::TaskFailed {
                        agent_id: agent.id().clone(),
                        task_id: task.id.clone(),
                        error: e.to_string(),
                        iteration_count: task.iteration_count,
                    },
                )
                .await;
            }
        }

        let iteration_count = task.iteration_count;
        let task_id = task.id.clone();
        agent.add_task(task);

        let success = result.is_ok();
        let output = result.as_ref().ok().cloned().unwrap_or_default();

        RunResult {
            task_id,
            success,
            output,
            error: result.err(),
            duration: start.elapsed(),
            iteration_count,
            tool_call_count,
            token_usage,
        }
    }

    /// Dispatch a batch of tool calls from a single assistant turn. Returns
    /// one `role=tool` message per call, always in the original request
    /// order regardless of which strategy ran them.
    async fn dispatch_tool_calls(
        &self,
        ctx: &Cancellation,
        agent_id: &AgentId,
        task_id: &TaskId,
        tool_calls: Vec<ToolCall>,
    ) -> Vec<Message> {
        if self.parallel_tool_execution && tool_calls.len() > 1 {
            self.dispatch_parallel(ctx, agent_id, task_id, tool_calls).await
        } else {
            self.dispatch_sequential(ctx, agent_id, task_id, tool_calls).await
        }
    }

    async fn dispatch_sequential(
        &self,
        ctx: &Cancellation,
        agent_id: &AgentId,
        task_id: &TaskId,
        tool_calls: Vec<ToolCall>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let message = execute_one(
                self.executor.clone(),
                self.hooks.clone(),
                self.event_publisher.clone(),
                ctx.clone(),
                agent_id.clone(),
                task_id.clone(),
                call,
            )
            .await;
            messages.push(message);
        }
        messages
    }

    /// Bounded worker pool: at most `max_parallel_tool_calls` calls execute
    /// concurrently. A failure in one call never cancels its siblings. Every
    /// call's handle is spawned and then awaited in the original request
    /// order, which is enough to reassemble messages in that order without a
    /// separate sort — each handle is already running concurrently with its
    /// siblings by the time we await it. A panicking worker still yields a
    /// message (an `"Error: …"` one, carrying the call's own id) rather than
    /// being dropped, so the call count invariant — one `role=tool` message
    /// per dispatched call — holds even on that path.
    async fn dispatch_parallel(
        &self,
        ctx: &Cancellation,
        agent_id: &AgentId,
        task_id: &TaskId,
        tool_calls: Vec<ToolCall>,
    ) -> Vec<Message> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_tool_calls));
        let mut handles = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let executor = self.executor.clone();
            let hooks = self.hooks.clone();
            let event_publisher = self.event_publisher.clone();
            let ctx = ctx.clone();
            let agent_id = agent_id.clone();
            let task_id = task_id.clone();
            let semaphore = semaphore.clone();
            let call_id = call.id.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                execute_one(executor, hooks, event_publisher, ctx, agent_id, task_id, call).await
            });
            handles.push((call_id, handle));
        }

        let mut messages = Vec::with_capacity(handles.len());
        for (call_id, handle) in handles {
            match handle.await {
                Ok(message) => messages.push(message),
                Err(e) => {
                    if log::log_enabled!(log::Level::Error) {
                        log::error!("tool dispatch worker panicked: {}", e);
                    }
                    messages.push(Message::tool(call_id, format!("Error: tool dispatch worker panicked: {}", e)));
                }
            }
        }

        messages
    }
}

/// Run the before-hook/execute/after-hook/publish sequence for one tool call.
/// Shared by both dispatch strategies so their per-call behavior can never
/// drift apart.
async fn execute_one(
    executor: Arc<dyn ToolExecutor>,
    hooks: Hooks,
    event_publisher: Arc<dyn EventPublisher>,
    ctx: Cancellation,
    agent_id: AgentId,
    task_id: TaskId,
    mut call: ToolCall,
) -> Message {
    if let Err(e) = Hooks::run_tool_call_hook(&hooks.before_tool_call, &agent_id, &call).await {
        call.fail(e.to_string());
        publish_fire_and_forget(
            event_publisher.as_ref(),
            AgentEvent::ToolCallExecuted {
                agent_id,
                task_id,
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                success: false,
            },
        )
        .await;
        return Message::tool(call.id, format!("Error: {}", e));
    }

    call.mark_executing();

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("executing tool call '{}' ({})", call.id, call.name);
    }

    let content = match executor.execute(&ctx, &call.name, &call.arguments).await {
        Ok(result) => {
            call.complete(result.clone());
            result
        }
        Err(e) => {
            call.fail(e.to_string());
            format!("Error: {}", e)
        }
    };

    if let Some(hook) = &hooks.after_tool_call {
        if let Err(e) = hook(agent_id.clone(), call.clone()).await {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("after_tool_call hook returned an error for '{}' (ignored): {}", call.name, e);
            }
        }
    }

    publish_fire_and_forget(
        event_publisher.as_ref(),
        AgentEvent::ToolCallExecuted {
            agent_id,
            task_id,
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: call.status == ToolCallStatus::Completed,
        },
    )
    .await;

    Message::tool(call.id, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentOptions};
    use crate::llm::LlmResponse;
    use crate::message::Role;
    use crate::tool::{InMemoryToolExecutor, ToolDefinition, ToolFunction};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    /// Replays a fixed script of responses, one per call; panics if exhausted.
    struct ScriptedLlmClient {
        responses: AsyncMutex<std::collections::VecDeque<Result<LlmResponse, EngineError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlmClient {
        fn new(responses: Vec<Result<LlmResponse, EngineError>>) -> Self {
            Self {
                responses: AsyncMutex::new(responses.into()),
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
            self.responses
                .lock()
                .await
                .pop_front()
                .expect("scripted llm client exhausted")
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

    fn tool_call_response(calls: Vec<ToolCall>) -> LlmResponse {
        LlmResponse {
            finish_reason: FinishReason::ToolCalls,
            assistant_message: Message::assistant_with_tool_calls("", calls.clone()),
            tool_calls: calls,
            token_usage: None,
        }
    }

    fn echo_executor() -> Arc<InMemoryToolExecutor> {
        Arc::new(InMemoryToolExecutor::new())
    }

    async fn register_calculate(executor: &InMemoryToolExecutor, result: &'static str) {
        let function: ToolFunction = Arc::new(move |_ctx, _args| Box::pin(async move { Ok(result.to_string()) }));
        executor.register_tool("calculate", function).await;
    }

    #[tokio::test]
    async fn s1_direct_completion() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![Ok(stop_response("Hello!"))]));
        let executor = echo_executor();
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let service = TaskService::new(llm, executor).with_event_publisher(publisher.clone());

        let mut agent = Agent::new("a1", "You are helpful.", AgentOptions::new());
        let result = service.send_message(&Cancellation::none(), &mut agent, "turn", "Hi").await;

        assert!(result.success);
        assert_eq!(result.output, "Hello!");
        assert_eq!(result.iteration_count, 1);
        assert_eq!(result.tool_call_count, 0);
        assert_eq!(publisher.topics().await, vec!["agent.task.started", "agent.task.completed"]);
    }

    #[tokio::test]
    async fn s2_single_tool_call() {
        let call = ToolCall::new("tc-1", "calculate", r#"{"expression":"2 + 2"}"#);
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(tool_call_response(vec![call])),
            Ok(stop_response("The answer is 4.")),
        ]));
        let executor = echo_executor();
        register_calculate(&executor, "4").await;
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let service = TaskService::new(llm, executor).with_event_publisher(publisher.clone());

        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        let result = service
            .send_message(&Cancellation::none(), &mut agent, "turn", "What is 2+2?")
            .await;

        assert!(result.success);
        assert_eq!(result.output, "The answer is 4.");
        assert_eq!(result.iteration_count, 2);
        assert_eq!(result.tool_call_count, 1);

        let messages = agent.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[1].has_tool_calls());
        assert_eq!(messages[2].role, Role::Tool);
        assert_eq!(messages[2].content, "4");
        assert_eq!(messages[3].content, "The answer is 4.");

        assert_eq!(
            publisher.topics().await,
            vec!["agent.task.started", "agent.toolcall.executed", "agent.task.completed"]
        );
    }

    #[tokio::test]
    async fn s3_parallel_preserves_request_order_despite_completion_order() {
        // Delay is keyed by argument payload (not arrival order), so "C" is
        // guaranteed to finish first despite being requested last.
        let calls = vec![
            ToolCall::new("A", "slow", r#"{"delay_ms":30}"#),
            ToolCall::new("B", "slow", r#"{"delay_ms":20}"#),
            ToolCall::new("C", "slow", r#"{"delay_ms":0}"#),
        ];
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(tool_call_response(calls)),
            Ok(stop_response("done")),
        ]));
        let executor = echo_executor();
        let function: ToolFunction = Arc::new(move |_ctx, args| {
            Box::pin(async move {
                let parsed: serde_json::Value = serde_json::from_str(&args).unwrap();
                let delay_ms = parsed["delay_ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(args)
            })
        });
        executor.register_tool("slow", function).await;
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let service = TaskService::new(llm, executor)
            .with_event_publisher(publisher.clone())
            .with_parallel_tool_execution(true);

        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        let result = service
            .send_message(&Cancellation::none(), &mut agent, "turn", "go")
            .await;

        assert!(result.success);
        assert_eq!(result.tool_call_count, 3);

        let tool_messages: Vec<&Message> = agent.messages().iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_messages.len(), 3);
        assert_eq!(tool_messages[0].tool_call_id.as_ref().unwrap().as_str(), "A");
        assert_eq!(tool_messages[1].tool_call_id.as_ref().unwrap().as_str(), "B");
        assert_eq!(tool_messages[2].tool_call_id.as_ref().unwrap().as_str(), "C");

        let executed_events = publisher
            .events()
            .await
            .into_iter()
            .filter(|e| e.topic() == "agent.toolcall.executed")
            .count();
        assert_eq!(executed_events, 3);
    }

    #[tokio::test]
    async fn s4_iteration_cap_fails_with_max_iterations_reached() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(tool_call_response(vec![ToolCall::new("tc-1", "calculate", "{}")])),
            Ok(tool_call_response(vec![ToolCall::new("tc-2", "calculate", "{}")])),
            Ok(tool_call_response(vec![ToolCall::new("tc-3", "calculate", "{}")])),
        ]));
        let executor = echo_executor();
        register_calculate(&executor, "never enough").await;
        let service = TaskService::new(llm, executor);

        let mut agent = Agent::new("a1", "sys", AgentOptions::new().with_max_iterations(3));
        let result = service
            .send_message(&Cancellation::none(), &mut agent, "turn", "keep going")
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(crate::error::ErrorKind::MaxIterationsReached));
        assert_eq!(result.iteration_count, 3);
        assert_eq!(result.tool_call_count, 3);
    }

    #[tokio::test]
    async fn s5_cancellation_before_first_llm_call_fails_with_no_further_calls() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let executor = echo_executor();
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let service = TaskService::new(llm.clone(), executor).with_event_publisher(publisher.clone());

        let ctx = Cancellation::none();
        ctx.cancel();

        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        let result = service.send_message(&ctx, &mut agent, "turn", "hi").await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(crate::error::ErrorKind::ContextCanceled));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.topics().await, vec!["agent.task.started", "agent.task.failed"]);
    }

    #[tokio::test]
    async fn before_task_hook_error_fails_without_starting() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let executor = echo_executor();
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let hooks = Hooks::new().with_before_task(Arc::new(|_agent_id, _task| {
            Box::pin(async { Err(EngineError::new(crate::error::ErrorKind::Hook, "vetoed")) })
        }));
        let service = TaskService::new(llm, executor)
            .with_event_publisher(publisher.clone())
            .with_hooks(hooks);

        let mut agent = Agent::new("a1", "sys", AgentOptions::new());
        let result = service
            .send_message(&Cancellation::none(), &mut agent, "turn", "hi")
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(crate::error::ErrorKind::Hook));
        assert_eq!(agent.message_count(), 0);
        assert_eq!(publisher.topics().await, vec!["agent.task.failed"]);
    }
}
