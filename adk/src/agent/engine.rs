//! Driver for one agent run: the iterative loop, LLM stream consumption,
//! tool-call accumulation, and tool execution.
//!
//! The loop is a single state machine with an explicit iteration counter, a
//! running conversation, a per-iteration tool-call accumulator, and one event
//! sink. On cancellation every remaining send is best-effort with a 100 ms
//! fallback so the driver never blocks on a gone consumer.
//!
//! Mid-iteration stream failures do not append the partial assistant message
//! to the conversation; only `iteration-completed` appends.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use a2a_types::{Message, Part, Role, TaskState, TaskStatus, ToolCallRequest};

use crate::artifact::ArtifactHelper;
use crate::callback::{CallbackContext, Callbacks, StateMap, ToolContext};
use crate::convert;
use crate::error::AdkError;
use crate::event::ExecutionEvent;
use crate::llm::{ChatStream, LlmClient, LlmRequest, LlmResponse, ToolCallChunk};
use crate::toolbox::{ToolBox, INPUT_REQUIRED_TOOL};

use super::ExecutionContext;

/// Fallback timeout for sends after cancellation.
const BEST_EFFORT_SEND: Duration = Duration::from_millis(100);

pub(super) struct Driver {
    pub agent_name: String,
    pub instruction: Option<String>,
    pub llm: Arc<dyn LlmClient>,
    pub toolbox: Arc<ToolBox>,
    pub callbacks: Arc<Callbacks>,
    pub max_iterations: u32,
    pub ctx: ExecutionContext,
    pub tx: mpsc::Sender<ExecutionEvent>,
}

/// How one LLM streaming call ended.
enum StreamOutcome {
    Finished(LlmResponse),
    Canceled { partial: Option<Message> },
    Failed(AdkError),
}

/// How one round of tool execution ended.
enum ToolRound {
    Continue,
    InputRequired(Message),
    Canceled,
}

impl Driver {
    pub(super) async fn run(self, mut conversation: Vec<Message>) {
        let mut cb_ctx = CallbackContext::new(&self.agent_name, &self.ctx.invocation_id);
        if let Some(task) = &self.ctx.task {
            cb_ctx.task_id = Some(task.id.clone());
            cb_ctx.context_id = Some(task.context_id.clone());
        }

        if let Some(override_msg) = self.callbacks.run_before_agent(&mut cb_ctx) {
            let message = self.stamp(override_msg);
            self.emit(ExecutionEvent::TaskStatusChanged {
                status: TaskStatus::new(TaskState::Completed, Some(message)),
            })
            .await;
            return;
        }

        if !self
            .emit(ExecutionEvent::TaskStatusChanged {
                status: TaskStatus::new(TaskState::Working, None),
            })
            .await
        {
            return;
        }

        for iteration in 1..=self.max_iterations {
            self.ctx.usage.record_iteration();

            let mut wire = convert::to_wire(&conversation);
            if let Some(instruction) = &self.instruction {
                wire = convert::with_system_prompt(instruction, wire);
            }
            let mut request = LlmRequest {
                messages: wire,
                tools: self.toolbox.specs(),
            };

            let response = match self.callbacks.run_before_model(&mut cb_ctx, &mut request) {
                Some(overridden) => {
                    if let Some(u) = &overridden.usage {
                        self.ctx.usage.add_usage(u);
                    }
                    self.callbacks.run_after_model(&mut cb_ctx, overridden)
                }
                None => match self.stream_llm(&request).await {
                    StreamOutcome::Finished(resp) => {
                        self.callbacks.run_after_model(&mut cb_ctx, resp)
                    }
                    StreamOutcome::Canceled { partial } => {
                        self.finish_interrupted(partial, "task interrupted: canceled")
                            .await;
                        return;
                    }
                    StreamOutcome::Failed(err) => {
                        warn!(iteration, "llm stream failed: {err}");
                        let message =
                            self.stamp(Message::assistant(format!("LLM stream failed: {err}")));
                        self.emit(ExecutionEvent::StreamFailed { message }).await;
                        return;
                    }
                },
            };

            let assistant =
                self.stamp(Message::assistant_turn(&response.content, &response.tool_calls));
            conversation.push(assistant.clone());
            self.ctx.usage.record_message();
            if !self
                .emit(ExecutionEvent::IterationCompleted {
                    message: assistant.clone(),
                })
                .await
            {
                return;
            }

            if response.tool_calls.is_empty() {
                let final_message =
                    self.stamp(self.callbacks.run_after_agent(&mut cb_ctx, assistant));
                debug!(iteration, "run completed");
                self.emit(ExecutionEvent::TaskStatusChanged {
                    status: TaskStatus::new(TaskState::Completed, Some(final_message)),
                })
                .await;
                return;
            }

            match self
                .execute_tool_calls(&response.tool_calls, &mut conversation, &mut cb_ctx)
                .await
            {
                ToolRound::Continue => {}
                ToolRound::InputRequired(message) => {
                    self.emit(ExecutionEvent::InputRequired { message }).await;
                    return;
                }
                ToolRound::Canceled => {
                    self.finish_interrupted(None, "task interrupted: canceled")
                        .await;
                    return;
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "iteration budget exhausted");
        if !self
            .emit(ExecutionEvent::TaskStatusChanged {
                status: TaskStatus::new(TaskState::Canceled, None),
            })
            .await
        {
            return;
        }
        let message =
            self.stamp(Message::assistant("task interrupted: maximum iterations reached"));
        self.emit(ExecutionEvent::TaskInterrupted { message }).await;
    }

    /// Consumes one streaming completion: deltas out as events, tool-call
    /// chunks into the per-iteration accumulator, until finish reason, error,
    /// or cancellation.
    async fn stream_llm(&self, request: &LlmRequest) -> StreamOutcome {
        let ChatStream {
            mut chunks,
            mut errors,
        } = match self.llm.stream_chat(request).await {
            Ok(s) => s,
            Err(e) => return StreamOutcome::Failed(e),
        };

        let mut full_content = String::new();
        let mut builders: BTreeMap<u32, ToolCallBuilder> = BTreeMap::new();
        let mut usage = None;
        let mut errors_open = true;

        loop {
            tokio::select! {
                _ = self.ctx.cancel.cancelled() => {
                    let partial = (!full_content.is_empty())
                        .then(|| self.stamp(Message::assistant(full_content.clone())));
                    return StreamOutcome::Canceled { partial };
                }
                err = errors.recv(), if errors_open => {
                    match err {
                        Some(e) => return StreamOutcome::Failed(e),
                        None => errors_open = false,
                    }
                }
                chunk = chunks.recv() => {
                    let Some(chunk) = chunk else { break };
                    if let Some(delta) = chunk.delta.filter(|d| !d.is_empty()) {
                        full_content.push_str(&delta);
                        let message = self.stamp(Message::assistant(delta));
                        if !self.emit(ExecutionEvent::Delta { message }).await {
                            return StreamOutcome::Canceled { partial: None };
                        }
                    }
                    for tc in chunk.tool_calls {
                        accumulate(&mut builders, tc);
                    }
                    if let Some(u) = chunk.usage {
                        self.ctx.usage.add_usage(&u);
                        usage = Some(u);
                    }
                    if chunk.finish_reason.as_deref().is_some_and(|r| !r.is_empty()) {
                        break;
                    }
                }
            }
        }

        StreamOutcome::Finished(LlmResponse {
            content: full_content,
            tool_calls: builders.into_values().map(ToolCallBuilder::into_request).collect(),
            usage,
        })
    }

    /// Executes one round of tool calls. A failing call (argument parse,
    /// lookup miss, execution error) produces an `is_error` tool result and
    /// the round continues with the next call.
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCallRequest],
        conversation: &mut Vec<Message>,
        cb_ctx: &mut CallbackContext,
    ) -> ToolRound {
        let mut pending_input: Option<Message> = None;

        for call in calls {
            self.ctx.usage.record_tool_call();
            if !self
                .emit(ExecutionEvent::ToolStarted {
                    message: self.tool_event(call, None),
                })
                .await
            {
                return ToolRound::Canceled;
            }

            let args = match parse_arguments(&call.arguments) {
                Ok(args) => args,
                Err(detail) => {
                    if !self.fail_tool_call(call, conversation, &detail).await {
                        return ToolRound::Canceled;
                    }
                    continue;
                }
            };

            let Some(tool) = self.toolbox.get(&call.name) else {
                let detail = format!("unknown tool: {}", call.name);
                if !self.fail_tool_call(call, conversation, &detail).await {
                    return ToolRound::Canceled;
                }
                continue;
            };

            let mut tool_ctx = ToolContext::from_callback_context(
                cb_ctx,
                self.ctx.cancel.clone(),
                ArtifactHelper::new(self.tx.clone()),
            );

            let result_map = match self
                .callbacks
                .run_before_tool(tool.as_ref(), &args, &mut tool_ctx)
            {
                Some(map) => map,
                None => match tool.call(args.clone(), &tool_ctx).await {
                    Ok(result) => {
                        let mut map = Map::new();
                        map.insert("result".to_string(), Value::String(result));
                        map
                    }
                    Err(e) => {
                        let mut map = Map::new();
                        map.insert("result".to_string(), Value::String(e.to_string()));
                        map.insert("error".to_string(), Value::String(e.to_string()));
                        map
                    }
                },
            };
            let result_map =
                self.callbacks
                    .run_after_tool(tool.as_ref(), &args, &mut tool_ctx, result_map);
            cb_ctx.state = tool_ctx.state.clone();

            let is_error = result_map.contains_key("error");
            let event = if is_error {
                self.ctx.usage.record_failed_tool_call();
                let detail = result_map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("tool failed")
                    .to_string();
                ExecutionEvent::ToolFailed {
                    message: self.tool_event(call, Some(&detail)),
                }
            } else {
                ExecutionEvent::ToolCompleted {
                    message: self.tool_event(call, None),
                }
            };
            if !self.emit(event).await {
                return ToolRound::Canceled;
            }

            let result_value = result_map.get("result").cloned().unwrap_or(Value::Null);
            let tool_msg =
                self.stamp(Message::tool_result(&call.id, &call.name, result_value, is_error));
            conversation.push(tool_msg.clone());
            self.ctx.usage.record_message();
            if !self
                .emit(ExecutionEvent::ToolResult { message: tool_msg })
                .await
            {
                return ToolRound::Canceled;
            }

            if call.name == INPUT_REQUIRED_TOOL && !is_error {
                let prompt = args
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                pending_input = Some(self.stamp(Message::input_required(prompt)));
            }

            if self.ctx.cancel.is_cancelled() {
                return ToolRound::Canceled;
            }
        }

        match pending_input {
            Some(message) => ToolRound::InputRequired(message),
            None => ToolRound::Continue,
        }
    }

    /// Failure path shared by argument-parse errors and lookup misses:
    /// tool-failed event, error tool result in the conversation, tool-result
    /// event. Returns false when the event channel is gone.
    async fn fail_tool_call(
        &self,
        call: &ToolCallRequest,
        conversation: &mut Vec<Message>,
        detail: &str,
    ) -> bool {
        self.ctx.usage.record_failed_tool_call();
        if !self
            .emit(ExecutionEvent::ToolFailed {
                message: self.tool_event(call, Some(detail)),
            })
            .await
        {
            return false;
        }
        let tool_msg = self.stamp(Message::tool_result(
            &call.id,
            &call.name,
            Value::String(detail.to_string()),
            true,
        ));
        conversation.push(tool_msg.clone());
        self.ctx.usage.record_message();
        self.emit(ExecutionEvent::ToolResult { message: tool_msg })
            .await
    }

    /// Interrupt tail: best-effort partial iteration, canceled status, and
    /// the interrupt message.
    async fn finish_interrupted(&self, partial: Option<Message>, reason: &str) {
        if let Some(message) = partial {
            self.emit_best_effort(ExecutionEvent::IterationCompleted { message })
                .await;
        }
        self.emit_best_effort(ExecutionEvent::TaskStatusChanged {
            status: TaskStatus::new(TaskState::Canceled, None),
        })
        .await;
        let message = self.stamp(Message::assistant(reason));
        self.emit_best_effort(ExecutionEvent::TaskInterrupted { message })
            .await;
    }

    /// Sends one event, giving up on cancellation. Returns false when the
    /// event was not delivered (consumer gone or run canceled mid-send).
    async fn emit(&self, event: ExecutionEvent) -> bool {
        tokio::select! {
            res = self.tx.send(event) => res.is_ok(),
            _ = self.ctx.cancel.cancelled() => false,
        }
    }

    /// Post-cancellation send: never blocks past the 100 ms fallback.
    async fn emit_best_effort(&self, event: ExecutionEvent) {
        let _ = tokio::time::timeout(BEST_EFFORT_SEND, self.tx.send(event)).await;
    }

    /// Stamps task/context references from the execution context.
    fn stamp(&self, message: Message) -> Message {
        match &self.ctx.task {
            Some(task) => {
                message.with_refs(Some(task.id.clone()), Some(task.context_id.clone()))
            }
            None => message,
        }
    }

    /// Small data-part message describing one tool call, carried by the
    /// tool-started/completed/failed events.
    fn tool_event(&self, call: &ToolCallRequest, error: Option<&str>) -> Message {
        let mut data = Map::new();
        data.insert("tool_call_id".to_string(), Value::String(call.id.clone()));
        data.insert("tool_name".to_string(), Value::String(call.name.clone()));
        if let Some(e) = error {
            data.insert("error".to_string(), Value::String(e.to_string()));
        }
        self.stamp(Message::new(Role::Assistant, vec![Part::data(data)]))
    }
}

/// Accumulator for one tool call assembled from indexed stream chunks.
#[derive(Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
    arguments_complete: bool,
}

impl ToolCallBuilder {
    fn into_request(self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

/// Folds one chunk into the accumulator. `id`, `name`, and `arguments` build
/// by concatenation; once `arguments` is a balanced JSON object further
/// appends are suppressed, because some providers re-emit the full arguments
/// string on the terminating chunk.
fn accumulate(builders: &mut BTreeMap<u32, ToolCallBuilder>, chunk: ToolCallChunk) {
    let builder = builders.entry(chunk.index).or_default();
    if let Some(id) = chunk.id {
        builder.id.push_str(&id);
    }
    if let Some(name) = chunk.name {
        builder.name.push_str(&name);
    }
    if let Some(args) = chunk.arguments {
        if !builder.arguments_complete {
            builder.arguments.push_str(&args);
            if json_object_complete(&builder.arguments) {
                builder.arguments_complete = true;
            }
        }
    }
}

/// True once `s` contains one complete JSON object: braces balanced back to
/// zero, string literals and escapes respected.
fn json_object_complete(s: &str) -> bool {
    let mut depth = 0i32;
    let mut started = false;
    let mut in_string = false;
    let mut escaped = false;
    for c in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                depth += 1;
                started = true;
            }
            '}' => depth -= 1,
            _ => {}
        }
        if started && depth == 0 {
            return true;
        }
    }
    false
}

/// Parses a tool-call arguments string into an object map. Empty strings are
/// an empty map; anything that is not a JSON object is an error.
fn parse_arguments(raw: &str) -> Result<StateMap, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Error parsing tool arguments: not a JSON object".to_string()),
        Err(e) => Err(format!("Error parsing tool arguments: {e}")),
    }
}
