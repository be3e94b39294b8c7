//! Callback pipeline: six lifecycle hook points with flow-control rules.
//!
//! Before-hooks short-circuit: the first callback returning `Some` replaces
//! the downstream work and the remaining callbacks are skipped. After-hooks
//! chain: each `Some` return becomes the input of the next callback, and the
//! final value wins. The two rules are enforced by separate executor
//! functions rather than one polymorphic runner.
//!
//! Every callback is panic-isolated: a panicking callback is logged and the
//! next one runs with the prior state. The mutable `state` map on the
//! contexts is the only inter-callback channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use a2a_types::Message;

use crate::artifact::ArtifactHelper;
use crate::llm::{LlmRequest, LlmResponse};
use crate::toolbox::Tool;

/// Mutable state shared along the callback chain.
pub type StateMap = Map<String, Value>;

/// Context handed to agent and model callbacks.
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    pub agent_name: String,
    pub invocation_id: String,
    pub task_id: Option<String>,
    pub context_id: Option<String>,
    pub state: StateMap,
}

impl CallbackContext {
    pub fn new(agent_name: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            invocation_id: invocation_id.into(),
            ..Default::default()
        }
    }
}

/// Context handed to tool callbacks and tool implementations. Carries the
/// cancellation token of the request and the artifact helper.
#[derive(Clone, Default)]
pub struct ToolContext {
    pub agent_name: String,
    pub invocation_id: String,
    pub task_id: Option<String>,
    pub context_id: Option<String>,
    pub state: StateMap,
    pub cancel: CancellationToken,
    pub artifacts: ArtifactHelper,
}

impl ToolContext {
    /// Builds a tool context from the agent context, inheriting its state.
    pub fn from_callback_context(
        ctx: &CallbackContext,
        cancel: CancellationToken,
        artifacts: ArtifactHelper,
    ) -> Self {
        Self {
            agent_name: ctx.agent_name.clone(),
            invocation_id: ctx.invocation_id.clone(),
            task_id: ctx.task_id.clone(),
            context_id: ctx.context_id.clone(),
            state: ctx.state.clone(),
            cancel,
            artifacts,
        }
    }

    /// Bare context for unit tests.
    pub fn for_test() -> Self {
        Self::default()
    }
}

pub type BeforeAgentCallback =
    Arc<dyn Fn(&mut CallbackContext) -> Option<Message> + Send + Sync>;
pub type AfterAgentCallback =
    Arc<dyn Fn(&mut CallbackContext, &Message) -> Option<Message> + Send + Sync>;
pub type BeforeModelCallback =
    Arc<dyn Fn(&mut CallbackContext, &mut LlmRequest) -> Option<LlmResponse> + Send + Sync>;
pub type AfterModelCallback =
    Arc<dyn Fn(&mut CallbackContext, &LlmResponse) -> Option<LlmResponse> + Send + Sync>;
pub type BeforeToolCallback =
    Arc<dyn Fn(&dyn Tool, &StateMap, &mut ToolContext) -> Option<StateMap> + Send + Sync>;
pub type AfterToolCallback = Arc<
    dyn Fn(&dyn Tool, &StateMap, &mut ToolContext, &StateMap) -> Option<StateMap> + Send + Sync,
>;

/// Ordered callback lists for the six hook points.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub before_agent: Vec<BeforeAgentCallback>,
    pub after_agent: Vec<AfterAgentCallback>,
    pub before_model: Vec<BeforeModelCallback>,
    pub after_model: Vec<AfterModelCallback>,
    pub before_tool: Vec<BeforeToolCallback>,
    pub after_tool: Vec<AfterToolCallback>,
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// BeforeAgent: short-circuit. A `Some` return replaces the whole agent
    /// run with that message.
    pub fn run_before_agent(&self, ctx: &mut CallbackContext) -> Option<Message> {
        for (i, cb) in self.before_agent.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(ctx))) {
                Ok(Some(msg)) => return Some(msg),
                Ok(None) => {}
                Err(p) => warn!("before_agent callback {i} panicked: {}", panic_message(p)),
            }
        }
        None
    }

    /// AfterAgent: chain. Each `Some` return feeds the next callback; the
    /// final value is returned.
    pub fn run_after_agent(&self, ctx: &mut CallbackContext, output: Message) -> Message {
        let mut current = output;
        for (i, cb) in self.after_agent.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(ctx, &current))) {
                Ok(Some(next)) => current = next,
                Ok(None) => {}
                Err(p) => warn!("after_agent callback {i} panicked: {}", panic_message(p)),
            }
        }
        current
    }

    /// BeforeModel: short-circuit. Callbacks may mutate the request in place;
    /// a `Some` return skips the LLM call and uses that response.
    pub fn run_before_model(
        &self,
        ctx: &mut CallbackContext,
        request: &mut LlmRequest,
    ) -> Option<LlmResponse> {
        for (i, cb) in self.before_model.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(ctx, request))) {
                Ok(Some(resp)) => return Some(resp),
                Ok(None) => {}
                Err(p) => warn!("before_model callback {i} panicked: {}", panic_message(p)),
            }
        }
        None
    }

    /// AfterModel: chain.
    pub fn run_after_model(&self, ctx: &mut CallbackContext, response: LlmResponse) -> LlmResponse {
        let mut current = response;
        for (i, cb) in self.after_model.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(ctx, &current))) {
                Ok(Some(next)) => current = next,
                Ok(None) => {}
                Err(p) => warn!("after_model callback {i} panicked: {}", panic_message(p)),
            }
        }
        current
    }

    /// BeforeTool: short-circuit. A `Some` return is used as the tool result
    /// and the tool itself is not executed.
    pub fn run_before_tool(
        &self,
        tool: &dyn Tool,
        args: &StateMap,
        ctx: &mut ToolContext,
    ) -> Option<StateMap> {
        for (i, cb) in self.before_tool.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(tool, args, ctx))) {
                Ok(Some(result)) => return Some(result),
                Ok(None) => {}
                Err(p) => warn!("before_tool callback {i} panicked: {}", panic_message(p)),
            }
        }
        None
    }

    /// AfterTool: chain over the result map. Dropping the `error` key from
    /// the map clears the error.
    pub fn run_after_tool(
        &self,
        tool: &dyn Tool,
        args: &StateMap,
        ctx: &mut ToolContext,
        result: StateMap,
    ) -> StateMap {
        let mut current = result;
        for (i, cb) in self.after_tool.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| cb(tool, args, ctx, &current))) {
                Ok(Some(next)) => current = next,
                Ok(None) => {}
                Err(p) => warn!("after_tool callback {i} panicked: {}", panic_message(p)),
            }
        }
        current
    }
}
