//! The agent: an LLM plus tools driven through an iterative reason-act loop.
//!
//! [`Agent::run_with_stream`] validates preconditions synchronously, then
//! spawns a driver task and returns the event receiver immediately. The
//! driver sends the conversation to the model, streams deltas out, executes
//! requested tool calls, feeds results back, and loops until a terminal
//! condition: no more tool calls (completed), the reserved pause tool
//! (input-required), cancellation, a stream failure, or the iteration budget.

mod engine;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use a2a_types::{new_id, Message, Task};

use crate::callback::Callbacks;
use crate::error::AdkError;
use crate::event::ExecutionEvent;
use crate::llm::LlmClient;
use crate::toolbox::ToolBox;
use crate::usage::UsageTracker;

use engine::Driver;

/// Capacity of the per-run event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Default bound on reason-act iterations per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Per-run execution context: the task reference stamped onto emitted
/// messages, the usage tracker, and the cancellation token honored at every
/// suspension point.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    pub task: Option<Task>,
    pub usage: Arc<UsageTracker>,
    pub cancel: CancellationToken,
    pub invocation_id: String,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            task: None,
            usage: Arc::new(UsageTracker::new()),
            cancel: CancellationToken::new(),
            invocation_id: new_id(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }
}

/// The loop orchestrator. Immutable after build; cheap to share.
pub struct Agent {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) instruction: Option<String>,
    pub(crate) llm: Option<Arc<dyn LlmClient>>,
    pub(crate) toolbox: Arc<ToolBox>,
    pub(crate) callbacks: Arc<Callbacks>,
    pub(crate) max_iterations: u32,
}

impl Agent {
    /// Starts building an agent. See [`crate::builder::AgentBuilder`].
    pub fn builder(name: impl Into<String>) -> crate::builder::AgentBuilder {
        crate::builder::AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Runs the reason-act loop over `messages` (the full conversation to
    /// condition on: history plus the latest user message).
    ///
    /// Fails synchronously with [`AdkError::NoLlmConfigured`] when no LLM
    /// client is set. Otherwise returns the event receiver immediately; the
    /// driver task closes the channel when the run ends.
    pub fn run_with_stream(
        &self,
        ctx: ExecutionContext,
        messages: Vec<Message>,
    ) -> Result<mpsc::Receiver<ExecutionEvent>, AdkError> {
        let llm = self.llm.clone().ok_or(AdkError::NoLlmConfigured)?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let driver = Driver {
            agent_name: self.name.clone(),
            instruction: self.instruction.clone(),
            llm,
            toolbox: Arc::clone(&self.toolbox),
            callbacks: Arc::clone(&self.callbacks),
            max_iterations: self.max_iterations,
            ctx,
            tx,
        };
        tokio::spawn(driver.run(messages));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: running without an LLM fails synchronously.
    #[tokio::test]
    async fn run_without_llm_fails() {
        let agent = Agent {
            name: "bare".into(),
            description: String::new(),
            instruction: None,
            llm: None,
            toolbox: Arc::new(ToolBox::new()),
            callbacks: Arc::new(Callbacks::new()),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        };
        let err = agent
            .run_with_stream(ExecutionContext::new(), vec![Message::user("hi")])
            .unwrap_err();
        assert!(matches!(err, AdkError::NoLlmConfigured));
    }
}
