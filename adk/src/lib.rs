//! # adk
//!
//! Core of an A2A agent server: the task lifecycle manager, the agent
//! streaming engine, the callback pipeline, and the pieces they share.
//!
//! ## Design
//!
//! - **One event channel per run**: [`Agent::run_with_stream`] returns a
//!   receiver of [`ExecutionEvent`]; a driver task feeds it in program order
//!   and closes it when the run ends. The protocol layer translates events
//!   into SSE frames; the background handler folds them into a final task.
//! - **Single mutation path for tasks**: every task change goes through
//!   [`TaskManager`], which serializes operations and enforces the state
//!   transition DAG. Storage is pluggable behind [`TaskStore`].
//! - **Callbacks as ordered lists**: six hook points with two flow rules
//!   (short-circuit before-hooks, chaining after-hooks), panic-isolated.
//! - **Tools behind a registry**: [`ToolBox`] holds [`Tool`] implementations;
//!   the reserved `input_required` tool pauses a run for user input.
//!
//! ## Main modules
//!
//! - [`agent`]: [`Agent`], [`ExecutionContext`] — the reason-act loop.
//! - [`task`]: [`TaskManager`], [`TaskStore`], [`WorkerPool`] — lifecycle,
//!   storage, background processing.
//! - [`callback`]: [`Callbacks`], [`CallbackContext`], [`ToolContext`].
//! - [`toolbox`]: [`Tool`], [`ToolBox`], [`FnTool`], [`InputRequiredTool`].
//! - [`llm`]: [`LlmClient`], [`OpenAiChat`], [`MockLlm`].
//! - [`event`]: [`ExecutionEvent`] — the typed run event stream.
//! - [`handler`]: [`BackgroundTaskHandler`], [`StreamingTaskHandler`].
//! - [`convert`]: A2A message ↔ chat-completions wire mapping.
//! - [`usage`]: [`UsageTracker`] — per-run counters.
//! - [`push`]: [`PushSender`] — webhook contract (HTTP impl in `serve`).

pub mod agent;
pub mod artifact;
pub mod builder;
pub mod callback;
pub mod convert;
mod error;
pub mod event;
pub mod handler;
pub mod llm;
pub mod push;
pub mod task;
pub mod toolbox;
pub mod usage;

pub use agent::{Agent, ExecutionContext, DEFAULT_MAX_ITERATIONS, EVENT_CHANNEL_CAPACITY};
pub use artifact::ArtifactHelper;
pub use builder::AgentBuilder;
pub use callback::{CallbackContext, Callbacks, StateMap, ToolContext};
pub use error::AdkError;
pub use event::ExecutionEvent;
pub use handler::{BackgroundTaskHandler, StreamingTaskHandler};
pub use llm::{
    ChatChunk, ChatStream, LlmClient, LlmRequest, LlmResponse, LlmUsage, MockLlm, MockTurn,
    OpenAiChat, ToolCallChunk, WireMessage,
};
pub use push::{NoopPushSender, PushSender};
pub use task::{
    InMemoryTaskStore, QueueEntry, TaskManager, TaskStore, WorkerPool, DEFAULT_QUEUE_CAPACITY,
};
pub use toolbox::{
    FnTool, InputRequiredTool, Tool, ToolBox, ToolError, ToolSpec, INPUT_REQUIRED_TOOL,
};
pub use usage::{UsageSnapshot, UsageTracker, EXECUTION_STATS_KEY};
