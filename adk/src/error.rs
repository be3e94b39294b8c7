//! Error types for the agent core.
//!
//! Used by the task manager, the streaming engine, and the handlers. The
//! protocol layer maps these onto JSON-RPC error codes.

use thiserror::Error;

use a2a_types::TaskState;

use crate::toolbox::ToolError;

/// Core error. Client-visible variants (task lookup, transition, queue) map
/// to service-specific JSON-RPC codes; the rest surface through task state
/// and stream events rather than failing the RPC call.
#[derive(Debug, Error)]
pub enum AdkError {
    /// The agent was asked to run without an LLM client configured.
    #[error("no LLM client configured")]
    NoLlmConfigured,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TaskState, to: TaskState },

    #[error("task not cancelable: {0}")]
    TaskNotCancelable(String),

    /// Resume was requested for a task that is not paused for input.
    #[error("task not paused for input: {0}")]
    TaskNotPaused(String),

    #[error("task queue full")]
    QueueFull,

    #[error("message has no parts")]
    EmptyMessageParts,

    /// Upstream LLM failure: HTTP error, malformed stream chunk, or timeout.
    #[error("llm error: {0}")]
    Llm(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("message conversion failed: {0}")]
    Conversion(String),

    #[error("push notification failed: {0}")]
    Push(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("timed out polling task: {0}")]
    PollTimeout(String),

    #[error("canceled")]
    Canceled,
}
