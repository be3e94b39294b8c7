//! Typed events emitted by the agent streaming engine.
//!
//! One channel per run; the protocol layer keys on the event kind strings to
//! decide framing. The vocabulary is fixed: exactly the kinds below, no
//! legacy aliases.
//!
//! Per-run ordering contract: exactly one initial `task-status-changed`
//! (working), zero or more `delta`, at most one `iteration-completed` per
//! iteration, tool events strictly between an iteration and the next, and
//! exactly one terminal event last (`task-status-changed` with a terminal
//! state, or `input-required`).

use serde::Serialize;

use a2a_types::{Artifact, Message, TaskStatus};

/// One event on a run's stream. Serializes with a `type` tag carrying the
/// wire kind string.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutionEvent {
    /// Task state moved; terminal states end the stream.
    TaskStatusChanged { status: TaskStatus },
    /// Incremental assistant text; the part holds the delta only.
    Delta { message: Message },
    /// The assembled assistant message of one iteration.
    IterationCompleted { message: Message },
    ToolStarted { message: Message },
    ToolCompleted { message: Message },
    ToolFailed { message: Message },
    /// The tool-role result message appended to the conversation.
    ToolResult { message: Message },
    /// The run paused to solicit user input.
    InputRequired { message: Message },
    /// The run was interrupted (cancellation or iteration budget).
    TaskInterrupted { message: Message },
    /// The LLM stream failed; the run ends without a completed message.
    StreamFailed { message: Message },
    /// A tool attached or extended an artifact.
    ArtifactUpdate {
        artifact: Artifact,
        append: bool,
        last_chunk: bool,
    },
}

impl ExecutionEvent {
    /// Wire kind string of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::TaskStatusChanged { .. } => "task-status-changed",
            ExecutionEvent::Delta { .. } => "delta",
            ExecutionEvent::IterationCompleted { .. } => "iteration-completed",
            ExecutionEvent::ToolStarted { .. } => "tool-started",
            ExecutionEvent::ToolCompleted { .. } => "tool-completed",
            ExecutionEvent::ToolFailed { .. } => "tool-failed",
            ExecutionEvent::ToolResult { .. } => "tool-result",
            ExecutionEvent::InputRequired { .. } => "input-required",
            ExecutionEvent::TaskInterrupted { .. } => "task-interrupted",
            ExecutionEvent::StreamFailed { .. } => "stream-failed",
            ExecutionEvent::ArtifactUpdate { .. } => "artifact-update",
        }
    }

    /// The message this event carries, when it carries one.
    pub fn message(&self) -> Option<&Message> {
        match self {
            ExecutionEvent::TaskStatusChanged { status } => status.message.as_ref(),
            ExecutionEvent::Delta { message }
            | ExecutionEvent::IterationCompleted { message }
            | ExecutionEvent::ToolStarted { message }
            | ExecutionEvent::ToolCompleted { message }
            | ExecutionEvent::ToolFailed { message }
            | ExecutionEvent::ToolResult { message }
            | ExecutionEvent::InputRequired { message }
            | ExecutionEvent::TaskInterrupted { message }
            | ExecutionEvent::StreamFailed { message } => Some(message),
            ExecutionEvent::ArtifactUpdate { .. } => None,
        }
    }
}
