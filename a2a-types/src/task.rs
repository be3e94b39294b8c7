//! Task, task state, and task status: the stateful unit of work.
//!
//! State transitions follow a fixed DAG; terminal tasks never change again.
//!
//! ```text
//! submitted → working | canceled | failed | rejected
//! working → input-required | auth-required | completed | failed | canceled
//! input-required → working | canceled
//! auth-required → working | canceled
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{new_id, now_rfc3339, Artifact, Message};

/// Task lifecycle state. Serializes as the lowercase wire strings
/// (`input-required`, `auth-required` hyphenated).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Failed,
    Canceled,
    Rejected,
    #[default]
    Unknown,
}

impl TaskState {
    /// Wire string for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::AuthRequired => "auth-required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Rejected => "rejected",
            TaskState::Unknown => "unknown",
        }
    }

    /// True for states with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
        )
    }

    /// Whether the transition `self → to` is allowed. Any non-terminal state
    /// may move to `canceled`; terminal states allow nothing.
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if to == TaskState::Canceled {
            return true;
        }
        match self {
            TaskState::Submitted => matches!(
                to,
                TaskState::Working | TaskState::Failed | TaskState::Rejected
            ),
            TaskState::Working => matches!(
                to,
                TaskState::InputRequired
                    | TaskState::AuthRequired
                    | TaskState::Completed
                    | TaskState::Failed
            ),
            TaskState::InputRequired => to == TaskState::Working,
            TaskState::AuthRequired => to == TaskState::Working,
            TaskState::Unknown => false,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a task: state, the message that produced it (final reply,
/// pause prompt, or error), and an RFC3339 timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    pub timestamp: String,
}

impl TaskStatus {
    /// Builds a status stamped with the current time.
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: now_rfc3339(),
        }
    }
}

/// The unit of work tracked by the task manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Task {
    /// Builds a task with a fresh ID in the given context and state, with the
    /// initial message attached to both history and status.
    pub fn new(context_id: impl Into<String>, state: TaskState, message: Message) -> Self {
        let context_id = context_id.into();
        let id = new_id();
        let message = message.with_refs(Some(id.clone()), Some(context_id.clone()));
        Self {
            id,
            context_id,
            status: TaskStatus::new(state, Some(message.clone())),
            history: vec![message],
            artifacts: Vec::new(),
            metadata: None,
            created_at: Some(now_rfc3339()),
        }
    }

    /// True when the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Replaces the status with `state` and `message`, stamped now.
    pub fn set_status(&mut self, state: TaskState, message: Option<Message>) {
        self.status = TaskStatus::new(state, message);
    }

    /// Merges one metadata key into the task, creating the map when absent.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }
}
