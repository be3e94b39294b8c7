//! Streamed update events: the payloads written as JSON-RPC results over SSE
//! during `message/stream`.

use serde::{Deserialize, Serialize};

use crate::{Artifact, TaskStatus};

/// Task status change streamed to the client. `final` marks the last status
/// frame of the stream (terminal states).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    pub kind: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl TaskStatusUpdateEvent {
    pub fn new(task_id: impl Into<String>, context_id: impl Into<String>, status: TaskStatus) -> Self {
        let is_final = status.state.is_terminal();
        Self {
            kind: "status-update".to_string(),
            task_id: task_id.into(),
            context_id: context_id.into(),
            status,
            is_final,
        }
    }
}

/// Artifact delta streamed to the client. `append` means the parts extend an
/// artifact already announced under the same ID; `last_chunk` marks the end of
/// that artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskArtifactUpdateEvent {
    pub kind: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub artifact: Artifact,
    pub append: bool,
    #[serde(rename = "lastChunk")]
    pub last_chunk: bool,
}

impl TaskArtifactUpdateEvent {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        artifact: Artifact,
        append: bool,
        last_chunk: bool,
    ) -> Self {
        Self {
            kind: "artifact-update".to_string(),
            task_id: task_id.into(),
            context_id: context_id.into(),
            artifact,
            append,
            last_chunk,
        }
    }
}
