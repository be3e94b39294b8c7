//! Artifact helper: lets tools attach artifacts to the running task.
//!
//! The streaming engine wires a helper into every [`ToolContext`]; emitted
//! updates travel the event channel as `artifact-update` and are folded into
//! the task by the handlers. Without a sender (background contexts that drop
//! artifacts) the helper is a no-op.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use a2a_types::{Artifact, Part};

use crate::event::ExecutionEvent;

/// Emits artifact updates onto a run's event channel.
#[derive(Clone, Default)]
pub struct ArtifactHelper {
    tx: Option<mpsc::Sender<ExecutionEvent>>,
}

impl ArtifactHelper {
    pub(crate) fn new(tx: mpsc::Sender<ExecutionEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Helper that drops all updates.
    pub fn noop() -> Self {
        Self { tx: None }
    }

    /// Emits a whole artifact as one final chunk.
    pub async fn add_artifact(&self, artifact: Artifact) {
        self.emit(artifact, false, true).await;
    }

    /// Emits a named text artifact.
    pub async fn add_text_artifact(&self, name: impl Into<String>, text: impl Into<String>) {
        self.add_artifact(Artifact::text(name, text)).await;
    }

    /// Emits parts extending an existing artifact ID. `last_chunk` marks the
    /// end of that artifact.
    pub async fn append_parts(&self, artifact_id: &str, parts: Vec<Part>, last_chunk: bool) {
        let artifact = Artifact {
            artifact_id: artifact_id.to_string(),
            name: None,
            description: None,
            parts,
        };
        self.emit(artifact, true, last_chunk).await;
    }

    /// Emits a named JSON data artifact.
    pub async fn add_data_artifact(&self, name: impl Into<String>, data: Value) {
        let map = match data {
            Value::Object(m) => m,
            other => {
                let mut m = serde_json::Map::new();
                m.insert("value".to_string(), other);
                m
            }
        };
        self.add_artifact(Artifact::new(Some(name.into()), vec![Part::data(map)]))
            .await;
    }

    async fn emit(&self, artifact: Artifact, append: bool, last_chunk: bool) {
        let Some(tx) = &self.tx else { return };
        let event = ExecutionEvent::ArtifactUpdate {
            artifact,
            append,
            last_chunk,
        };
        if tx.send(event).await.is_err() {
            warn!("artifact update dropped: event channel closed");
        }
    }
}
