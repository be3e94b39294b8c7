//! Artifact: named output attached to a task, identified by a stable ID so
//! streamed delta updates can target it.

use serde::{Deserialize, Serialize};

use crate::{new_id, Part};

/// An output produced by a task: ordered parts under a stable artifact ID.
/// Append-only within a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Artifact {
    /// Builds an artifact with a fresh ID and the given parts.
    pub fn new(name: Option<String>, parts: Vec<Part>) -> Self {
        Self {
            artifact_id: new_id(),
            name,
            description: None,
            parts,
        }
    }

    /// Convenience: a named artifact holding one text part.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Some(name.into()), vec![Part::text(text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: text artifact carries the name and one text part; IDs differ.
    #[test]
    fn text_artifact_shape() {
        let a = Artifact::text("report", "body");
        assert_eq!(a.name.as_deref(), Some("report"));
        assert_eq!(a.parts.len(), 1);
        assert_eq!(a.parts[0].as_text(), Some("body"));
        let b = Artifact::text("report", "body");
        assert_ne!(a.artifact_id, b.artifact_id);
    }

    /// **Scenario**: artifact serializes with camelCase artifactId.
    #[test]
    fn artifact_wire_shape() {
        let a = Artifact::text("n", "t");
        let v = serde_json::to_value(&a).unwrap();
        assert!(v["artifactId"].is_string());
        assert_eq!(v["parts"][0]["kind"], "text");
    }
}
