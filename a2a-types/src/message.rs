//! Message and part types: the content unit exchanged between client, agent,
//! and model.
//!
//! A message is a role plus an ordered list of parts. Parts are a tagged
//! variant: `text` for plain content, `data` for structured payloads (tool-call
//! descriptors and tool results), `file` for inline bytes or a URI reference.
//! The loose `{kind: ...}` wire maps are decoded into the variant here at the
//! boundary; internal APIs only ever see the typed shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::new_id;

/// Data-part key holding the list of tool calls on an assistant message.
pub const TOOL_CALLS_KEY: &str = "tool_calls";

/// Message kind discriminator. `input_required` marks the pause prompt a task
/// emits when it needs more user input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Message,
    InputRequired,
}

/// Conversation role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Wire string for this role, matching the chat-completions role names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File content for a file part: inline base64 bytes or a URI reference,
/// plus the MIME type and an optional display name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One part of a message. Tagged on the wire as `{kind: "text" | "data" | "file"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Map<String, Value> },
    File { file: FileContent },
}

impl Part {
    /// Builds a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Builds a data part from a JSON object.
    pub fn data(data: Map<String, Value>) -> Self {
        Part::Data { data }
    }

    /// Returns the text content if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns the data map if this is a data part.
    pub fn as_data(&self) -> Option<&Map<String, Value>> {
        match self {
            Part::Data { data } => Some(data),
            _ => None,
        }
    }
}

/// One tool invocation requested by the model: id, tool name, and the raw
/// arguments JSON string (parsed only at execution time).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A single message: role, kind, ordered parts, optional task/context
/// back-references, and a unique message ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub role: Role,
    #[serde(rename = "taskId", default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(rename = "contextId", default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Message {
    /// Builds a message with a fresh ID and the given role and parts.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            kind: MessageKind::Message,
            message_id: new_id(),
            role,
            task_id: None,
            context_id: None,
            parts,
            metadata: None,
        }
    }

    /// User message with one text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Assistant message with one text part.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    /// System message with one text part.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Part::text(text)])
    }

    /// Assistant message for one model turn: a text part when `text` is
    /// non-empty, and one data part listing the requested tool calls when
    /// there are any.
    pub fn assistant_turn(text: &str, tool_calls: &[ToolCallRequest]) -> Self {
        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .iter()
                .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
                .collect::<Vec<_>>();
            let mut data = Map::new();
            data.insert(TOOL_CALLS_KEY.to_string(), Value::Array(calls));
            parts.push(Part::data(data));
        }
        Self::new(Role::Assistant, parts)
    }

    /// Tool-role message carrying one tool execution result.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: Value,
        is_error: bool,
    ) -> Self {
        let mut data = Map::new();
        data.insert("tool_call_id".to_string(), Value::String(tool_call_id.into()));
        data.insert("tool_name".to_string(), Value::String(tool_name.into()));
        data.insert("result".to_string(), result);
        data.insert("is_error".to_string(), Value::Bool(is_error));
        Self::new(Role::Tool, vec![Part::data(data)])
    }

    /// Input-required prompt: an `input_required`-kind assistant message with
    /// one text part holding the question for the user.
    pub fn input_required(prompt: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, vec![Part::text(prompt)]);
        msg.kind = MessageKind::InputRequired;
        msg
    }

    /// Sets the task/context back-references, builder style.
    pub fn with_refs(mut self, task_id: Option<String>, context_id: Option<String>) -> Self {
        self.task_id = task_id;
        self.context_id = context_id;
        self
    }

    /// Concatenated content of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls requested by this message, parsed from its data part.
    /// Empty when there is no tool-call data part.
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.parts
            .iter()
            .filter_map(Part::as_data)
            .filter_map(|d| d.get(TOOL_CALLS_KEY))
            .filter_map(|v| serde_json::from_value::<Vec<ToolCallRequest>>(v.clone()).ok())
            .next()
            .unwrap_or_default()
    }
}
