//! Bi-directional mapping between A2A messages and the chat-completions wire
//! shape.
//!
//! Outbound (`to_wire`): text parts concatenate into `content`, an assistant
//! tool-call data part becomes `tool_calls`, a tool-result data part becomes
//! a tool-role wire message with `tool_call_id`. Inbound (`from_wire`)
//! rebuilds typed messages; on text-only messages the two functions compose
//! to the identity.

use serde_json::Value;

use a2a_types::{Message, Part, Role};

use crate::error::AdkError;
use crate::llm::WireMessage;

/// Converts A2A messages into the wire shape the model consumes.
pub fn to_wire(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(message_to_wire).collect()
}

fn message_to_wire(message: &Message) -> WireMessage {
    let mut wire = WireMessage::new(message.role.as_str(), message.text());
    match message.role {
        Role::Assistant => {
            wire.tool_calls = message.tool_calls();
        }
        Role::Tool => {
            if let Some(data) = message.parts.iter().find_map(Part::as_data) {
                wire.tool_call_id = data
                    .get("tool_call_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(result) = data.get("result") {
                    wire.content = match result {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                }
            }
        }
        _ => {}
    }
    wire
}

/// Converts wire messages back into A2A messages.
pub fn from_wire(messages: &[WireMessage]) -> Result<Vec<Message>, AdkError> {
    messages.iter().map(wire_to_message).collect()
}

fn wire_to_message(wire: &WireMessage) -> Result<Message, AdkError> {
    let role = match wire.role.as_str() {
        "system" => Role::System,
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        other => {
            return Err(AdkError::Conversion(format!("unknown role: {other}")));
        }
    };
    let message = match role {
        Role::Assistant if !wire.tool_calls.is_empty() => {
            Message::assistant_turn(&wire.content, &wire.tool_calls)
        }
        Role::Tool => Message::tool_result(
            wire.tool_call_id.clone().unwrap_or_default(),
            String::new(),
            Value::String(wire.content.clone()),
            false,
        ),
        _ => Message::new(role, vec![Part::text(wire.content.clone())]),
    };
    Ok(message)
}

/// Prepends a system-prompt message unless the conversation already starts
/// with one.
pub fn with_system_prompt(prompt: &str, mut wire: Vec<WireMessage>) -> Vec<WireMessage> {
    if wire.first().map(|m| m.role.as_str()) != Some("system") {
        wire.insert(0, WireMessage::new("system", prompt));
    }
    wire
}
