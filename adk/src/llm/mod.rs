//! LLM client abstraction for the streaming engine.
//!
//! The engine conditions the model on the full running conversation and
//! consumes a chunk stream plus an error stream until a finish reason
//! arrives. This module defines the wire-neutral request/response/chunk
//! types, the [`LlmClient`] trait, the OpenAI-compatible HTTP client
//! ([`OpenAiChat`]), and a scripted [`MockLlm`] for tests.

mod mock;
mod openai;

pub use mock::{text_chunk, tool_call_chunk, MockLlm, MockTurn};
pub use openai::OpenAiChat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use a2a_types::ToolCallRequest;

use crate::error::AdkError;
use crate::toolbox::ToolSpec;

/// Token usage for one completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// One message in the chat-completions wire shape the model consumes.
/// Produced by the converter from A2A messages.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by an assistant turn, when any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Set on tool-role messages: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A chat-completion request: the conversation plus the tool specs the model
/// may call. The model name lives on the client.
#[derive(Clone, Debug, Default)]
pub struct LlmRequest {
    pub messages: Vec<WireMessage>,
    pub tools: Vec<ToolSpec>,
}

/// A complete model response for one turn: assistant text, requested tool
/// calls, and usage when the provider reports it.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<LlmUsage>,
}

/// Incremental fragment of one tool call, keyed by the provider-assigned
/// `index`. `id`, `name`, and `arguments` arrive split across chunks and are
/// rebuilt by concatenation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolCallChunk {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// One streamed chunk from the model.
#[derive(Clone, Debug, Default)]
pub struct ChatChunk {
    /// Incremental assistant text (the delta only, never cumulative).
    pub delta: Option<String>,
    pub tool_calls: Vec<ToolCallChunk>,
    /// Non-empty when the turn is done (`stop`, `tool_calls`, ...).
    pub finish_reason: Option<String>,
    pub usage: Option<LlmUsage>,
}

/// The two receive channels of a streaming completion. The engine selects
/// over both until a finish reason, an error, or cancellation.
pub struct ChatStream {
    pub chunks: mpsc::Receiver<ChatChunk>,
    pub errors: mpsc::Receiver<AdkError>,
}

/// Capacity of the chunk/error channels a streaming call returns.
pub(crate) const STREAM_CHANNEL_CAPACITY: usize = 128;

/// LLM client: streaming chat completions against one configured model.
///
/// `stream_chat` returns immediately with the chunk/error channel pair; a
/// background task feeds them and closes both when the turn ends.
/// `complete` is the non-streaming convenience used by callback overrides
/// and one-shot callers; the default implementation folds the stream.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Starts a streaming completion for the request.
    async fn stream_chat(&self, request: &LlmRequest) -> Result<ChatStream, AdkError>;

    /// Runs one completion to the end and returns the folded response.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AdkError> {
        let ChatStream {
            mut chunks,
            mut errors,
        } = self.stream_chat(request).await?;
        let mut content = String::new();
        let mut usage = None;
        let mut calls: std::collections::BTreeMap<u32, ToolCallRequest> = Default::default();
        loop {
            tokio::select! {
                err = errors.recv() => {
                    if let Some(e) = err {
                        return Err(e);
                    }
                }
                chunk = chunks.recv() => {
                    let Some(chunk) = chunk else { break };
                    if let Some(d) = chunk.delta {
                        content.push_str(&d);
                    }
                    for tc in chunk.tool_calls {
                        let entry = calls.entry(tc.index).or_default();
                        if let Some(id) = tc.id {
                            entry.id.push_str(&id);
                        }
                        if let Some(name) = tc.name {
                            entry.name.push_str(&name);
                        }
                        if let Some(args) = tc.arguments {
                            entry.arguments.push_str(&args);
                        }
                    }
                    if let Some(u) = chunk.usage {
                        usage = Some(u);
                    }
                    if chunk.finish_reason.as_deref().is_some_and(|r| !r.is_empty()) {
                        break;
                    }
                }
            }
        }
        Ok(LlmResponse {
            content,
            tool_calls: calls.into_values().collect(),
            usage,
        })
    }
}
