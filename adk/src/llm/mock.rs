//! Scripted LLM client for tests.
//!
//! Each call to [`MockLlm::stream_chat`] plays the next scripted turn: its
//! chunks are sent on the chunk channel in order, then both channels close.
//! Multi-turn scripts drive the full tool loop deterministically without a
//! network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AdkError;
use crate::llm::{
    ChatChunk, ChatStream, LlmClient, LlmRequest, LlmUsage, ToolCallChunk,
    STREAM_CHANNEL_CAPACITY,
};

/// A chunk carrying only a text delta.
pub fn text_chunk(delta: &str) -> ChatChunk {
    ChatChunk {
        delta: Some(delta.to_string()),
        ..Default::default()
    }
}

/// A chunk carrying one whole tool call at the given index.
pub fn tool_call_chunk(index: u32, id: &str, name: &str, arguments: &str) -> ChatChunk {
    ChatChunk {
        tool_calls: vec![ToolCallChunk {
            index,
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            arguments: Some(arguments.to_string()),
        }],
        ..Default::default()
    }
}

/// One scripted turn: the chunks to emit, in order.
pub type MockTurn = Vec<ChatChunk>;

/// Scripted LLM client. Turns are consumed in order; running out of turns is
/// an error on the error channel (a test script bug).
pub struct MockLlm {
    turns: Mutex<VecDeque<MockTurn>>,
    fail_with: Option<String>,
}

impl MockLlm {
    /// Client that plays the given turns, one per `stream_chat` call.
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fail_with: None,
        }
    }

    /// Single-turn client: streams the given deltas then finishes with `stop`.
    pub fn with_text_chunks(deltas: &[&str]) -> Self {
        let mut turn: MockTurn = deltas.iter().map(|d| text_chunk(d)).collect();
        turn.push(ChatChunk {
            finish_reason: Some("stop".into()),
            ..Default::default()
        });
        Self::new(vec![turn])
    }

    /// Single-turn client answering with one complete text and a usage report.
    pub fn with_reply(text: &str) -> Self {
        Self::new(vec![vec![
            text_chunk(text),
            ChatChunk {
                finish_reason: Some("stop".into()),
                usage: Some(LlmUsage {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    total_tokens: 2,
                }),
                ..Default::default()
            },
        ]])
    }

    /// Client whose every call reports the given error on the error channel.
    pub fn failing(message: &str) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            fail_with: Some(message.to_string()),
        }
    }

    /// Finishing chunk with the given reason.
    pub fn finish(reason: &str) -> ChatChunk {
        ChatChunk {
            finish_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn stream_chat(&self, _request: &LlmRequest) -> Result<ChatStream, AdkError> {
        let (chunk_tx, chunk_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(1);

        if let Some(msg) = &self.fail_with {
            let msg = msg.clone();
            tokio::spawn(async move {
                let _ = err_tx.send(AdkError::Llm(msg)).await;
            });
            return Ok(ChatStream {
                chunks: chunk_rx,
                errors: err_rx,
            });
        }

        let turn = self
            .turns
            .lock()
            .map_err(|e| AdkError::Llm(format!("mock turns lock: {e}")))?
            .pop_front();
        tokio::spawn(async move {
            match turn {
                Some(chunks) => {
                    for chunk in chunks {
                        if chunk_tx.send(chunk).await.is_err() {
                            return;
                        }
                    }
                }
                None => {
                    let _ = err_tx
                        .send(AdkError::Llm("mock script exhausted".into()))
                        .await;
                }
            }
        });
        Ok(ChatStream {
            chunks: chunk_rx,
            errors: err_rx,
        })
    }
}
