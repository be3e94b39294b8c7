//! OpenAI-compatible Chat Completions client over HTTP SSE.
//!
//! Speaks the [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat):
//! non-streaming `POST /v1/chat/completions` for [`LlmClient::complete`] and
//! the SSE stream (`stream: true`) for [`LlmClient::stream_chat`]. Works
//! against any provider that implements the same wire shape; the base URL
//! comes from `OPENAI_BASE_URL` (or `OPENAI_API_BASE`), the key from
//! `OPENAI_API_KEY`, both overridable on the builder.
//!
//! Stream chunks are `data: <json>` SSE records terminated by `data: [DONE]`.
//! Each record carries `choices[].delta.content` for incremental text and
//! `choices[].delta.tool_calls` for indexed tool-call fragments; with
//! `stream_options.include_usage` the final record reports token usage.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::AdkError;
use crate::llm::{
    ChatChunk, ChatStream, LlmClient, LlmRequest, LlmResponse, LlmUsage, ToolCallChunk,
    WireMessage, STREAM_CHANNEL_CAPACITY,
};
use crate::toolbox::ToolSpec;

use a2a_types::ToolCallRequest;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat client bound to one model.
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    /// Client for `model` with base URL and API key from the environment.
    pub fn new(model: impl Into<String>) -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .or_else(|_| std::env::var("OPENAI_API_BASE"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Overrides the base URL (e.g. a local OpenAI-compatible server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the sampling temperature (0-2).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Model this client is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat completions URL. Does not append `/v1` when the base already
    /// ends with it.
    fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_body(&self, request: &LlmRequest, stream: bool) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            stream,
            stream_options: stream.then_some(ApiStreamOptions {
                include_usage: true,
            }),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(request.tools.iter().map(ApiTool::from).collect())
            },
            temperature: self.temperature,
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiChat {
    async fn stream_chat(&self, request: &LlmRequest) -> Result<ChatStream, AdkError> {
        let url = self.chat_completions_url();
        let body = self.build_body(request, true);
        debug!(
            url = %url,
            model = %self.model,
            message_count = request.messages.len(),
            tools_count = request.tools.len(),
            "chat completions stream"
        );

        let (chunk_tx, chunk_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(1);
        let req = self.apply_auth(self.client.post(&url)).json(&body);

        tokio::spawn(async move {
            let response = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = err_tx.send(AdkError::Llm(format!("request failed: {e}"))).await;
                    return;
                }
            };
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                let _ = err_tx
                    .send(AdkError::Llm(format!(
                        "chat completions returned {status}: {detail}"
                    )))
                    .await;
                return;
            }

            let mut body_stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(next) = body_stream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = err_tx
                            .send(AdkError::Llm(format!("stream read failed: {e}")))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                // SSE records are separated by a blank line.
                while let Some(pos) = buffer.find("\n\n") {
                    let record = buffer[..pos].to_string();
                    buffer.drain(..pos + 2);
                    for line in record.lines() {
                        let Some(data) = line.trim().strip_prefix("data:") else {
                            continue;
                        };
                        let data = data.trim();
                        if data.is_empty() {
                            continue;
                        }
                        if data == "[DONE]" {
                            return;
                        }
                        match serde_json::from_str::<ApiStreamChunk>(data) {
                            Ok(api) => {
                                for chunk in api.into_chunks() {
                                    if chunk_tx.send(chunk).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("malformed stream chunk: {e}");
                                let _ = err_tx
                                    .send(AdkError::Llm(format!("malformed stream chunk: {e}")))
                                    .await;
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(ChatStream {
            chunks: chunk_rx,
            errors: err_rx,
        })
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AdkError> {
        let url = self.chat_completions_url();
        let body = self.build_body(request, false);
        debug!(
            url = %url,
            model = %self.model,
            message_count = request.messages.len(),
            "chat completions"
        );
        let response = self
            .apply_auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdkError::Llm(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdkError::Llm(format!(
                "chat completions returned {status}: {detail}"
            )));
        }
        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| AdkError::Llm(format!("malformed response: {e}")))?;
        trace!(?api, "chat completions response");

        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdkError::Llm("response has no choices".into()))?;
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();
        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: api.usage.map(LlmUsage::from),
        })
    }
}

// --- wire DTOs -------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<ApiStreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiStreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&WireMessage> for ApiMessage {
    fn from(m: &WireMessage) -> Self {
        ApiMessage {
            role: m.role.clone(),
            content: Some(m.content.clone()),
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(m.tool_calls.iter().map(ApiToolCall::from).collect())
            },
            tool_call_id: m.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: ApiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&ToolCallRequest> for ApiToolCall {
    fn from(c: &ToolCallRequest) -> Self {
        ApiToolCall {
            id: c.id.clone(),
            call_type: function_type(),
            function: ApiFunctionCall {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ApiFunctionDef,
}

impl From<&ToolSpec> for ApiTool {
    fn from(spec: &ToolSpec) -> Self {
        ApiTool {
            tool_type: function_type(),
            function: ApiFunctionDef {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiFunctionDef {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

impl ApiStreamChunk {
    /// Flattens one SSE record into engine chunks: one per choice, plus a
    /// usage-only chunk for the final record some providers send with empty
    /// choices.
    fn into_chunks(self) -> Vec<ChatChunk> {
        let usage = self.usage.map(LlmUsage::from);
        let mut out: Vec<ChatChunk> = self
            .choices
            .into_iter()
            .map(|choice| ChatChunk {
                delta: choice.delta.content.filter(|c| !c.is_empty()),
                tool_calls: choice
                    .delta
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| ToolCallChunk {
                        index: tc.index,
                        id: tc.id,
                        name: tc.function.as_ref().and_then(|f| f.name.clone()),
                        arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                    })
                    .collect(),
                finish_reason: choice.finish_reason,
                usage: None,
            })
            .collect();
        if let Some(u) = usage {
            match out.last_mut() {
                Some(last) => last.usage = Some(u),
                None => out.push(ChatChunk {
                    usage: Some(u),
                    ..Default::default()
                }),
            }
        }
        out
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiStreamChoice {
    #[serde(default)]
    delta: ApiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaToolCall {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ApiDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ApiUsage> for LlmUsage {
    fn from(u: ApiUsage) -> Self {
        LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}
