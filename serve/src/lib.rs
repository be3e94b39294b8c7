//! A2A JSON-RPC server over HTTP (axum).
//!
//! One POST endpoint accepts JSON-RPC 2.0 envelopes for `message/send`,
//! `message/stream`, `tasks/get`, `tasks/list`, `tasks/cancel`, and
//! `tasks/pushNotificationConfig/{set,get,list,delete}`. `message/stream`
//! switches the connection to Server-Sent Events and forwards the agent's
//! event stream; everything else returns a standard JSON-RPC response.
//! The agent card is served at `/.well-known/agent.json`.
//!
//! **Public API**: [`ServerBuilder`], [`A2AServer`], [`run_serve`],
//! [`WebhookPushSender`], [`AgentCard`], [`AgentCapabilities`].

mod app;
mod builder;
mod card;
mod push;
mod rpc;
mod stream;

pub use builder::{A2AServer, RetentionPolicy, ServerBuilder};
pub use card::{AgentCapabilities, AgentCard, AGENT_CARD_PATH};
pub use push::WebhookPushSender;

use adk::Agent;
use config::ServerSettings;

/// Initializes tracing from `RUST_LOG` (falls back to `info`).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Builds the server from settings and serves until the process exits.
/// Resolve `settings` with `ServerSettings::load()` so the settings and the
/// LLM client see `.env` and config-file values.
pub async fn run_serve(
    agent: Agent,
    settings: ServerSettings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bind_addr = settings.bind_addr.clone();
    let server = ServerBuilder::from_settings(&settings).agent(agent).build()?;
    server.run(&bind_addr).await
}
