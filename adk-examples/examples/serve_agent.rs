//! Example: serve an agent over A2A JSON-RPC.
//!
//! Talks to the OpenAI-compatible backend named by `ADK_MODEL` (key from
//! `OPENAI_API_KEY`, base from `OPENAI_BASE_URL`; a `.env` or the settings
//! file work too). Then:
//!
//! ```sh
//! curl -s localhost:8080 -d '{"jsonrpc":"2.0","id":1,"method":"message/send",
//!   "params":{"message":{"kind":"message","messageId":"m1","role":"user",
//!   "parts":[{"kind":"text","text":"Hello"}]}}}'
//! ```
//!
//! Run: `cargo run -p adk-examples --example serve_agent`

use adk::Agent;
use config::ServerSettings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    serve::init_tracing();
    let settings = ServerSettings::load()?;

    let agent = Agent::builder("assistant")
        .description("a general-purpose assistant")
        .instruction("You are a helpful assistant. Be concise.")
        .openai_model(settings.model.clone())
        .max_iterations(settings.max_iterations)
        .build()?;

    serve::run_serve(agent, settings).await
}
