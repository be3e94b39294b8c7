//! Example: drive one agent run with a scripted model and print the events.
//!
//! No network: the mock plays three text deltas and finishes. Shows the
//! event stream a client of `message/stream` would see before framing.
//!
//! Run: `cargo run -p adk-examples --example scripted_run -- "hello"`

use std::env;
use std::sync::Arc;

use a2a_types::Message;
use adk::{Agent, ExecutionContext, ExecutionEvent, MockLlm};

#[tokio::main]
async fn main() {
    let input = env::args().nth(1).unwrap_or_else(|| "hello".to_string());

    let agent = Agent::builder("scripted")
        .description("replies with a fixed streamed answer")
        .llm(Arc::new(MockLlm::with_text_chunks(&[
            "Hel", "lo ", "world",
        ])))
        .build()
        .expect("agent builds");

    let mut events = agent
        .run_with_stream(ExecutionContext::new(), vec![Message::user(input)])
        .expect("run starts");

    while let Some(event) = events.recv().await {
        match &event {
            ExecutionEvent::Delta { message } => {
                println!("delta: {:?}", message.text());
            }
            ExecutionEvent::TaskStatusChanged { status } => {
                println!("status: {}", status.state);
            }
            other => println!("{}", other.kind()),
        }
    }
}
