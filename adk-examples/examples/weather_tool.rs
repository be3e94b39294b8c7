//! Example: the tool loop end to end with a scripted model.
//!
//! The first scripted turn requests `get_weather`; the tool result is fed
//! back and the second turn answers. Prints the final history the task
//! manager would persist.
//!
//! Run: `cargo run -p adk-examples --example weather_tool`

use std::sync::Arc;

use a2a_types::Message;
use adk::llm::{text_chunk, tool_call_chunk};
use adk::{Agent, ExecutionContext, ExecutionEvent, FnTool, MockLlm};

#[tokio::main]
async fn main() {
    let llm = MockLlm::new(vec![
        vec![
            tool_call_chunk(0, "call-1", "get_weather", r#"{"location":"SF"}"#),
            MockLlm::finish("tool_calls"),
        ],
        vec![text_chunk("It's 72 and sunny."), MockLlm::finish("stop")],
    ]);

    let agent = Agent::builder("weather")
        .description("answers weather questions with a lookup tool")
        .instruction("Answer weather questions. Use get_weather for current data.")
        .llm(Arc::new(llm))
        .tool(Arc::new(FnTool::new(
            "get_weather",
            "Returns the current weather for a location",
            serde_json::json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
            |args| {
                let location = args
                    .get("location")
                    .and_then(|v| v.as_str())
                    .unwrap_or("somewhere");
                Ok(format!(r#"{{"location":"{location}","temperature":72}}"#))
            },
        )))
        .build()
        .expect("agent builds");

    let mut conversation = vec![Message::user("What's the weather in SF?")];
    let mut events = agent
        .run_with_stream(ExecutionContext::new(), conversation.clone())
        .expect("run starts");

    while let Some(event) = events.recv().await {
        match event {
            ExecutionEvent::IterationCompleted { message }
            | ExecutionEvent::ToolResult { message } => conversation.push(message),
            ExecutionEvent::TaskStatusChanged { status } if status.state.is_terminal() => {
                println!("final state: {}", status.state);
            }
            _ => {}
        }
    }

    for message in &conversation {
        println!("{}: {}", message.role, message.text());
    }
}
