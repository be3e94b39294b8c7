//! Shared helpers for the e2e suite. Responses are logged with
//! `[e2e] received: ...`; run with `--nocapture` to see them.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use adk::llm::MockTurn;
use adk::{Agent, FnTool, MockLlm, TaskManager};
use serve::ServerBuilder;

/// Agent driven by a scripted mock LLM, with a weather tool registered.
pub fn scripted_agent(turns: Vec<MockTurn>) -> Agent {
    Agent::builder("e2e-agent")
        .description("scripted agent for e2e tests")
        .llm(Arc::new(MockLlm::new(turns)))
        .tool(Arc::new(FnTool::new(
            "get_weather",
            "Returns the weather for a location",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
            |_args| Ok(r#"{"temperature":72}"#.to_string()),
        )))
        .build()
        .expect("agent builds")
}

/// Agent whose LLM reports the given error on every call.
pub fn scripted_failing_agent(message: &str) -> Agent {
    Agent::builder("e2e-agent")
        .llm(Arc::new(MockLlm::failing(message)))
        .build()
        .expect("agent builds")
}

/// Binds a random port, spawns the server, and returns the base URL plus the
/// task manager for direct assertions.
pub async fn spawn_server(agent: Agent) -> (String, Arc<TaskManager>) {
    let server = ServerBuilder::new()
        .agent(agent)
        .workers(2)
        .build()
        .expect("server builds");
    let manager = server.manager();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.run_on_listener(listener));
    (format!("http://{addr}"), manager)
}

/// Sends one JSON-RPC request and returns the parsed response envelope.
pub async fn rpc_call(base_url: &str, id: u64, method: &str, params: Value) -> Value {
    let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
    rpc_call_raw(base_url, &body.to_string()).await
}

/// Sends a raw body to the RPC endpoint and returns the parsed response.
pub async fn rpc_call_raw(base_url: &str, body: &str) -> Value {
    let client = reqwest::Client::new();
    let text = client
        .post(base_url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("rpc request")
        .text()
        .await
        .expect("rpc response body");
    eprintln!("[e2e] received: {text}");
    serde_json::from_str(&text).expect("rpc response is JSON")
}

/// `message/send` params for one user text message, optionally bound to a
/// task (resume) or context.
pub fn send_params(text: &str, task_id: Option<&str>, context_id: Option<&str>) -> Value {
    let mut message = json!({
        "kind": "message",
        "messageId": a2a_types::new_id(),
        "role": "user",
        "parts": [{"kind": "text", "text": text}]
    });
    if let Some(task_id) = task_id {
        message["taskId"] = json!(task_id);
    }
    if let Some(context_id) = context_id {
        message["contextId"] = json!(context_id);
    }
    json!({"message": message})
}

/// Runs `message/stream` and collects the SSE records (the strings after
/// `data: `) until the server closes the stream.
pub async fn stream_records(base_url: &str, id: u64, params: Value) -> Vec<String> {
    let body = json!({"jsonrpc": "2.0", "id": id, "method": "message/stream", "params": params});
    let client = reqwest::Client::new();
    let response = client
        .post(base_url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("stream request");
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    let text = response.text().await.expect("stream body");
    eprintln!("[e2e] received stream:\n{text}");
    text.split("\n\n")
        .filter_map(|record| record.trim().strip_prefix("data: ").map(str::to_string))
        .collect()
}

/// Polls `tasks/get` until the task reaches `state` or the timeout expires.
pub async fn wait_for_state(base_url: &str, task_id: &str, state: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = rpc_call(base_url, 999, "tasks/get", json!({"id": task_id})).await;
        let task = response["result"].clone();
        if task["status"]["state"] == state {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {state}, last: {task}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
