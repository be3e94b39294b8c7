//! `message/stream`: SSE framing, delta order, terminal frames, [DONE].

use serde_json::Value;

use adk::llm::{text_chunk, tool_call_chunk};
use adk::MockLlm;

use crate::common::{scripted_agent, send_params, spawn_server, stream_records};

fn parse(records: &[String]) -> Vec<Value> {
    records
        .iter()
        .filter(|r| *r != "[DONE]")
        .map(|r| serde_json::from_str(r).expect("frame is JSON"))
        .collect()
}

/// **Scenario**: streaming deltas. Frames in order: working status update,
/// three working task snapshots carrying exactly the delta texts, a final
/// completed status update, then [DONE].
#[tokio::test]
async fn streaming_deltas_in_order() {
    let agent = scripted_agent(vec![vec![
        text_chunk("Hel"),
        text_chunk("lo "),
        text_chunk("world"),
        MockLlm::finish("stop"),
    ]]);
    let (url, _manager) = spawn_server(agent).await;

    let records = stream_records(&url, 7, send_params("Hello", None, None)).await;
    assert_eq!(records.last().map(String::as_str), Some("[DONE]"));

    let frames = parse(&records);
    for frame in &frames {
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["id"], 7, "request id echoed on every frame");
    }

    let first = &frames[0]["result"];
    assert_eq!(first["kind"], "status-update");
    assert_eq!(first["status"]["state"], "working");
    assert_eq!(first["final"], false);

    let deltas: Vec<&str> = frames
        .iter()
        .filter(|f| f["result"]["kind"].is_null())
        .map(|f| f["result"]["status"]["message"]["parts"][0]["text"].as_str().unwrap())
        .collect();
    assert_eq!(deltas, vec!["Hel", "lo ", "world"]);

    let last = &frames.last().unwrap()["result"];
    assert_eq!(last["kind"], "status-update");
    assert_eq!(last["status"]["state"], "completed");
    assert_eq!(last["final"], true);
}

/// **Scenario**: the input-required pause ends the stream with a non-final
/// status update and no [DONE] marker; the task is persisted paused.
#[tokio::test]
async fn input_required_ends_stream_without_done() {
    let agent = scripted_agent(vec![vec![
        tool_call_chunk(0, "call-1", "input_required", r#"{"message":"What city?"}"#),
        MockLlm::finish("tool_calls"),
    ]]);
    let (url, manager) = spawn_server(agent).await;

    let records = stream_records(&url, 1, send_params("Weather?", None, None)).await;
    assert!(!records.contains(&"[DONE]".to_string()));

    let frames = parse(&records);
    let last = &frames.last().unwrap()["result"];
    assert_eq!(last["kind"], "status-update");
    assert_eq!(last["status"]["state"], "input-required");
    assert_eq!(last["status"]["message"]["kind"], "input_required");
    assert_eq!(last["status"]["message"]["parts"][0]["text"], "What city?");

    let task_id = last["taskId"].as_str().unwrap();
    let stored = manager.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(stored.status.state, a2a_types::TaskState::InputRequired);
}

/// **Scenario**: a tool round streams a completed run whose persisted history
/// interleaves assistant, tool, assistant.
#[tokio::test]
async fn tool_round_streams_to_completion() {
    let agent = scripted_agent(vec![
        vec![
            tool_call_chunk(0, "call-1", "get_weather", r#"{"location":"SF"}"#),
            MockLlm::finish("tool_calls"),
        ],
        vec![text_chunk("It's 72"), MockLlm::finish("stop")],
    ]);
    let (url, manager) = spawn_server(agent).await;

    let records = stream_records(&url, 1, send_params("Weather in SF?", None, None)).await;
    assert_eq!(records.last().map(String::as_str), Some("[DONE]"));

    let frames = parse(&records);
    let last = &frames.last().unwrap()["result"];
    assert_eq!(last["status"]["state"], "completed");

    let task_id = last["taskId"].as_str().unwrap();
    let stored = manager.get_task(task_id).await.unwrap().unwrap();
    let roles: Vec<&str> = stored
        .history
        .iter()
        .map(|m| m.role.as_str())
        .collect();
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);
}

/// **Scenario**: cancellation mid-stream. `tasks/cancel` returns the
/// canceled task while the run is blocked in a tool; the stream then
/// terminates with a final canceled status update and no further deltas.
#[tokio::test]
async fn cancel_mid_stream_terminates_with_canceled() {
    use async_trait::async_trait;
    use futures_util::StreamExt;

    struct SlowTool;

    #[async_trait]
    impl adk::Tool for SlowTool {
        fn name(&self) -> &str {
            "slow_lookup"
        }

        fn spec(&self) -> adk::ToolSpec {
            adk::ToolSpec {
                name: "slow_lookup".into(),
                description: Some("blocks until canceled".into()),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn call(
            &self,
            _args: serde_json::Map<String, Value>,
            ctx: &adk::ToolContext,
        ) -> Result<String, adk::ToolError> {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    Err(adk::ToolError::ExecutionFailed("canceled".into()))
                }
                _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
                    Ok("too late".into())
                }
            }
        }
    }

    let agent = adk::Agent::builder("e2e-agent")
        .llm(std::sync::Arc::new(adk::MockLlm::new(vec![
            vec![
                tool_call_chunk(0, "call-slow", "slow_lookup", "{}"),
                MockLlm::finish("tool_calls"),
            ],
            vec![text_chunk("never reached"), MockLlm::finish("stop")],
        ])))
        .tool(std::sync::Arc::new(SlowTool))
        .build()
        .unwrap();
    let (url, _manager) = spawn_server(agent).await;

    let body = serde_json::json!({
        "jsonrpc": "2.0", "id": 5, "method": "message/stream",
        "params": send_params("go", None, None)
    });
    let response = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();

    // Read incrementally until the first frame gives us the task id.
    let mut byte_stream = response.bytes_stream();
    let mut buffer = String::new();
    let task_id = loop {
        let chunk = byte_stream.next().await.expect("stream open").unwrap();
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        if let Some(pos) = buffer.find("\n\n") {
            let record = buffer[..pos].trim().strip_prefix("data: ").unwrap().to_string();
            buffer.drain(..pos + 2);
            let frame: Value = serde_json::from_str(&record).unwrap();
            assert_eq!(frame["result"]["status"]["state"], "working");
            break frame["result"]["taskId"].as_str().unwrap().to_string();
        }
    };

    let cancel_response =
        crate::common::rpc_call(&url, 6, "tasks/cancel", serde_json::json!({"id": task_id})).await;
    assert_eq!(cancel_response["result"]["status"]["state"], "canceled");

    // Drain the rest of the stream; the final data frame is the canceled
    // status update and no delta frames follow the cancel.
    while let Some(chunk) = byte_stream.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
    }
    let records: Vec<&str> = buffer
        .split("\n\n")
        .filter_map(|r| r.trim().strip_prefix("data: "))
        .collect();
    let last_frame: Value = records
        .iter()
        .rev()
        .find(|r| **r != "[DONE]")
        .map(|r| serde_json::from_str(r).unwrap())
        .expect("a terminal frame");
    assert_eq!(last_frame["result"]["kind"], "status-update");
    assert_eq!(last_frame["result"]["status"]["state"], "canceled");
    assert_eq!(last_frame["result"]["final"], true);
    assert!(!records
        .iter()
        .any(|r| r.contains("\"state\":\"working\"") && r.contains("history")));
}

/// **Scenario**: an LLM stream failure yields a JSON-RPC error frame and a
/// failed task; no [DONE].
#[tokio::test]
async fn stream_failure_writes_error_frame() {
    let agent = crate::common::scripted_failing_agent("backend exploded");
    let (url, manager) = spawn_server(agent).await;

    let records = stream_records(&url, 1, send_params("Hello", None, None)).await;
    assert!(!records.contains(&"[DONE]".to_string()));

    let frames = parse(&records);
    let last = frames.last().unwrap();
    assert_eq!(last["error"]["code"], -32603);
    assert!(last["error"]["message"]
        .as_str()
        .unwrap()
        .contains("backend exploded"));

    // The working frame carried the task id; the stored task is failed.
    let task_id = frames[0]["result"]["taskId"].as_str().unwrap();
    let stored = manager.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(stored.status.state, a2a_types::TaskState::Failed);
}
