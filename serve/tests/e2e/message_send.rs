//! `message/send`: background execution, context continuity, and the
//! input-required pause/resume round trip.

use serde_json::json;

use adk::llm::{text_chunk, tool_call_chunk};
use adk::MockLlm;

use crate::common::{rpc_call, scripted_agent, send_params, spawn_server, wait_for_state};

/// **Scenario**: simple completion. The send returns a submitted task; the
/// background worker completes it with the scripted reply and one iteration
/// in the execution stats.
#[tokio::test]
async fn simple_completion_runs_in_background() {
    let agent = scripted_agent(vec![vec![text_chunk("Hi!"), MockLlm::finish("stop")]]);
    let (url, _manager) = spawn_server(agent).await;

    let response = rpc_call(&url, 1, "message/send", send_params("Hello", None, None)).await;
    let task = &response["result"];
    assert_eq!(task["status"]["state"], "submitted");
    assert_eq!(task["history"][0]["parts"][0]["text"], "Hello");
    let task_id = task["id"].as_str().unwrap().to_string();

    let done = wait_for_state(&url, &task_id, "completed").await;
    let history = done["history"].as_array().unwrap();
    assert_eq!(history.len(), 2, "user + assistant: {done}");
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["parts"][0]["text"], "Hi!");
    assert_eq!(done["metadata"]["execution_stats"]["iterations"], 1);
}

/// **Scenario**: tool call loop. First turn requests get_weather, second
/// turn answers; history interleaves assistant, tool, assistant and the
/// stats count one tool call.
#[tokio::test]
async fn tool_call_loop_completes() {
    let agent = scripted_agent(vec![
        vec![
            tool_call_chunk(0, "call-1", "get_weather", r#"{"location":"SF"}"#),
            MockLlm::finish("tool_calls"),
        ],
        vec![text_chunk("It's 72"), MockLlm::finish("stop")],
    ]);
    let (url, _manager) = spawn_server(agent).await;

    let response = rpc_call(&url, 1, "message/send", send_params("Weather in SF?", None, None)).await;
    let task_id = response["result"]["id"].as_str().unwrap().to_string();

    let done = wait_for_state(&url, &task_id, "completed").await;
    let roles: Vec<&str> = done["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);
    let tool_data = &done["history"][2]["parts"][0]["data"];
    assert_eq!(tool_data["tool_call_id"], "call-1");
    assert_eq!(tool_data["tool_name"], "get_weather");
    assert_eq!(tool_data["is_error"], false);
    assert_eq!(done["metadata"]["execution_stats"]["tool_calls"], 1);
    assert_eq!(done["metadata"]["execution_stats"]["iterations"], 2);
}

/// **Scenario**: input-required pause then resume by taskId. The resumed
/// task keeps its ID and history, returns to working, and completes.
#[tokio::test]
async fn pause_and_resume_by_task_id() {
    let agent = scripted_agent(vec![
        vec![
            tool_call_chunk(0, "call-1", "input_required", r#"{"message":"What city?"}"#),
            MockLlm::finish("tool_calls"),
        ],
        vec![text_chunk("Sunny in SF"), MockLlm::finish("stop")],
    ]);
    let (url, _manager) = spawn_server(agent).await;

    let response = rpc_call(&url, 1, "message/send", send_params("Weather?", None, None)).await;
    let task_id = response["result"]["id"].as_str().unwrap().to_string();

    let paused = wait_for_state(&url, &task_id, "input-required").await;
    assert_eq!(paused["status"]["message"]["kind"], "input_required");
    assert_eq!(paused["status"]["message"]["parts"][0]["text"], "What city?");

    let response = rpc_call(
        &url,
        2,
        "message/send",
        send_params("SF", Some(&task_id), None),
    )
    .await;
    let resumed = &response["result"];
    assert_eq!(resumed["id"], task_id.as_str(), "same task resumed");
    assert_eq!(resumed["status"]["state"], "working");

    let done = wait_for_state(&url, &task_id, "completed").await;
    let texts: Vec<String> = done["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["parts"][0]["text"].as_str().unwrap_or("").to_string())
        .collect();
    assert!(texts.contains(&"SF".to_string()), "resume message kept: {texts:?}");
    assert_eq!(done["status"]["message"]["parts"][0]["text"], "Sunny in SF");
}

/// **Scenario**: a second send with the same contextId seeds the new task
/// with the finished conversation.
#[tokio::test]
async fn context_history_carries_across_tasks() {
    let agent = scripted_agent(vec![
        vec![text_chunk("First answer"), MockLlm::finish("stop")],
        vec![text_chunk("Second answer"), MockLlm::finish("stop")],
    ]);
    let (url, _manager) = spawn_server(agent).await;

    let response = rpc_call(
        &url,
        1,
        "message/send",
        send_params("First question", None, Some("ctx-42")),
    )
    .await;
    let first_id = response["result"]["id"].as_str().unwrap().to_string();
    wait_for_state(&url, &first_id, "completed").await;

    let response = rpc_call(
        &url,
        2,
        "message/send",
        send_params("Second question", None, Some("ctx-42")),
    )
    .await;
    let second = &response["result"];
    assert_ne!(second["id"], first_id.as_str(), "new task per turn");
    let history = second["history"].as_array().unwrap();
    assert!(
        history.len() >= 3,
        "seeded with prior turns plus the new message: {history:?}"
    );
    assert_eq!(
        history.last().unwrap()["parts"][0]["text"],
        "Second question"
    );
}

/// **Scenario**: an empty parts list is the dedicated service error.
#[tokio::test]
async fn empty_parts_rejected() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let params = json!({"message": {
        "kind": "message",
        "messageId": "m-1",
        "role": "user",
        "parts": []
    }});
    let response = rpc_call(&url, 1, "message/send", params).await;
    assert_eq!(response["error"]["code"], -32004);
}
