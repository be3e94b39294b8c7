//! `tasks/get`, `tasks/list`, `tasks/cancel`.

use serde_json::json;

use adk::llm::text_chunk;
use adk::MockLlm;

use crate::common::{rpc_call, scripted_agent, send_params, spawn_server, wait_for_state};

/// **Scenario**: unknown task IDs get the dedicated error code.
#[tokio::test]
async fn get_unknown_task_is_not_found() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let response = rpc_call(&url, 1, "tasks/get", json!({"id": "no-such-task"})).await;
    assert_eq!(response["error"]["code"], -32001);
}

/// **Scenario**: list filters by context and state and paginates newest
/// first with a stable total.
#[tokio::test]
async fn list_filters_and_paginates() {
    let turns = (0..3)
        .map(|i| vec![text_chunk(&format!("answer {i}")), MockLlm::finish("stop")])
        .collect();
    let agent = scripted_agent(turns);
    let (url, _manager) = spawn_server(agent).await;

    let mut ids = Vec::new();
    for (i, ctx) in ["ctx-a", "ctx-a", "ctx-b"].iter().enumerate() {
        let response = rpc_call(
            &url,
            i as u64,
            "message/send",
            send_params(&format!("q{i}"), None, Some(ctx)),
        )
        .await;
        let id = response["result"]["id"].as_str().unwrap().to_string();
        wait_for_state(&url, &id, "completed").await;
        ids.push(id);
    }

    let response = rpc_call(&url, 10, "tasks/list", json!({"contextId": "ctx-a"})).await;
    assert_eq!(response["result"]["total"], 2);
    assert_eq!(response["result"]["tasks"].as_array().unwrap().len(), 2);

    let response = rpc_call(
        &url,
        11,
        "tasks/list",
        json!({"contextId": "ctx-a", "limit": 1, "offset": 1}),
    )
    .await;
    assert_eq!(response["result"]["total"], 2, "total ignores pagination");
    assert_eq!(response["result"]["tasks"].as_array().unwrap().len(), 1);

    let response = rpc_call(&url, 12, "tasks/list", json!({"state": "completed"})).await;
    assert_eq!(response["result"]["total"], 3);

    let response = rpc_call(&url, 13, "tasks/list", json!({"state": "failed"})).await;
    assert_eq!(response["result"]["total"], 0);
}

/// **Scenario**: cancel moves a live task to canceled; a second cancel is
/// rejected with the dedicated code (terminal tasks are not cancelable).
#[tokio::test]
async fn cancel_then_cancel_again() {
    // No scripted turns: the task would fail if a worker picked it up, but
    // cancel wins the race through the manager regardless.
    let agent = scripted_agent(vec![]);
    let (url, manager) = spawn_server(agent).await;

    let task = manager
        .create_task(
            "ctx-cancel",
            a2a_types::TaskState::Submitted,
            a2a_types::Message::user("hold"),
        )
        .await
        .unwrap();

    let response = rpc_call(&url, 1, "tasks/cancel", json!({"id": task.id})).await;
    assert_eq!(response["result"]["status"]["state"], "canceled");

    let response = rpc_call(&url, 2, "tasks/cancel", json!({"id": task.id})).await;
    assert_eq!(response["error"]["code"], -32002);
}
