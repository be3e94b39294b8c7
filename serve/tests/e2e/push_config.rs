//! Push-notification config CRUD and webhook delivery.

use std::sync::{Arc, Mutex};

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use adk::llm::text_chunk;
use adk::MockLlm;

use crate::common::{rpc_call, scripted_agent, send_params, spawn_server, wait_for_state};

/// **Scenario**: set/get/list/delete round-trip; set for a missing task is
/// the dedicated error.
#[tokio::test]
async fn push_config_crud() {
    let agent = scripted_agent(vec![]);
    let (url, manager) = spawn_server(agent).await;

    let response = rpc_call(
        &url,
        1,
        "tasks/pushNotificationConfig/set",
        json!({"taskId": "ghost", "pushNotificationConfig": {"url": "https://hook"}}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32001);

    let task = manager
        .create_task(
            "ctx-push",
            a2a_types::TaskState::Submitted,
            a2a_types::Message::user("x"),
        )
        .await
        .unwrap();

    let params = json!({
        "taskId": task.id,
        "pushNotificationConfig": {"url": "https://hook.example/h", "token": "secret"}
    });
    let response = rpc_call(&url, 2, "tasks/pushNotificationConfig/set", params.clone()).await;
    assert_eq!(response["result"], params);

    let response =
        rpc_call(&url, 3, "tasks/pushNotificationConfig/get", json!({"id": task.id})).await;
    assert_eq!(
        response["result"]["pushNotificationConfig"]["url"],
        "https://hook.example/h"
    );

    let response = rpc_call(&url, 4, "tasks/pushNotificationConfig/list", json!({})).await;
    assert_eq!(response["result"].as_array().unwrap().len(), 1);

    let response =
        rpc_call(&url, 5, "tasks/pushNotificationConfig/delete", json!({"id": task.id})).await;
    assert!(response["error"].is_null());

    let response =
        rpc_call(&url, 6, "tasks/pushNotificationConfig/get", json!({"id": task.id})).await;
    assert!(response["result"].is_null());
}

/// **Scenario**: a completed background task POSTs a task_update to the
/// registered webhook.
#[tokio::test]
async fn webhook_receives_task_update() {
    // Tiny receiver recording webhook bodies.
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let receiver = Router::new().route(
        "/hook",
        post(move |Json(body): Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(body);
                "ok"
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let hook_url = format!("http://{}/hook", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let _ = axum::serve(listener, receiver).await;
    });

    let agent = scripted_agent(vec![vec![text_chunk("done"), MockLlm::finish("stop")]]);
    let (url, manager) = spawn_server(agent).await;

    // Create paused so the config can be registered before the worker runs.
    let task = manager
        .create_task(
            "ctx-hook",
            a2a_types::TaskState::Submitted,
            a2a_types::Message::user("Hello"),
        )
        .await
        .unwrap();
    rpc_call(
        &url,
        1,
        "tasks/pushNotificationConfig/set",
        json!({"taskId": task.id, "pushNotificationConfig": {"url": hook_url, "token": "tok"}}),
    )
    .await;
    manager.enqueue_task(&task.id, None).unwrap();
    wait_for_state(&url, &task.id, "completed").await;

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if let Some(body) = received.lock().unwrap().first().cloned() {
            assert_eq!(body["type"], "task_update");
            assert_eq!(body["taskId"], task.id.as_str());
            assert_eq!(body["state"], "completed");
            assert_eq!(body["task"]["status"]["state"], "completed");
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "webhook never received the update"
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

/// **Scenario**: a send created in the normal flow also works end-to-end
/// when the config is registered between submit and completion — delivery is
/// best-effort, so a missing config simply skips the webhook.
#[tokio::test]
async fn send_without_config_skips_webhook() {
    let agent = scripted_agent(vec![vec![text_chunk("no hook"), MockLlm::finish("stop")]]);
    let (url, _manager) = spawn_server(agent).await;
    let response = rpc_call(&url, 1, "message/send", send_params("Hello", None, None)).await;
    let task_id = response["result"]["id"].as_str().unwrap().to_string();
    wait_for_state(&url, &task_id, "completed").await;
}
