//! Envelope-level failures: parse errors, bad versions, unknown methods,
//! malformed params.

use serde_json::json;

use crate::common::{rpc_call, rpc_call_raw, scripted_agent, spawn_server};

/// **Scenario**: a non-JSON body is a parse error with a null id.
#[tokio::test]
async fn garbage_body_is_parse_error() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let response = rpc_call_raw(&url, "this is not json{").await;
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());
}

/// **Scenario**: a wrong jsonrpc version is an invalid request.
#[tokio::test]
async fn wrong_version_is_invalid_request() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let response =
        rpc_call_raw(&url, r#"{"jsonrpc":"1.0","id":1,"method":"tasks/list"}"#).await;
    assert_eq!(response["error"]["code"], -32600);
}

/// **Scenario**: unknown methods echo the id with the method-not-found code.
#[tokio::test]
async fn unknown_method() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let response = rpc_call(&url, 9, "tasks/frobnicate", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["id"], 9);
}

/// **Scenario**: structurally wrong params map to invalid params.
#[tokio::test]
async fn structural_param_errors_are_invalid_params() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;
    let response = rpc_call(&url, 1, "tasks/get", json!({"not_id": true})).await;
    assert_eq!(response["error"]["code"], -32602);

    let response = rpc_call(&url, 2, "message/send", json!({"message": "just a string"})).await;
    assert_eq!(response["error"]["code"], -32602);
}
