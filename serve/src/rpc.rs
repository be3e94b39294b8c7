//! JSON-RPC dispatch: parse the envelope, decode params, call the task
//! manager, marshal the response.
//!
//! `message/send` and `message/stream` share task resolution: an inbound
//! `taskId` resumes the paused task, an inbound `contextId` seeds the new
//! task with that context's conversation history, otherwise a fresh context
//! is generated.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::debug;

use a2a_types::{
    new_id, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams, Task,
    TaskIdParams, TaskListParams, TaskPushNotificationConfig, TaskState, JSONRPC_VERSION,
};
use adk::AdkError;

use crate::app::AppState;
use crate::stream::sse_response;

pub(crate) async fn handle_rpc(State(state): State<Arc<AppState>>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            return json_response(JsonRpcResponse::error(None, JsonRpcError::parse_error(e)))
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return json_response(JsonRpcResponse::error(
            request.id,
            JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
        ));
    }

    let id = request.id.clone();
    debug!(method = %request.method, "rpc request");
    match request.method.as_str() {
        "message/send" => respond(id.clone(), message_send(&state, id, request.params).await),
        "message/stream" => message_stream(state, id, request.params).await,
        "tasks/get" => respond(id, tasks_get(&state, request.params).await),
        "tasks/list" => respond(id, tasks_list(&state, request.params).await),
        "tasks/cancel" => respond(id, tasks_cancel(&state, request.params).await),
        "tasks/pushNotificationConfig/set" => {
            respond(id, push_config_set(&state, request.params).await)
        }
        "tasks/pushNotificationConfig/get" => {
            respond(id, push_config_get(&state, request.params).await)
        }
        "tasks/pushNotificationConfig/list" => respond(id, push_config_list(&state).await),
        "tasks/pushNotificationConfig/delete" => {
            respond(id, push_config_delete(&state, request.params).await)
        }
        other => json_response(JsonRpcResponse::error(
            id,
            JsonRpcError::method_not_found(other),
        )),
    }
}

fn respond(id: Option<Value>, result: Result<Value, JsonRpcError>) -> Response {
    match result {
        Ok(value) => json_response(JsonRpcResponse::success(id, value)),
        Err(error) => json_response(JsonRpcResponse::error(id, error)),
    }
}

pub(crate) fn json_response(envelope: JsonRpcResponse) -> Response {
    Json(envelope).into_response()
}

fn decode_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(JsonRpcError::invalid_params)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(JsonRpcError::internal)
}

/// Maps core errors onto the JSON-RPC code space.
pub(crate) fn map_adk_error(err: AdkError) -> JsonRpcError {
    match &err {
        AdkError::TaskNotFound(id) => JsonRpcError::task_not_found(id),
        AdkError::TaskNotCancelable(id) => JsonRpcError::task_not_cancelable(id),
        AdkError::QueueFull => JsonRpcError::queue_full(),
        AdkError::EmptyMessageParts => JsonRpcError::empty_message_parts(),
        AdkError::TaskNotPaused(_)
        | AdkError::InvalidTransition { .. }
        | AdkError::InvalidConfig(_) => JsonRpcError::invalid_params(err),
        _ => JsonRpcError::internal(err),
    }
}

/// Resolves the task for an inbound message: resume by `taskId`, create in
/// the referenced context (seeded with its history when non-empty), or
/// create in a fresh context.
pub(crate) async fn resolve_task(
    state: &AppState,
    message: Message,
) -> Result<Task, JsonRpcError> {
    if message.parts.is_empty() {
        return Err(JsonRpcError::empty_message_parts());
    }
    if let Some(task_id) = message.task_id.clone() {
        return state
            .manager
            .resume_task_with_input(&task_id, message)
            .await
            .map_err(map_adk_error);
    }
    let (context_id, history) = match message.context_id.clone() {
        Some(context_id) => {
            let history = state
                .manager
                .get_conversation_history(&context_id)
                .await
                .map_err(map_adk_error)?;
            (context_id, history)
        }
        None => (new_id(), Vec::new()),
    };
    let task = if history.is_empty() {
        state
            .manager
            .create_task(&context_id, TaskState::Submitted, message)
            .await
    } else {
        state
            .manager
            .create_task_with_history(&context_id, TaskState::Submitted, message, history)
            .await
    };
    task.map_err(map_adk_error)
}

async fn message_send(
    state: &AppState,
    request_id: Option<Value>,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params: MessageSendParams = decode_params(params)?;
    let task = resolve_task(state, params.message).await?;
    state
        .manager
        .enqueue_task(&task.id, request_id.map(|v| v.to_string()))
        .map_err(map_adk_error)?;
    to_value(&task)
}

async fn message_stream(
    state: Arc<AppState>,
    request_id: Option<Value>,
    params: Option<Value>,
) -> Response {
    if !state.card.capabilities.streaming {
        return json_response(JsonRpcResponse::error(
            request_id,
            JsonRpcError::invalid_request("streaming is not supported by this agent"),
        ));
    }
    let params: MessageSendParams = match decode_params(params) {
        Ok(p) => p,
        Err(e) => return json_response(JsonRpcResponse::error(request_id, e)),
    };
    let task = match resolve_task(&state, params.message).await {
        Ok(t) => t,
        Err(e) => return json_response(JsonRpcResponse::error(request_id, e)),
    };
    sse_response(state, request_id, task).await
}

async fn tasks_get(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: TaskIdParams = decode_params(params)?;
    match state.manager.get_task(&params.id).await.map_err(map_adk_error)? {
        Some(task) => to_value(&task),
        None => Err(JsonRpcError::task_not_found(&params.id)),
    }
}

async fn tasks_list(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: TaskListParams = decode_params(params)?;
    let list = state
        .manager
        .list_tasks(&params)
        .await
        .map_err(map_adk_error)?;
    to_value(&list)
}

async fn tasks_cancel(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: TaskIdParams = decode_params(params)?;
    let task = state
        .manager
        .cancel_task(&params.id)
        .await
        .map_err(map_adk_error)?;
    to_value(&task)
}

async fn push_config_set(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: TaskPushNotificationConfig = decode_params(params)?;
    state
        .manager
        .set_task_push_config(params.clone())
        .await
        .map_err(map_adk_error)?;
    to_value(&params)
}

async fn push_config_get(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: TaskIdParams = decode_params(params)?;
    if state
        .manager
        .get_task(&params.id)
        .await
        .map_err(map_adk_error)?
        .is_none()
    {
        return Err(JsonRpcError::task_not_found(&params.id));
    }
    match state
        .manager
        .get_task_push_config(&params.id)
        .await
        .map_err(map_adk_error)?
    {
        Some(config) => to_value(&TaskPushNotificationConfig {
            task_id: params.id,
            push_notification_config: config,
        }),
        None => Ok(Value::Null),
    }
}

async fn push_config_list(state: &AppState) -> Result<Value, JsonRpcError> {
    let configs = state
        .manager
        .list_task_push_configs()
        .await
        .map_err(map_adk_error)?;
    to_value(&configs)
}

async fn push_config_delete(
    state: &AppState,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params: TaskIdParams = decode_params(params)?;
    state
        .manager
        .delete_task_push_config(&params.id)
        .await
        .map_err(map_adk_error)?;
    Ok(Value::Null)
}
