//! SSE streaming for `message/stream`.
//!
//! Each agent event is translated into one SSE record `data: <json>\n\n`
//! whose JSON is a JSON-RPC success envelope. Deltas stream as working-state
//! task snapshots, status changes as `TaskStatusUpdateEvent` frames, artifact
//! updates as `TaskArtifactUpdateEvent` frames. Terminal status ends the
//! stream with `data: [DONE]`; an input-required pause and a stream failure
//! close without the `[DONE]` marker.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use a2a_types::{
    JsonRpcError, JsonRpcResponse, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};
use adk::handler::apply_artifact_update;
use adk::usage::{UsageTracker, EXECUTION_STATS_KEY};
use adk::ExecutionEvent;

use crate::app::AppState;
use crate::rpc::{json_response, map_adk_error};

/// Capacity of the frame channel between translator and response body.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Starts the run for `task` and returns the SSE response. Fatal errors
/// before any event is sent yield a plain JSON-RPC error response instead.
pub(crate) async fn sse_response(
    state: Arc<AppState>,
    request_id: Option<Value>,
    task: Task,
) -> Response {
    let cancel = state.manager.register_cancellation(&task.id).await;
    let (events, usage) = match state.streaming.handle_stream(&task, cancel) {
        Ok(started) => started,
        Err(e) => {
            state.manager.remove_cancellation(&task.id).await;
            return json_response(JsonRpcResponse::error(request_id, map_adk_error(e)));
        }
    };

    let (frame_tx, frame_rx) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);
    tokio::spawn(translate_events(
        state, request_id, task, events, usage, frame_tx,
    ));

    let body = Body::from_stream(
        ReceiverStream::new(frame_rx).map(|frame| Ok::<_, Infallible>(Bytes::from(frame))),
    );
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .expect("static SSE headers are valid")
}

/// One SSE record wrapping a JSON-RPC success envelope.
fn success_frame<T: serde::Serialize>(request_id: &Option<Value>, payload: &T) -> String {
    let result = serde_json::to_value(payload).unwrap_or(Value::Null);
    let envelope = JsonRpcResponse::success(request_id.clone(), result);
    frame(&envelope)
}

fn frame(envelope: &JsonRpcResponse) -> String {
    let json = serde_json::to_string(envelope).expect("envelope serialization is infallible");
    format!("data: {json}\n\n")
}

async fn send_frame(tx: &mpsc::Sender<String>, frame: String) -> bool {
    tx.send(frame).await.is_ok()
}

/// Persists the task with its execution stats. A failure here usually means
/// a concurrent cancel already made the stored task terminal.
async fn persist(state: &AppState, task: &mut Task, usage: &UsageTracker) {
    task.set_metadata(EXECUTION_STATS_KEY, usage.metadata_value());
    if let Err(e) = state.manager.update_task(task.clone()).await {
        debug!(task_id = %task.id, "stream result not persisted: {e}");
    }
}

async fn translate_events(
    state: Arc<AppState>,
    request_id: Option<Value>,
    mut task: Task,
    mut events: mpsc::Receiver<ExecutionEvent>,
    usage: Arc<UsageTracker>,
    tx: mpsc::Sender<String>,
) {
    let mut ended = false;
    let mut send_done = true;

    while let Some(event) = events.recv().await {
        match event {
            ExecutionEvent::Delta { message } => {
                let mut snapshot = task.clone();
                snapshot.status = TaskStatus::new(TaskState::Working, Some(message));
                if !send_frame(&tx, success_frame(&request_id, &snapshot)).await {
                    return;
                }
            }
            ExecutionEvent::IterationCompleted { message } => {
                task.history.push(message);
            }
            ExecutionEvent::ToolResult { message } => {
                task.history.push(message);
            }
            ExecutionEvent::ToolStarted { .. }
            | ExecutionEvent::ToolCompleted { .. }
            | ExecutionEvent::ToolFailed { .. } => {}
            ExecutionEvent::ArtifactUpdate {
                artifact,
                append,
                last_chunk,
            } => {
                apply_artifact_update(&mut task, artifact.clone(), append);
                let update = TaskArtifactUpdateEvent::new(
                    &task.id,
                    &task.context_id,
                    artifact,
                    append,
                    last_chunk,
                );
                if !send_frame(&tx, success_frame(&request_id, &update)).await {
                    return;
                }
            }
            ExecutionEvent::TaskStatusChanged { status } => {
                let terminal = status.state.is_terminal();
                task.status = status.clone();
                if terminal {
                    persist(&state, &mut task, &usage).await;
                }
                let update = TaskStatusUpdateEvent::new(&task.id, &task.context_id, status);
                if !send_frame(&tx, success_frame(&request_id, &update)).await {
                    return;
                }
                if terminal {
                    ended = true;
                    break;
                }
            }
            ExecutionEvent::InputRequired { message } => {
                task.history.push(message.clone());
                task.set_status(TaskState::InputRequired, Some(message));
                persist(&state, &mut task, &usage).await;
                let update =
                    TaskStatusUpdateEvent::new(&task.id, &task.context_id, task.status.clone());
                let _ = send_frame(&tx, success_frame(&request_id, &update)).await;
                ended = true;
                send_done = false;
                break;
            }
            ExecutionEvent::TaskInterrupted { .. } => {
                // Normally preceded by a terminal status event; this arm only
                // fires when that frame was lost.
                let prior = task.status.message.take();
                task.set_status(TaskState::Canceled, prior);
                persist(&state, &mut task, &usage).await;
                let update =
                    TaskStatusUpdateEvent::new(&task.id, &task.context_id, task.status.clone());
                let _ = send_frame(&tx, success_frame(&request_id, &update)).await;
                ended = true;
                break;
            }
            ExecutionEvent::StreamFailed { message } => {
                warn!(task_id = %task.id, "stream failed: {}", message.text());
                task.set_status(TaskState::Failed, Some(message.clone()));
                persist(&state, &mut task, &usage).await;
                let envelope = JsonRpcResponse::error(
                    request_id.clone(),
                    JsonRpcError::internal(message.text()),
                );
                let _ = send_frame(&tx, frame(&envelope)).await;
                ended = true;
                send_done = false;
                break;
            }
        }
    }

    if !ended {
        // Channel closed without a terminal event: complete with the last
        // history entry as the final message.
        let final_message = task.history.last().cloned();
        task.set_status(TaskState::Completed, final_message);
        persist(&state, &mut task, &usage).await;
        let update = TaskStatusUpdateEvent::new(&task.id, &task.context_id, task.status.clone());
        let _ = send_frame(&tx, success_frame(&request_id, &update)).await;
    }

    if send_done {
        let _ = send_frame(&tx, "data: [DONE]\n\n".to_string()).await;
    }
    state.manager.remove_cancellation(&task.id).await;
}
