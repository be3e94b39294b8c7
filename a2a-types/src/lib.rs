//! # a2a-types
//!
//! Wire types for the A2A (Agent-to-Agent) protocol: tasks, messages, parts,
//! artifacts, push-notification configs, JSON-RPC 2.0 envelopes, and the
//! streamed update events emitted over SSE.
//!
//! Pure data crate: serde shapes plus small constructors and state helpers.
//! No I/O, no async. The server and the agent core both depend on these types,
//! so the wire shape is defined exactly once.
//!
//! ## Main types
//!
//! - [`Task`], [`TaskState`], [`TaskStatus`] — the unit of work and its lifecycle.
//! - [`Message`], [`Part`], [`Role`], [`MessageKind`] — conversation content.
//! - [`ToolCallRequest`] — one tool invocation requested by the model.
//! - [`Artifact`] — output blobs attached to a task.
//! - [`PushNotificationConfig`] — per-task webhook registration.
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`] — envelopes.
//! - [`TaskStatusUpdateEvent`], [`TaskArtifactUpdateEvent`] — SSE payloads.

mod artifact;
mod events;
mod jsonrpc;
mod message;
mod params;
mod push;
mod task;

pub use artifact::Artifact;
pub use events::{TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
pub use jsonrpc::{codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
pub use message::{FileContent, Message, MessageKind, Part, Role, ToolCallRequest};
pub use params::{
    MessageSendParams, TaskIdParams, TaskList, TaskListParams, TaskPushNotificationConfig,
};
pub use push::{PushAuthenticationInfo, PushNotificationConfig};
pub use task::{Task, TaskState, TaskStatus};

/// Returns the current UTC time as an RFC3339 string, the timestamp format
/// used on task status and push notifications.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Returns a fresh UUID v4 string, the ID format for tasks, contexts,
/// messages, and artifacts.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
