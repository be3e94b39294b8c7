//! Typed parameter and result shapes for the A2A JSON-RPC methods.
//!
//! The protocol handler round-trips the loose `params` value through these
//! structs; structural mismatches surface as `InvalidParams`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Message, PushNotificationConfig, Task, TaskState};

/// Params for `message/send` and `message/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Params addressing one task by ID (`tasks/get`, `tasks/cancel`,
/// push-config get/list/delete).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

/// Params for `tasks/list`: optional context and state filters plus
/// offset/limit pagination.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskListParams {
    #[serde(rename = "contextId", default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Result of `tasks/list`: one page of tasks plus the total match count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub total: usize,
}

/// Params/result for `tasks/pushNotificationConfig/set` and `get`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskPushNotificationConfig {
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "pushNotificationConfig")]
    pub push_notification_config: PushNotificationConfig,
}
