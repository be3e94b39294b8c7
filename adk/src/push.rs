//! Push-notification sender contract.
//!
//! The worker pool fires a task update through this trait after persisting a
//! background result; the HTTP implementation lives in the server crate.
//! Delivery is best-effort: failures are surfaced to the caller for logging,
//! never retried here.

use async_trait::async_trait;

use a2a_types::{PushNotificationConfig, Task};

use crate::error::AdkError;

/// Sends one task update to a registered webhook.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_task_update(
        &self,
        task: &Task,
        config: &PushNotificationConfig,
    ) -> Result<(), AdkError>;
}

/// Sender that records nothing and always succeeds. Default when push
/// notifications are disabled.
#[derive(Default)]
pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send_task_update(
        &self,
        _task: &Task,
        _config: &PushNotificationConfig,
    ) -> Result<(), AdkError> {
        Ok(())
    }
}
