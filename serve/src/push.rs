//! Webhook push sender: one outbound POST per task update.

use async_trait::async_trait;
use tracing::debug;

use a2a_types::{now_rfc3339, PushNotificationConfig, Task};
use adk::{AdkError, PushSender};

/// User-Agent header sent on every webhook request.
const USER_AGENT: &str = "A2A-Server/1.0";

/// Sends task updates to registered webhooks over HTTP. Best-effort: a non-2xx
/// response surfaces the status code as an error, nothing is retried.
#[derive(Default)]
pub struct WebhookPushSender {
    client: reqwest::Client,
}

impl WebhookPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_auth(
        config: &PushNotificationConfig,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = &config.token {
            return request.bearer_auth(token);
        }
        if let Some(auth) = &config.authentication {
            if let Some(credentials) = &auth.credentials {
                let header = if auth.schemes.iter().any(|s| s.eq_ignore_ascii_case("basic")) {
                    format!("Basic {credentials}")
                } else {
                    format!("Bearer {credentials}")
                };
                return request.header(reqwest::header::AUTHORIZATION, header);
            }
        }
        request
    }
}

#[async_trait]
impl PushSender for WebhookPushSender {
    async fn send_task_update(
        &self,
        task: &Task,
        config: &PushNotificationConfig,
    ) -> Result<(), AdkError> {
        let body = serde_json::json!({
            "type": "task_update",
            "taskId": task.id,
            "state": task.status.state,
            "timestamp": now_rfc3339(),
            "task": task,
        });
        let request = self
            .client
            .post(&config.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&body);
        let response = Self::apply_auth(config, request)
            .send()
            .await
            .map_err(|e| AdkError::Push(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdkError::Push(format!("webhook returned {status}")));
        }
        debug!(task_id = %task.id, url = %config.url, "push notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::PushAuthenticationInfo;

    /// **Scenario**: delivery to an unreachable webhook surfaces an error.
    #[tokio::test]
    async fn unreachable_webhook_is_an_error() {
        let sender = WebhookPushSender::new();
        let task = Task::new(
            "c",
            a2a_types::TaskState::Completed,
            a2a_types::Message::user("x"),
        );
        let config = PushNotificationConfig::new("http://127.0.0.1:1/hook");
        let err = sender.send_task_update(&task, &config).await.unwrap_err();
        assert!(matches!(err, AdkError::Push(_)));
    }

    /// **Scenario**: auth selection prefers token, then basic scheme.
    #[test]
    fn auth_header_selection() {
        // Exercised through RequestBuilder construction only; the header
        // value itself is asserted in the e2e webhook test.
        let with_token = PushNotificationConfig {
            url: "http://example".into(),
            token: Some("tok".into()),
            authentication: None,
        };
        let with_basic = PushNotificationConfig {
            url: "http://example".into(),
            token: None,
            authentication: Some(PushAuthenticationInfo {
                schemes: vec!["basic".into()],
                credentials: Some("dXNlcjpwdw==".into()),
            }),
        };
        let client = reqwest::Client::new();
        let r1 = WebhookPushSender::apply_auth(&with_token, client.post(&with_token.url))
            .build()
            .unwrap();
        assert!(r1.headers().contains_key(reqwest::header::AUTHORIZATION));
        let r2 = WebhookPushSender::apply_auth(&with_basic, client.post(&with_basic.url))
            .build()
            .unwrap();
        let header = r2.headers()[reqwest::header::AUTHORIZATION].to_str().unwrap();
        assert!(header.starts_with("Basic "));
    }
}
