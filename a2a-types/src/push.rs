//! Push-notification webhook configuration, registered per task.

use serde::{Deserialize, Serialize};

/// Authentication info for a webhook: supported schemes (e.g. `bearer`,
/// `basic`) and the credential string.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PushAuthenticationInfo {
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Webhook registration: target URL plus optional credentials. `token` is a
/// shorthand for a bearer credential; `authentication` covers the rest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotificationConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<PushAuthenticationInfo>,
}

impl PushNotificationConfig {
    /// Config with just a target URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            authentication: None,
        }
    }
}
