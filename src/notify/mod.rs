use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

pub mod mock;
pub mod slack;

/// Where chat notifications go. Read from the `[notification]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationChannel {
    /// Incoming-webhook URL of the chat service
    pub webhook_url: String,
    /// Overrides the webhook's default channel when set
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned HTTP {0}")]
    HttpStatus(u16),
}

pub trait NotificationSink: Send + Sync {
    fn send(
        &self,
        channel: &NotificationChannel,
        message: &str,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
