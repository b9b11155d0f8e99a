//! Slack incoming-webhook delivery. One POST per message, no retry.

use crate::notify::{NotificationChannel, NotificationError, NotificationSink};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

impl SlackNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl NotificationSink for SlackNotifier {
    async fn send(
        &self,
        channel: &NotificationChannel,
        message: &str,
    ) -> Result<(), NotificationError> {
        let payload = SlackPayload {
            text: message,
            channel: channel.channel.as_deref(),
            username: channel.username.as_deref(),
        };
        debug!(channel = ?payload.channel, "Sending Slack notification");

        let response = self
            .client
            .post(&channel.webhook_url)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotificationError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}
