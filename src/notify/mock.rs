use crate::notify::{NotificationChannel, NotificationError, NotificationSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Records every message instead of delivering it.
#[derive(Debug, Default)]
pub struct MockNotificationSink {
    sent: Mutex<Vec<(NotificationChannel, String)>>,
    failing: AtomicBool,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::Relaxed);
        sink
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(NotificationChannel, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MockNotificationSink {
    async fn send(
        &self,
        channel: &NotificationChannel,
        message: &str,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel.clone(), message.to_string()));
        if self.failing.load(Ordering::Relaxed) {
            Err(NotificationError::HttpStatus(500))
        } else {
            Ok(())
        }
    }
}
