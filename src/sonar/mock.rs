use crate::config::Configuration;
use crate::error::{RemoteError, ServiceError};
use crate::sonar::{SonarClient, parse_distance};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// One scripted answer of the distance endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReading {
    /// 200 with a well-formed body
    Distance(f64),
    /// 200 with the given raw body
    Body(String),
    /// Non-200 status
    Status(u16),
}

/// Replays scripted readings in order. Once the script is exhausted every
/// read answers 503.
#[derive(Debug, Default)]
pub struct MockSonarClient {
    readings: Mutex<VecDeque<MockReading>>,
    distance_calls: AtomicUsize,
    toggles: Mutex<Vec<bool>>,
    failing_toggle: AtomicBool,
}

impl MockSonarClient {
    pub fn new(readings: Vec<MockReading>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            ..Self::default()
        }
    }

    pub fn with_distances(distances: &[f64]) -> Self {
        Self::new(distances.iter().copied().map(MockReading::Distance).collect())
    }

    pub fn set_failing_toggle(&self, failing: bool) {
        self.failing_toggle.store(failing, Ordering::Relaxed);
    }

    pub fn distance_calls(&self) -> usize {
        self.distance_calls.load(Ordering::Relaxed)
    }

    /// Statuses of every toggle request received, successful or not.
    pub fn toggle_requests(&self) -> Vec<bool> {
        self.toggles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SonarClient for MockSonarClient {
    async fn fetch_distance(
        &self,
        _cfg: &Configuration,
        _measurements: u32,
    ) -> Result<f64, ServiceError> {
        self.distance_calls.fetch_add(1, Ordering::Relaxed);
        let next = self
            .readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(MockReading::Distance(distance)) => Ok(distance),
            Some(MockReading::Body(body)) => Ok(parse_distance(&body)?),
            Some(MockReading::Status(code)) => Err(RemoteError::Status(code).into()),
            None => Err(RemoteError::Status(503).into()),
        }
    }

    async fn toggle_relay(&self, _cfg: &Configuration, status: bool) -> Result<(), ServiceError> {
        self.toggles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(status);
        if self.failing_toggle.load(Ordering::Relaxed) {
            Err(RemoteError::Status(500).into())
        } else {
            Ok(())
        }
    }
}
