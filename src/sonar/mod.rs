use crate::config::Configuration;
use crate::error::{ParseError, ServiceError};
use std::future::Future;

pub mod http;
pub mod mock;

/// Number of pings the remote device averages per distance reading.
pub const MEASUREMENTS: u32 = 5;

/// Remote device exposing the sonars and relays.
pub trait SonarClient: Send + Sync {
    /// Single distance reading in centimeters.
    fn fetch_distance(
        &self,
        cfg: &Configuration,
        measurements: u32,
    ) -> impl Future<Output = Result<f64, ServiceError>> + Send;

    fn toggle_relay(
        &self,
        cfg: &Configuration,
        status: bool,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

pub fn distance_url(cfg: &Configuration, measurements: u32) -> String {
    format!(
        "{}/sonar/{}/distance?measurements={}",
        cfg.service_base_url.trim_end_matches('/'),
        cfg.sonar_index,
        measurements
    )
}

pub fn toggle_relay_url(cfg: &Configuration, status: bool) -> String {
    format!(
        "{}/relay/{}/toggleRelay?status={}",
        cfg.service_base_url.trim_end_matches('/'),
        cfg.relay_index,
        status
    )
}

/// Parses the plain-text decimal body returned by the distance endpoint.
pub fn parse_distance(body: &str) -> Result<f64, ParseError> {
    match body.trim().parse::<f64>() {
        Ok(distance) if distance.is_finite() => Ok(distance),
        _ => Err(ParseError {
            body: body.to_string(),
        }),
    }
}
