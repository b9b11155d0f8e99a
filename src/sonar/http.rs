use crate::config::Configuration;
use crate::error::{RemoteError, ServiceError};
use crate::sonar::{SonarClient, distance_url, parse_distance, toggle_relay_url};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// `SonarClient` over HTTP. The transport is shared; the target comes from
/// the configuration passed to each call.
#[derive(Debug, Clone)]
pub struct HttpSonarClient {
    client: reqwest::Client,
}

impl HttpSonarClient {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl SonarClient for HttpSonarClient {
    async fn fetch_distance(
        &self,
        cfg: &Configuration,
        measurements: u32,
    ) -> Result<f64, ServiceError> {
        let url = distance_url(cfg, measurements);
        debug!(%url, "Requesting sonar distance");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(RemoteError::from)?;
        if response.status() != StatusCode::OK {
            return Err(RemoteError::Status(response.status().as_u16()).into());
        }

        let body = response.text().await.map_err(RemoteError::from)?;
        Ok(parse_distance(&body)?)
    }

    async fn toggle_relay(&self, cfg: &Configuration, status: bool) -> Result<(), ServiceError> {
        let url = toggle_relay_url(cfg, status);
        debug!(%url, "Requesting relay toggle");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(RemoteError::from)?;
        if response.status() != StatusCode::OK {
            return Err(RemoteError::Status(response.status().as_u16()).into());
        }
        Ok(())
    }
}
