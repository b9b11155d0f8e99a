use crate::api::responses::{
    ChartResponse, DistanceSuccessResponse, ErrorCode, ErrorResponse, HistoryResponse,
    RelayResponse,
};
use crate::config::ConfigProvider;
use crate::error::ServiceError;
use crate::filter::HISTORY_CAPACITY;
use crate::monitor::Monitor;
use crate::notify::NotificationSink;
use crate::sonar::SonarClient;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DistanceQuery {
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    pub status: bool,
}

pub enum ApiResponse<T> {
    Success(T),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_distance<C, S, N>(
    State(monitor): State<Arc<Monitor<C, S, N>>>,
    Query(query): Query<DistanceQuery>,
) -> impl IntoResponse
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    build_distance_response(&monitor, query.reset).await
}

pub async fn get_history<C, S, N>(
    State(monitor): State<Arc<Monitor<C, S, N>>>,
) -> impl IntoResponse
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    build_history_response(&monitor, SystemTime::now()).await
}

pub async fn get_chart<C, S, N>(State(monitor): State<Arc<Monitor<C, S, N>>>) -> impl IntoResponse
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    match monitor.distance_chart_url().await {
        Ok(url) => ApiResponse::Success(ChartResponse { url }),
        Err(err) => {
            error!(error = %err, "Chart url unavailable");
            internal_error("chart url failure")
        }
    }
}

pub async fn get_relay<C, S, N>(State(monitor): State<Arc<Monitor<C, S, N>>>) -> impl IntoResponse
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    build_relay_response(&monitor, SystemTime::now()).await
}

pub async fn post_relay<C, S, N>(
    State(monitor): State<Arc<Monitor<C, S, N>>>,
    Query(query): Query<RelayQuery>,
) -> impl IntoResponse
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    build_toggle_response(&monitor, query.status).await
}

async fn build_distance_response<C, S, N>(
    monitor: &Monitor<C, S, N>,
    reset: bool,
) -> ApiResponse<DistanceSuccessResponse>
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    let result = monitor.get_distance(reset).await;
    let now = SystemTime::now();
    match result {
        Ok(distance_cm) => match format_timestamp(now) {
            Ok(timestamp) => ApiResponse::Success(DistanceSuccessResponse {
                distance_cm,
                timestamp,
            }),
            Err(_err) => internal_error("timestamp formatting failure"),
        },
        Err(err) => service_error(&err, now),
    }
}

async fn build_history_response<C, S, N>(
    monitor: &Monitor<C, S, N>,
    now: SystemTime,
) -> ApiResponse<HistoryResponse>
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    let values = monitor.distance_history_snapshot().await;
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(HistoryResponse {
            values,
            capacity: HISTORY_CAPACITY,
            timestamp,
        }),
        Err(_err) => internal_error("timestamp formatting failure"),
    }
}

async fn build_relay_response<C, S, N>(
    monitor: &Monitor<C, S, N>,
    now: SystemTime,
) -> ApiResponse<RelayResponse>
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    let on = monitor.is_relay_on().await;
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(RelayResponse { on, timestamp }),
        Err(_err) => internal_error("timestamp formatting failure"),
    }
}

async fn build_toggle_response<C, S, N>(
    monitor: &Monitor<C, S, N>,
    status: bool,
) -> ApiResponse<RelayResponse>
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    match monitor.toggle_relay(status).await {
        Ok(()) => build_relay_response(monitor, SystemTime::now()).await,
        Err(err) => service_error(&err, SystemTime::now()),
    }
}

fn service_error<T>(err: &ServiceError, now: SystemTime) -> ApiResponse<T> {
    let (status, error_code) = match err {
        ServiceError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ConfigUnavailable),
        ServiceError::Remote(_) => (StatusCode::BAD_GATEWAY, ErrorCode::SonarUnavailable),
        ServiceError::Parse(_) => (StatusCode::BAD_GATEWAY, ErrorCode::InvalidReading),
        ServiceError::Notification(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
        }
    };
    warn!(error = %err, "Sonar request failed");

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status,
            body: ErrorResponse {
                error_code,
                error_message: err.to_string(),
                timestamp,
            },
        },
        Err(_err) => internal_error("timestamp formatting failure"),
    }
}

fn internal_error<T>(message: &str) -> ApiResponse<T> {
    error!(message = message, "Internal error while handling API request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: "Internal server error".to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}
