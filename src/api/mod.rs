use crate::config::ConfigProvider;
use crate::monitor::Monitor;
use crate::notify::NotificationSink;
use crate::sonar::SonarClient;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router<C, S, N>(monitor: Arc<Monitor<C, S, N>>) -> Router
where
    C: ConfigProvider + 'static,
    S: SonarClient + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/distance", get(handlers::get_distance::<C, S, N>))
        .route("/api/distance/history", get(handlers::get_history::<C, S, N>))
        .route("/api/distance/chart", get(handlers::get_chart::<C, S, N>))
        .route(
            "/api/relay",
            get(handlers::get_relay::<C, S, N>).post(handlers::post_relay::<C, S, N>),
        )
        .with_state(monitor)
}
