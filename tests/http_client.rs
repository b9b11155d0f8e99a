use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Deserialize;
use sonar_monitor::config::Configuration;
use sonar_monitor::error::{RemoteError, ServiceError};
use sonar_monitor::sonar::SonarClient;
use sonar_monitor::sonar::http::HttpSonarClient;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Deserialize)]
struct DistanceParams {
    measurements: u32,
}

#[derive(Deserialize)]
struct ToggleParams {
    status: bool,
}

async fn distance(
    Path(index): Path<u32>,
    Query(params): Query<DistanceParams>,
) -> (StatusCode, String) {
    match index {
        0 if params.measurements == 5 => (StatusCode::OK, "42.7\n".to_string()),
        1 => (StatusCode::OK, "not-a-number".to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
    }
}

async fn toggle(Path(index): Path<u32>, Query(params): Query<ToggleParams>) -> StatusCode {
    if index == 0 && params.status {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn spawn_device() -> SocketAddr {
    let app = Router::new()
        .route("/sonar/{index}/distance", get(distance))
        .route("/relay/{index}/toggleRelay", post(toggle));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test device");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test device");
    });
    addr
}

fn configuration(addr: SocketAddr, sonar_index: u32, relay_index: u32) -> Configuration {
    Configuration {
        service_base_url: format!("http://{addr}"),
        sonar_index,
        relay_index,
        distance_threshold: 50.0,
        auto_power_off_distance_threshold: 80.0,
        notification_channel: None,
    }
}

fn client() -> HttpSonarClient {
    HttpSonarClient::new(Duration::from_secs(5)).expect("build http client")
}

#[tokio::test]
async fn fetches_and_parses_distance() {
    let addr = spawn_device().await;

    let distance = client()
        .fetch_distance(&configuration(addr, 0, 0), 5)
        .await
        .expect("distance");

    assert_eq!(distance, 42.7);
}

#[tokio::test]
async fn non_ok_status_is_remote_error() {
    let addr = spawn_device().await;

    let result = client().fetch_distance(&configuration(addr, 2, 0), 5).await;

    assert!(matches!(
        result,
        Err(ServiceError::Remote(RemoteError::Status(500)))
    ));
}

#[tokio::test]
async fn unparseable_body_is_parse_error() {
    let addr = spawn_device().await;

    let result = client().fetch_distance(&configuration(addr, 1, 0), 5).await;

    assert!(matches!(result, Err(ServiceError::Parse(_))));
}

#[tokio::test]
async fn toggles_relay_with_status_query() {
    let addr = spawn_device().await;
    let client = client();

    client
        .toggle_relay(&configuration(addr, 0, 0), true)
        .await
        .expect("toggle on");
    let refused = client.toggle_relay(&configuration(addr, 0, 0), false).await;

    assert!(matches!(
        refused,
        Err(ServiceError::Remote(RemoteError::Status(503)))
    ));
}

#[tokio::test]
async fn unreachable_device_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let result = client().fetch_distance(&configuration(addr, 0, 0), 5).await;

    assert!(matches!(
        result,
        Err(ServiceError::Remote(RemoteError::Transport(_)))
    ));
}
