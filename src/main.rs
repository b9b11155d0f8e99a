use sonar_monitor::api;
use sonar_monitor::config::{self, Config, ConfigError, FileConfigProvider};
use sonar_monitor::monitor::Monitor;
use sonar_monitor::notify::slack::SlackNotifier;
use sonar_monitor::schedule::{self, Schedule, SystemClock};
use sonar_monitor::sonar::http::HttpSonarClient;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Loads the config file, falling back to defaults when it is unusable so the
/// server still starts. The error is returned for logging once tracing is up.
fn load_startup_config(path: &Path) -> (Config, Option<ConfigError>) {
    match config::load_from_path(path) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path();
    let (config, load_error) = load_startup_config(&config_path);
    init_tracing(&config.logging.level);
    tracing::info!(
        app = %config.app.name,
        config_path = %config_path.display(),
        "sonar-monitor starting"
    );
    if let Some(err) = load_error {
        tracing::error!(
            error = %err,
            config_path = %config_path.display(),
            "Unable to load configuration, starting with defaults"
        );
    }

    let timeout = config.request_timeout();
    let sonar = HttpSonarClient::new(timeout)?;
    let notifier = SlackNotifier::new(timeout)?;
    let monitor = Arc::new(Monitor::new(
        FileConfigProvider::new(&config_path),
        sonar,
        notifier,
    ));
    monitor.check_configuration().await;

    let (stop_tx, stop_rx) = watch::channel(false);
    let jobs = schedule::spawn_monitor_jobs(
        Arc::clone(&monitor),
        Schedule::every(config.threshold_check_period()),
        Schedule::every(config.auto_power_off_period()),
        Arc::new(SystemClock),
        stop_rx,
    );

    let app = api::router(Arc::clone(&monitor));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopping scheduled jobs");
    let _ = stop_tx.send(true);
    for job in jobs {
        if let Err(err) = job.await {
            tracing::warn!(error = %err, "Scheduled job ended abnormally");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
