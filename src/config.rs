use crate::notify::NotificationChannel;
use crate::schedule;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_APP_NAME: &str = "sonar-monitor";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_THRESHOLD_CHECK_SECS: u64 = schedule::THRESHOLD_CHECK_PERIOD.as_secs();
pub const DEFAULT_AUTO_POWER_OFF_SECS: u64 = schedule::AUTO_POWER_OFF_PERIOD.as_secs();

pub const MIN_DISTANCE_THRESHOLD_CM: f64 = 10.0;
pub const MAX_DISTANCE_THRESHOLD_CM: f64 = 200.0;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub sonar: Option<SonarSection>,
    #[serde(default)]
    pub notification: Option<NotificationChannel>,
    #[serde(default)]
    pub schedule: Option<ScheduleSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
    /// Timeout applied to every outgoing HTTP request (default: 10)
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SonarSection {
    /// Base URL of the remote sonar service, e.g. `http://raspsonar.local:8080`
    pub service_url: String,
    pub sonar_index: u32,
    pub relay_index: u32,
    /// Alert when the distance drops below this value (cm)
    pub distance_threshold: f64,
    /// Switch the relay off when the distance rises above this value (cm)
    pub auto_power_off_distance_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleSection {
    pub threshold_check_secs: Option<u64>,
    pub auto_power_off_secs: Option<u64>,
}

/// Snapshot of everything one monitor operation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub service_base_url: String,
    pub sonar_index: u32,
    pub relay_index: u32,
    pub distance_threshold: f64,
    pub auto_power_off_distance_threshold: f64,
    pub notification_channel: Option<NotificationChannel>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing [{0}] section")]
    Missing(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Source of the monitor configuration, consulted on every acquisition and toggle.
pub trait ConfigProvider: Send + Sync {
    fn configuration(&self) -> impl Future<Output = Result<Configuration, ConfigError>> + Send;
}

/// Re-reads the TOML file on every call so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for FileConfigProvider {
    async fn configuration(&self) -> Result<Configuration, ConfigError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        parse(&contents)?.monitor_configuration()
    }
}

/// Serves an in-memory record that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    configuration: RwLock<Option<Configuration>>,
}

impl StaticConfigProvider {
    pub fn new(configuration: Option<Configuration>) -> Self {
        Self {
            configuration: RwLock::new(configuration),
        }
    }

    pub fn set(&self, configuration: Option<Configuration>) {
        *self
            .configuration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = configuration;
    }
}

impl ConfigProvider for StaticConfigProvider {
    async fn configuration(&self) -> Result<Configuration, ConfigError> {
        self.configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ConfigError::Missing("sonar"))
    }
}

/// Path from `CONFIG_PATH`, or the default location.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

pub fn parse(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

/// Minimal configuration used when the file can't be loaded at startup:
/// default server and logging settings, no sonar section.
impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppSection {
                name: DEFAULT_APP_NAME.to_string(),
            },
            logging: LoggingSection {
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
            server: None,
            sonar: None,
            notification: None,
            schedule: None,
        }
    }
}

impl Config {
    /// Builds the validated monitor snapshot from the `[sonar]` and `[notification]` sections.
    pub fn monitor_configuration(&self) -> Result<Configuration, ConfigError> {
        let sonar = self.sonar.as_ref().ok_or(ConfigError::Missing("sonar"))?;
        validate_sonar_section(sonar)?;

        Ok(Configuration {
            service_base_url: sonar.service_url.trim_end_matches('/').to_string(),
            sonar_index: sonar.sonar_index,
            relay_index: sonar.relay_index,
            distance_threshold: sonar.distance_threshold,
            auto_power_off_distance_threshold: sonar.auto_power_off_distance_threshold,
            notification_channel: self.notification.clone(),
        })
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Returns the outgoing request timeout (default: 10 seconds, never zero)
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .server
            .as_ref()
            .and_then(|s| s.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs.max(1))
    }

    pub fn threshold_check_period(&self) -> Duration {
        let secs = self
            .schedule
            .as_ref()
            .and_then(|s| s.threshold_check_secs)
            .unwrap_or(DEFAULT_THRESHOLD_CHECK_SECS);
        Duration::from_secs(secs.max(1))
    }

    pub fn auto_power_off_period(&self) -> Duration {
        let secs = self
            .schedule
            .as_ref()
            .and_then(|s| s.auto_power_off_secs)
            .unwrap_or(DEFAULT_AUTO_POWER_OFF_SECS);
        Duration::from_secs(secs.max(1))
    }
}

fn validate_sonar_section(sonar: &SonarSection) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(&sonar.service_url)
        .map_err(|err| ConfigError::Invalid(format!("service_url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "service_url: unsupported scheme {}",
            url.scheme()
        )));
    }

    let threshold = sonar.distance_threshold;
    if !(MIN_DISTANCE_THRESHOLD_CM..=MAX_DISTANCE_THRESHOLD_CM).contains(&threshold) {
        return Err(ConfigError::Invalid(format!(
            "distance_threshold must be within {MIN_DISTANCE_THRESHOLD_CM}..={MAX_DISTANCE_THRESHOLD_CM} cm, got {threshold}"
        )));
    }

    let power_off = sonar.auto_power_off_distance_threshold;
    if !power_off.is_finite() || power_off <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "auto_power_off_distance_threshold must be positive, got {power_off}"
        )));
    }

    Ok(())
}
