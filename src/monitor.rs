//! Water-level monitor: owns the filter and relay state and runs the two
//! periodic checks against the remote sonar device.
//!
//! Every operation touching the state or the remote device holds the same
//! mutex, so readings, toggles and filter updates are linearized.

use crate::chart;
use crate::config::{ConfigProvider, Configuration};
use crate::error::{ChartError, ServiceError};
use crate::filter::DistanceFilter;
use crate::notify::NotificationSink;
use crate::sonar::{MEASUREMENTS, SonarClient};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Extra readings taken after an outlier before the last one is accepted.
pub const MAX_RESAMPLES: usize = 3;

#[derive(Debug, Default)]
struct MonitorState {
    filter: DistanceFilter,
    relay_on: bool,
}

/// Outcome of one threshold check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdCheck {
    Normal { distance: f64 },
    Alerted { distance: f64 },
}

/// Outcome of one auto power-off check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerOffCheck {
    RelayOff,
    KeptOn { distance: f64 },
    PoweredOff { distance: f64 },
}

pub struct Monitor<C, S, N> {
    config: C,
    sonar: S,
    notifier: N,
    state: Mutex<MonitorState>,
}

impl<C, S, N> Monitor<C, S, N>
where
    C: ConfigProvider,
    S: SonarClient,
    N: NotificationSink,
{
    pub fn new(config: C, sonar: S, notifier: N) -> Self {
        Self {
            config,
            sonar,
            notifier,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Logs whether the provider currently yields a usable configuration.
    /// An unusable one is not fatal: every later call asks the provider again.
    pub async fn check_configuration(&self) -> bool {
        match self.config.configuration().await {
            Ok(cfg) => {
                info!(
                    service_url = %cfg.service_base_url,
                    sonar_index = cfg.sonar_index,
                    relay_index = cfg.relay_index,
                    "Sonar configuration loaded"
                );
                true
            }
            Err(err) => {
                error!(error = %err, "Unable to initialize sonar configuration");
                false
            }
        }
    }

    pub fn config_provider(&self) -> &C {
        &self.config
    }

    pub fn sonar(&self) -> &S {
        &self.sonar
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Current smoothed distance in cm.
    ///
    /// Without `reset`, a seeded filter answers from cache: no configuration
    /// reload and no remote call. Otherwise a fresh reading is taken.
    pub async fn get_distance(&self, reset: bool) -> Result<f64, ServiceError> {
        let mut state = self.state.lock().await;
        if !reset && let Some(cached) = state.filter.published() {
            return Ok(cached);
        }

        let cfg = self.config.configuration().await?;
        let mut sample = self.sonar.fetch_distance(&cfg, MEASUREMENTS).await?;
        let mut resamples = 0;
        while resamples < MAX_RESAMPLES && state.filter.is_outlier(sample) {
            warn!(
                previous = ?state.filter.average(),
                actual = sample,
                "Wrong measurement detected, measuring again"
            );
            sample = self.sonar.fetch_distance(&cfg, MEASUREMENTS).await?;
            resamples += 1;
        }
        if state.filter.is_outlier(sample) {
            warn!(actual = sample, "Outlier persisted after re-sampling, accepting it");
        }

        // After a rejected outlier the average was just trusted as reference,
        // so the replacement blends with it even on reset.
        let reseed = reset && resamples == 0;
        Ok(state.filter.admit(sample, reseed))
    }

    /// Switches the relay; the cached status changes only on success.
    pub async fn toggle_relay(&self, status: bool) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let cfg = self.config.configuration().await?;

        info!(status, "Toggling relay");
        self.sonar.toggle_relay(&cfg, status).await?;
        state.relay_on = status;
        Ok(())
    }

    pub async fn is_relay_on(&self) -> bool {
        self.state.lock().await.relay_on
    }

    /// Copy of the smoothed readings, oldest first.
    pub async fn distance_history_snapshot(&self) -> Vec<f64> {
        self.state.lock().await.filter.history()
    }

    pub async fn distance_chart_url(&self) -> Result<String, ChartError> {
        let history = self.distance_history_snapshot().await;
        chart::distance_chart_url(&history)
    }

    /// Scheduled job: alert when the water gets too close to the sonar.
    pub async fn check_distance_threshold(&self) {
        if let Err(err) = self.run_threshold_check().await {
            error!(error = %err, "Distance threshold check failed");
        }
    }

    pub async fn run_threshold_check(&self) -> Result<ThresholdCheck, ServiceError> {
        info!("Checking distance threshold");
        let distance = self.get_distance(true).await?;
        info!(distance, "Distance measured");

        let cfg = self.config.configuration().await?;
        if distance < cfg.distance_threshold {
            info!(
                distance,
                threshold = cfg.distance_threshold,
                "Alerting user"
            );
            let message =
                format!("Warning! Distance threshold has been trespassed. Value: {distance}");
            self.notify(&cfg, &message).await?;
            return Ok(ThresholdCheck::Alerted { distance });
        }
        Ok(ThresholdCheck::Normal { distance })
    }

    /// Scheduled job: stop the pump once the level has dropped far enough.
    pub async fn auto_power_off_relay(&self) {
        if let Err(err) = self.run_auto_power_off().await {
            error!(error = %err, "Auto power off check failed");
        }
    }

    pub async fn run_auto_power_off(&self) -> Result<PowerOffCheck, ServiceError> {
        if !self.is_relay_on().await {
            return Ok(PowerOffCheck::RelayOff);
        }

        let distance = self.get_distance(false).await?;
        info!(distance, "Checking if relay should be switched off");

        let cfg = self.config.configuration().await?;
        let threshold = cfg.auto_power_off_distance_threshold;
        if distance > threshold {
            info!(distance, threshold, "Threshold trespassed, switching relay off");
            self.toggle_relay(false).await?;
            let message = format!(
                "Auto power off distance threshold ({threshold} cm) trespassed. Powering off the pump"
            );
            self.notify(&cfg, &message).await?;
            return Ok(PowerOffCheck::PoweredOff { distance });
        }
        Ok(PowerOffCheck::KeptOn { distance })
    }

    async fn notify(&self, cfg: &Configuration, message: &str) -> Result<(), ServiceError> {
        match &cfg.notification_channel {
            Some(channel) => self.notifier.send(channel, message).await?,
            None => info!(message, "No notification channel configured, skipping"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfigProvider;
    use crate::error::RemoteError;
    use crate::notify::NotificationChannel;
    use crate::notify::mock::MockNotificationSink;
    use crate::sonar::mock::{MockReading, MockSonarClient};

    fn configuration() -> Configuration {
        Configuration {
            service_base_url: "http://raspsonar.test".to_string(),
            sonar_index: 0,
            relay_index: 0,
            distance_threshold: 50.0,
            auto_power_off_distance_threshold: 80.0,
            notification_channel: Some(NotificationChannel {
                webhook_url: "http://hooks.test/alert".to_string(),
                channel: Some("#pump".to_string()),
                username: None,
            }),
        }
    }

    fn monitor(
        readings: Vec<MockReading>,
    ) -> Monitor<StaticConfigProvider, MockSonarClient, MockNotificationSink> {
        Monitor::new(
            StaticConfigProvider::new(Some(configuration())),
            MockSonarClient::new(readings),
            MockNotificationSink::new(),
        )
    }

    #[tokio::test]
    async fn configuration_check_reports_missing_section() {
        let monitor = Monitor::new(
            StaticConfigProvider::new(None),
            MockSonarClient::new(Vec::new()),
            MockNotificationSink::new(),
        );

        assert!(!monitor.check_configuration().await);

        monitor.config_provider().set(Some(configuration()));
        assert!(monitor.check_configuration().await);
    }

    #[tokio::test]
    async fn failed_resample_leaves_filter_untouched() {
        let monitor = monitor(vec![
            MockReading::Distance(40.0),
            MockReading::Distance(70.0),
            MockReading::Status(500),
        ]);
        monitor.get_distance(false).await.expect("seed");

        let result = monitor.get_distance(true).await;

        assert!(matches!(
            result,
            Err(ServiceError::Remote(RemoteError::Status(500)))
        ));
        assert_eq!(monitor.distance_history_snapshot().await, vec![40.0]);
        assert_eq!(monitor.get_distance(false).await.ok(), Some(40.0));
    }

    #[tokio::test]
    async fn persistent_outlier_is_accepted_after_max_resamples() {
        let monitor = monitor(vec![
            MockReading::Distance(40.0),
            MockReading::Distance(70.0),
            MockReading::Distance(71.0),
            MockReading::Distance(72.0),
            MockReading::Distance(80.0),
        ]);
        monitor.get_distance(false).await.expect("seed");

        let distance = monitor.get_distance(true).await.expect("read");

        assert_eq!(distance, 60.0);
        assert_eq!(monitor.sonar.distance_calls(), 2 + MAX_RESAMPLES);
    }

    #[tokio::test]
    async fn parse_failure_surfaces_as_service_error() {
        let monitor = monitor(vec![MockReading::Body("--".to_string())]);

        let result = monitor.get_distance(false).await;

        assert!(matches!(result, Err(ServiceError::Parse(_))));
        assert!(monitor.distance_history_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn failed_toggle_keeps_relay_state() {
        let monitor = monitor(Vec::new());
        monitor.toggle_relay(true).await.expect("toggle on");
        monitor.sonar.set_failing_toggle(true);

        let result = monitor.toggle_relay(false).await;

        assert!(result.is_err());
        assert!(monitor.is_relay_on().await);
    }

    #[tokio::test]
    async fn threshold_check_stays_quiet_above_threshold() {
        let monitor = monitor(vec![MockReading::Distance(60.0)]);

        let outcome = monitor.run_threshold_check().await.expect("check");

        assert_eq!(outcome, ThresholdCheck::Normal { distance: 60.0 });
        assert!(monitor.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn auto_power_off_skips_remote_when_relay_off() {
        let monitor = monitor(vec![MockReading::Distance(90.0)]);

        let outcome = monitor.run_auto_power_off().await.expect("check");

        assert_eq!(outcome, PowerOffCheck::RelayOff);
        assert_eq!(monitor.sonar.distance_calls(), 0);
    }

    #[tokio::test]
    async fn auto_power_off_keeps_relay_on_below_threshold() {
        let monitor = monitor(vec![MockReading::Distance(70.0)]);
        monitor.toggle_relay(true).await.expect("toggle on");

        let outcome = monitor.run_auto_power_off().await.expect("check");

        assert_eq!(outcome, PowerOffCheck::KeptOn { distance: 70.0 });
        assert!(monitor.is_relay_on().await);
        assert_eq!(monitor.sonar.toggle_requests(), vec![true]);
    }

    #[tokio::test]
    async fn missing_channel_skips_notification() {
        let mut cfg = configuration();
        cfg.notification_channel = None;
        let monitor = Monitor::new(
            StaticConfigProvider::new(Some(cfg)),
            MockSonarClient::with_distances(&[30.0]),
            MockNotificationSink::new(),
        );

        let outcome = monitor.run_threshold_check().await.expect("check");

        assert_eq!(outcome, ThresholdCheck::Alerted { distance: 30.0 });
        assert!(monitor.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn scheduled_job_swallows_notification_failure() {
        let monitor = Monitor::new(
            StaticConfigProvider::new(Some(configuration())),
            MockSonarClient::with_distances(&[30.0]),
            MockNotificationSink::failing(),
        );

        monitor.check_distance_threshold().await;

        assert_eq!(monitor.notifier.messages().len(), 1);
        assert_eq!(monitor.get_distance(false).await.ok(), Some(30.0));
    }
}
