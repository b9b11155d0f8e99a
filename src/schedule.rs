//! Wall-clock aligned periodic jobs.
//!
//! A [`Schedule`] ticks at every multiple of its period since the Unix epoch
//! (UTC): 2 hours fires at even hours on the hour, 30 seconds at :00 and :30.
//! Ticks that pass while a job is still running are skipped, and a tick
//! never fires twice even when the wall clock lags the timer.

use crate::config::ConfigProvider;
use crate::monitor::Monitor;
use crate::notify::NotificationSink;
use crate::sonar::SonarClient;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const THRESHOLD_CHECK_PERIOD: Duration = Duration::from_secs(2 * 60 * 60);
pub const AUTO_POWER_OFF_PERIOD: Duration = Duration::from_secs(30);

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    period: Duration,
}

impl Schedule {
    /// Zero periods are clamped to one millisecond.
    pub fn every(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// First aligned tick strictly after `time`.
    pub fn next_tick_after(&self, time: SystemTime) -> SystemTime {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let period_ms = self.period.as_millis();
        let ticks = since_epoch.as_millis() / period_ms + 1;
        let next_ms = u64::try_from(ticks * period_ms).unwrap_or(u64::MAX);
        UNIX_EPOCH + Duration::from_millis(next_ms)
    }

    /// Time left until the next aligned tick strictly after `now`.
    pub fn delay_until_next(&self, now: SystemTime) -> Duration {
        self.next_tick_after(now)
            .duration_since(now)
            .unwrap_or_default()
    }
}

/// Runs `job` on every tick of `schedule` until `stop` flips to true or its
/// sender is dropped. A job still running at that point is dropped with it.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    mut stop: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            job = name,
            period_secs = schedule.period().as_secs(),
            "Scheduled job started"
        );
        let mut last_fired: Option<SystemTime> = None;
        while !*stop.borrow() {
            let now = clock.now();
            let floor = last_fired.map_or(now, |last| now.max(last));
            let tick = schedule.next_tick_after(floor);
            let delay = tick.duration_since(now).unwrap_or_default();
            debug!(job = name, delay_ms = delay.as_millis(), "Waiting for next tick");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                    continue;
                }
            }
            last_fired = Some(tick);

            tokio::select! {
                _ = job() => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!(job = name, "Scheduled job stopped");
    })
}

/// Spawns the threshold check and the auto power-off jobs for `monitor`.
pub fn spawn_monitor_jobs<C, S, N>(
    monitor: Arc<Monitor<C, S, N>>,
    threshold_check: Schedule,
    auto_power_off: Schedule,
    clock: Arc<dyn Clock>,
    stop: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    C: ConfigProvider + 'static,
    S: SonarClient + 'static,
    N: NotificationSink + 'static,
{
    let threshold_monitor = Arc::clone(&monitor);
    let threshold_job = spawn_periodic(
        "distance_threshold_check",
        threshold_check,
        Arc::clone(&clock),
        stop.clone(),
        move || {
            let monitor = Arc::clone(&threshold_monitor);
            async move { monitor.check_distance_threshold().await }
        },
    );

    let power_off_job = spawn_periodic(
        "auto_power_off",
        auto_power_off,
        clock,
        stop,
        move || {
            let monitor = Arc::clone(&monitor);
            async move { monitor.auto_power_off_relay().await }
        },
    );

    vec![threshold_job, power_off_job]
}
