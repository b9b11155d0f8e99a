//! Smoothing of raw sonar readings.
//!
//! Every accepted sample is blended with the running average
//! (`(sample + average) / 2`) and the result is appended to a bounded history
//! used for the dashboard chart. Samples jumping more than
//! [`OUTLIER_DELTA_CM`] above a seeded average are flagged so the caller can
//! take a fresh reading instead.

use std::collections::VecDeque;

/// Number of smoothed values kept for the chart.
pub const HISTORY_CAPACITY: usize = 100;
/// Upward jump (cm) beyond which a sample is treated as spurious.
pub const OUTLIER_DELTA_CM: f64 = 15.0;

#[derive(Debug, Clone, Default)]
pub struct DistanceFilter {
    average: Option<f64>,
    history: VecDeque<f64>,
}

impl DistanceFilter {
    pub fn new() -> Self {
        Self {
            average: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.average.is_some()
    }

    /// Full-precision running average.
    pub fn average(&self) -> Option<f64> {
        self.average
    }

    /// Value reported to callers, without side effects.
    pub fn published(&self) -> Option<f64> {
        self.average.map(round_up_one_decimal)
    }

    /// Only jumps upward count; the remote occasionally over-reads when its CPU is busy.
    pub fn is_outlier(&self, sample: f64) -> bool {
        self.average
            .is_some_and(|average| sample - average > OUTLIER_DELTA_CM)
    }

    /// Blends `sample` into the average and records it. `reset` discards the
    /// previous average first. Returns the published value.
    pub fn admit(&mut self, sample: f64, reset: bool) -> f64 {
        let seed = match self.average {
            Some(average) if !reset => average,
            _ => sample,
        };
        let average = (sample + seed) / 2.0;
        self.average = Some(average);

        // Trim before append so the ring never holds more than HISTORY_CAPACITY.
        while self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(average);

        round_up_one_decimal(average)
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }
}

/// Rounds toward positive infinity at one decimal place.
pub fn round_up_one_decimal(value: f64) -> f64 {
    (value * 10.0).ceil() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let mut filter = DistanceFilter::new();

        let published = filter.admit(40.0, false);

        assert_eq!(published, 40.0);
        assert_eq!(filter.average(), Some(40.0));
        assert_eq!(filter.history(), vec![40.0]);
    }

    #[test]
    fn later_samples_blend_with_average() {
        let mut filter = DistanceFilter::new();
        filter.admit(40.0, false);

        let published = filter.admit(41.0, false);

        assert_eq!(published, 40.5);
        assert_eq!(filter.history(), vec![40.0, 40.5]);
    }

    #[test]
    fn reset_reseeds_from_sample() {
        let mut filter = DistanceFilter::new();
        filter.admit(40.0, false);

        let published = filter.admit(30.0, true);

        assert_eq!(published, 30.0);
        assert_eq!(filter.history(), vec![40.0, 30.0]);
    }

    #[test]
    fn published_value_rounds_up() {
        let mut filter = DistanceFilter::new();
        filter.admit(40.0, false);

        let published = filter.admit(40.25, false);

        assert_eq!(filter.average(), Some(40.125));
        assert_eq!(published, 40.2);
        assert_eq!(filter.published(), Some(40.2));
    }

    #[test]
    fn outliers_only_count_upward_when_seeded() {
        let mut filter = DistanceFilter::new();
        assert!(!filter.is_outlier(500.0));

        filter.admit(40.0, false);

        assert!(filter.is_outlier(55.5));
        assert!(!filter.is_outlier(55.0));
        assert!(!filter.is_outlier(0.0));
    }

    #[test]
    fn history_keeps_last_capacity_values_in_order() {
        let mut filter = DistanceFilter::new();
        let mut expected = Vec::new();

        for i in 0..150 {
            filter.admit(f64::from(i), true);
            expected.push(f64::from(i));
        }

        let history = filter.history();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history, expected[50..].to_vec());
    }

    #[test]
    fn unseeded_filter_publishes_nothing() {
        let filter = DistanceFilter::new();

        assert_eq!(filter.published(), None);
        assert!(filter.history().is_empty());
    }

    #[test]
    fn zero_reading_still_seeds() {
        let mut filter = DistanceFilter::new();

        filter.admit(0.0, false);

        assert!(filter.is_seeded());
        assert_eq!(filter.published(), Some(0.0));
    }
}
