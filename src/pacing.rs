//! Scheduling-cadence tracking.
//!
//! The pacing monitor marks beats on a monotonic clock and converts
//! latency outliers into a scalar pacing adjustment for the
//! coordinator.

use std::time::Instant;

/// Tracks elapsed time between scheduling beats.
///
/// The expected cycle length doubles as the latency threshold: any
/// agent latency above it counts as an outlier. Uses `Instant` rather
/// than wall-clock time, so system clock adjustments never produce
/// negative or inflated intervals.
#[derive(Debug, Clone)]
pub struct PacingMonitor {
    /// Expected seconds per cycle; also the outlier threshold.
    expected_cycle_seconds: f64,
    last_beat: Instant,
}

impl PacingMonitor {
    /// Create a monitor with the given expected cycle length in seconds.
    pub fn new(expected_cycle_seconds: f64) -> Self {
        Self {
            expected_cycle_seconds,
            last_beat: Instant::now(),
        }
    }

    /// The latency threshold in seconds.
    pub fn threshold(&self) -> f64 {
        self.expected_cycle_seconds
    }

    /// Mark a beat; returns seconds elapsed since the previous beat.
    pub fn beat(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_beat).as_secs_f64();
        self.last_beat = now;
        elapsed
    }

    /// Convert latency outliers into a pacing adjustment in [-0.5, 0].
    ///
    /// Consistently slow agents mean expectations need to shift: the
    /// adjustment steps down at 1x, 1.5x, and 2x the threshold.
    pub fn calibrate(&self, latency_outliers: &[f64]) -> f64 {
        if latency_outliers.is_empty() {
            return 0.0;
        }

        let avg = latency_outliers.iter().sum::<f64>() / latency_outliers.len() as f64;

        if avg > self.expected_cycle_seconds * 2.0 {
            -0.5
        } else if avg > self.expected_cycle_seconds * 1.5 {
            -0.3
        } else if avg > self.expected_cycle_seconds {
            -0.1
        } else {
            0.0
        }
    }

    /// True if `timestamp` falls within 10% of the expected inter-beat
    /// interval after the last beat.
    #[allow(dead_code)] // Utility for cadence-aware schedulers
    pub fn is_on_beat(&self, timestamp: Instant) -> bool {
        let expected_interval = 60.0 / self.expected_cycle_seconds;
        let elapsed = timestamp.saturating_duration_since(self.last_beat).as_secs_f64();

        let variance = expected_interval * 0.1;
        (elapsed - expected_interval).abs() <= variance
    }
}

impl Default for PacingMonitor {
    fn default() -> Self {
        Self::new(30.0)
    }
}
