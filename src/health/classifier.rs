//! Replication lag classification.
//!
//! The aggregator never hard-codes thresholds: it asks a
//! [`HealthClassifier`] to turn (elapsed seconds, interval minutes) into a
//! [`VolumeHealth`].

use crate::models::VolumeHealth;

/// Lag ratio at or above which a volume is critical.
pub const CRITICAL_RATIO: f64 = 3.0;

/// Lag ratio above which a volume is in warning.
pub const WARNING_RATIO: f64 = 2.0;

/// Classifies async replication lag.
pub trait HealthClassifier {
    fn classify(&self, elapsed_secs: u64, interval_minutes: u64) -> VolumeHealth;
}

impl<F> HealthClassifier for F
where
    F: Fn(u64, u64) -> VolumeHealth,
{
    fn classify(&self, elapsed_secs: u64, interval_minutes: u64) -> VolumeHealth {
        self(elapsed_secs, interval_minutes)
    }
}

/// Compares elapsed time against multiples of the scheduling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    pub warning_ratio: f64,
    pub critical_ratio: f64,
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self {
            warning_ratio: WARNING_RATIO,
            critical_ratio: CRITICAL_RATIO,
        }
    }
}

impl From<&crate::config::HealthConfig> for ThresholdClassifier {
    fn from(config: &crate::config::HealthConfig) -> Self {
        Self {
            warning_ratio: config.warning_ratio,
            critical_ratio: config.critical_ratio,
        }
    }
}

/// How many scheduling intervals fit into the elapsed time.
///
/// An unknown (zero) interval is infinitely late once any time has passed.
pub fn lag_ratio(elapsed_secs: u64, interval_minutes: u64) -> f64 {
    let interval_secs = interval_minutes.saturating_mul(60);
    if interval_secs == 0 {
        return if elapsed_secs == 0 { 0.0 } else { f64::INFINITY };
    }
    elapsed_secs as f64 / interval_secs as f64
}

impl HealthClassifier for ThresholdClassifier {
    fn classify(&self, elapsed_secs: u64, interval_minutes: u64) -> VolumeHealth {
        let ratio = lag_ratio(elapsed_secs, interval_minutes);
        if ratio >= self.critical_ratio {
            VolumeHealth::Critical
        } else if ratio > self.warning_ratio {
            VolumeHealth::Warning
        } else {
            VolumeHealth::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let classifier = ThresholdClassifier::default();

        // 5 minute interval = 300s
        assert_eq!(classifier.classify(300, 5), VolumeHealth::Healthy);
        assert_eq!(classifier.classify(600, 5), VolumeHealth::Healthy);
        assert_eq!(classifier.classify(601, 5), VolumeHealth::Warning);
        assert_eq!(classifier.classify(899, 5), VolumeHealth::Warning);
        assert_eq!(classifier.classify(900, 5), VolumeHealth::Critical);
    }

    #[test]
    fn test_zero_interval() {
        let classifier = ThresholdClassifier::default();
        assert_eq!(classifier.classify(0, 0), VolumeHealth::Healthy);
        assert_eq!(classifier.classify(1, 0), VolumeHealth::Critical);
    }

    #[test]
    fn test_custom_ratios() {
        let classifier = ThresholdClassifier {
            warning_ratio: 1.0,
            critical_ratio: 1.5,
        };
        assert_eq!(classifier.classify(61, 1), VolumeHealth::Warning);
        assert_eq!(classifier.classify(90, 1), VolumeHealth::Critical);
    }

    #[test]
    fn test_closure_classifier() {
        let always_warning = |_: u64, _: u64| VolumeHealth::Warning;
        assert_eq!(always_warning.classify(0, 5), VolumeHealth::Warning);
    }
}
