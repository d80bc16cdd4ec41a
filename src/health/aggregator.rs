//! Volume replication health aggregation.
//!
//! Turns the protected PVC list of a cluster into the bucket counts shown
//! on the health donut and the "N with issues" counter.

use crate::health::classifier::{HealthClassifier, ThresholdClassifier};
use crate::models::{
    ApplicationFilter, HealthBucketSummary, IssueCount, ProtectedVolumeRecord, ReplicationType,
    VolumeHealth,
};
use chrono::{DateTime, Utc};
use tracing::trace;

/// Elapsed seconds assumed for an async volume that never reported a sync.
pub const MISSING_SYNC_FLOOR_SECS: u64 = 10;

/// Computes health summaries with an injected classifier.
#[derive(Debug, Clone)]
pub struct HealthAggregator<C = ThresholdClassifier> {
    classifier: C,
    missing_sync_floor_secs: u64,
}

impl Default for HealthAggregator<ThresholdClassifier> {
    fn default() -> Self {
        Self::new(ThresholdClassifier::default())
    }
}

impl HealthAggregator<ThresholdClassifier> {
    /// Build the default aggregator from the `[health]` config section.
    pub fn from_config(config: &crate::config::HealthConfig) -> Self {
        Self::new(ThresholdClassifier::from(config))
            .with_missing_sync_floor(config.missing_sync_floor_seconds)
    }
}

impl<C: HealthClassifier> HealthAggregator<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            missing_sync_floor_secs: MISSING_SYNC_FLOOR_SECS,
        }
    }

    /// Override the elapsed time used when `last_sync_time` is absent.
    pub fn with_missing_sync_floor(mut self, secs: u64) -> Self {
        self.missing_sync_floor_secs = secs;
        self
    }

    /// Classify one volume as of `now`.
    pub fn classify(&self, record: &ProtectedVolumeRecord, now: DateTime<Utc>) -> VolumeHealth {
        // Only async replication has a lag to measure
        match record.replication_type {
            ReplicationType::Sync => VolumeHealth::Healthy,
            ReplicationType::Async => {
                let elapsed = record
                    .last_sync_time
                    .map(|last| elapsed_secs(last, now))
                    .unwrap_or(self.missing_sync_floor_secs);
                self.classifier
                    .classify(elapsed, record.scheduling_interval_minutes)
            }
        }
    }

    /// Count volumes per health bucket.
    pub fn summarize(
        &self,
        records: &[ProtectedVolumeRecord],
        filter: Option<&ApplicationFilter>,
        now: DateTime<Utc>,
    ) -> HealthBucketSummary {
        let mut summary = HealthBucketSummary::default();

        for record in considered(records, filter) {
            let health = self.classify(record, now);
            trace!("Volume {} classified {}", record.pvc_name, health);
            summary.record(health);
        }

        summary
    }

    /// Count protected volumes and those not classified healthy.
    ///
    /// `total` covers every protected volume of the cluster; only
    /// `with_issues` honours the application filter.
    pub fn count_issues(
        &self,
        records: &[ProtectedVolumeRecord],
        filter: Option<&ApplicationFilter>,
        now: DateTime<Utc>,
    ) -> IssueCount {
        let with_issues = considered(records, filter)
            .filter(|record| self.classify(record, now) != VolumeHealth::Healthy)
            .count();

        IssueCount {
            total: records.len(),
            with_issues,
        }
    }
}

/// Records that pass the optional application filter.
pub fn considered<'a>(
    records: &'a [ProtectedVolumeRecord],
    filter: Option<&'a ApplicationFilter>,
) -> impl Iterator<Item = &'a ProtectedVolumeRecord> + 'a {
    records.iter().filter(move |record| match filter {
        Some(filter) => filter.matches(record.application.as_ref()),
        None => true,
    })
}

/// Whole seconds between `last` and `now`; a sync stamped in the future
/// counts as zero.
pub fn elapsed_secs(last: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - last).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationRef;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn volume(
        replication_type: ReplicationType,
        lag_secs: Option<i64>,
        app: Option<(&str, &str)>,
    ) -> ProtectedVolumeRecord {
        ProtectedVolumeRecord {
            pvc_name: "pvc".to_string(),
            replication_type,
            last_sync_time: lag_secs.map(|secs| now() - Duration::seconds(secs)),
            scheduling_interval_minutes: 5,
            application: app.map(|(ns, name)| ApplicationRef::new(ns, name)),
        }
    }

    fn default_aggregator() -> HealthAggregator {
        HealthAggregator::new(ThresholdClassifier::default())
    }

    fn mixed_records() -> Vec<ProtectedVolumeRecord> {
        vec![
            volume(ReplicationType::Async, Some(60), Some(("a", "x"))),
            volume(ReplicationType::Async, Some(700), Some(("a", "x"))),
            volume(ReplicationType::Async, Some(3600), Some(("a", "y"))),
            volume(ReplicationType::Sync, Some(99_999), Some(("b", "z"))),
            volume(ReplicationType::Async, None, None),
        ]
    }

    #[test]
    fn test_summarize_without_filter() {
        let aggregator = default_aggregator();
        let records = mixed_records();

        let summary = aggregator.summarize(&records, None, now());

        assert_eq!(summary.healthy, 3);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.total(), records.len());
    }

    #[test]
    fn test_summarize_with_filter() {
        let aggregator = default_aggregator();
        let records = mixed_records();
        let filter = ApplicationFilter::new("a", "x");

        let summary = aggregator.summarize(&records, Some(&filter), now());

        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.critical, 0);
    }

    #[test]
    fn test_filter_matching_nothing_is_all_zero() {
        let aggregator = default_aggregator();
        let filter = ApplicationFilter::new("nope", "nothing");

        let summary = aggregator.summarize(&mixed_records(), Some(&filter), now());

        assert_eq!(summary, HealthBucketSummary::default());
    }

    #[test]
    fn test_sync_is_always_healthy() {
        let aggregator = HealthAggregator::new(|_: u64, _: u64| VolumeHealth::Critical);

        for lag in [None, Some(0), Some(1_000_000)] {
            let record = volume(ReplicationType::Sync, lag, Some(("a", "x")));
            assert_eq!(aggregator.classify(&record, now()), VolumeHealth::Healthy);
        }
    }

    #[test]
    fn test_missing_sync_uses_floor() {
        let seen = std::cell::Cell::new(0);
        let aggregator = HealthAggregator::new(|elapsed: u64, _: u64| {
            seen.set(elapsed);
            VolumeHealth::Healthy
        })
        .with_missing_sync_floor(42);

        aggregator.classify(&volume(ReplicationType::Async, None, None), now());
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn test_future_sync_counts_as_zero_elapsed() {
        assert_eq!(elapsed_secs(now() + Duration::seconds(30), now()), 0);
        assert_eq!(elapsed_secs(now() - Duration::seconds(30), now()), 30);
    }

    #[test]
    fn test_count_issues() {
        let aggregator = default_aggregator();
        let records = mixed_records();

        let all = aggregator.count_issues(&records, None, now());
        assert_eq!(all.total, 5);
        assert_eq!(all.with_issues, 2);

        let filter = ApplicationFilter::new("a", "y");
        let one = aggregator.count_issues(&records, Some(&filter), now());
        assert_eq!(one, IssueCount { total: 5, with_issues: 1 });
    }

    #[test]
    fn test_issue_total_ignores_filter() {
        let aggregator = default_aggregator();
        let records = vec![
            volume(ReplicationType::Async, Some(3600), Some(("a", "x"))),
            volume(ReplicationType::Async, Some(3600), Some(("a", "y"))),
            volume(ReplicationType::Sync, None, Some(("b", "z"))),
        ];
        let filter = ApplicationFilter::new("a", "x");

        let issues = aggregator.count_issues(&records, Some(&filter), now());

        assert_eq!(issues.total, 3);
        assert_eq!(issues.with_issues, 1);
    }

    #[test]
    fn test_invariants_hold_for_every_filter() {
        let aggregator = default_aggregator();
        let records = mixed_records();
        let filters = [
            None,
            Some(ApplicationFilter::new("a", "x")),
            Some(ApplicationFilter::new("a", "y")),
            Some(ApplicationFilter::new("b", "z")),
            Some(ApplicationFilter::new("c", "none")),
        ];

        for filter in &filters {
            let summary = aggregator.summarize(&records, filter.as_ref(), now());
            let expected = considered(&records, filter.as_ref()).count();
            assert_eq!(summary.total(), expected);

            let issues = aggregator.count_issues(&records, filter.as_ref(), now());
            assert!(issues.with_issues <= issues.total);
            assert_eq!(issues.total, records.len());
            assert_eq!(issues.with_issues, summary.critical + summary.warning);
        }
    }
}
