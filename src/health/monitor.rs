//! Periodic health recomputation.
//!
//! The dashboard recomputes its volume summary on a timer and whenever the
//! watched records or the selected application change. The monitor runs
//! that loop as a tokio task and publishes every result on a watch channel,
//! so rendering never has to call the aggregator itself.

use crate::health::aggregator::HealthAggregator;
use crate::health::classifier::HealthClassifier;
use crate::models::{ApplicationFilter, HealthBucketSummary, IssueCount, ProtectedVolumeRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// One published recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeDashboard {
    pub summary: HealthBucketSummary,
    pub issues: IssueCount,
    pub computed_at: Option<DateTime<Utc>>,
}

impl VolumeDashboard {
    /// Recompute both counters for one input snapshot.
    pub fn compute<C: HealthClassifier>(
        aggregator: &HealthAggregator<C>,
        records: &[ProtectedVolumeRecord],
        filter: Option<&ApplicationFilter>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            summary: aggregator.summarize(records, filter, now),
            issues: aggregator.count_issues(records, filter, now),
            computed_at: Some(now),
        }
    }
}

/// Shared, immutable record list as delivered by a watch source.
pub type VolumeRecords = Arc<Vec<ProtectedVolumeRecord>>;

/// Drives a [`HealthAggregator`] from a timer and two input channels.
pub struct HealthMonitor<C> {
    aggregator: HealthAggregator<C>,
    period: Duration,
}

impl<C> HealthMonitor<C>
where
    C: HealthClassifier + Send + Sync + 'static,
{
    pub fn new(aggregator: HealthAggregator<C>, period: Duration) -> Self {
        Self { aggregator, period }
    }

    /// Spawn the recompute loop.
    ///
    /// The loop ends when every receiver of the output has been dropped or
    /// when either input sender goes away.
    pub fn spawn(
        self,
        mut records: watch::Receiver<VolumeRecords>,
        mut filter: watch::Receiver<Option<ApplicationFilter>>,
    ) -> (watch::Receiver<VolumeDashboard>, JoinHandle<()>) {
        let initial = self.recompute(&records, &filter);
        let (tx, rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the initial value is
            // already published.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = records.changed() => {
                        if changed.is_err() {
                            debug!("Volume source closed, stopping health monitor");
                            break;
                        }
                    }
                    changed = filter.changed() => {
                        if changed.is_err() {
                            debug!("Filter source closed, stopping health monitor");
                            break;
                        }
                    }
                    _ = tx.closed() => {
                        debug!("No dashboard subscribers left, stopping health monitor");
                        break;
                    }
                }

                let dashboard = self.recompute(&records, &filter);
                if tx.send(dashboard).is_err() {
                    break;
                }
            }

            info!("Health monitor stopped");
        });

        (rx, handle)
    }

    fn recompute(
        &self,
        records: &watch::Receiver<VolumeRecords>,
        filter: &watch::Receiver<Option<ApplicationFilter>>,
    ) -> VolumeDashboard {
        let records = records.borrow().clone();
        let filter = filter.borrow().clone();
        VolumeDashboard::compute(&self.aggregator, &records, filter.as_ref(), Utc::now())
    }
}
