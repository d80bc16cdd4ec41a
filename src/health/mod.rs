//! Volume replication health.
//!
//! Classification, aggregation into donut buckets, and the periodic
//! monitor that republishes the aggregate.

pub mod aggregator;
pub mod classifier;
pub mod monitor;

pub use aggregator::HealthAggregator;
pub use monitor::{HealthMonitor, VolumeDashboard};
