//! Data models for the disaster-recovery dashboard.
//!
//! This module contains the records supplied by the resource watchers
//! (volumes, policies, placement controls) and the summaries computed
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Replication mode of a protected volume.
///
/// Anything other than async (including a missing value) decodes as sync,
/// which has no lag to measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationType {
    /// Metro DR, synchronous mirroring
    #[default]
    Sync,
    /// Regional DR, scheduled asynchronous replication
    Async,
}

impl<'de> Deserialize<'de> for ReplicationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some(text) if text.trim().eq_ignore_ascii_case("async") => ReplicationType::Async,
            _ => ReplicationType::Sync,
        })
    }
}

impl fmt::Display for ReplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationType::Sync => write!(f, "sync"),
            ReplicationType::Async => write!(f, "async"),
        }
    }
}

/// Replication health of a single volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeHealth {
    /// Last sync is within the expected window
    Healthy,
    /// Last sync is lagging behind the schedule
    Warning,
    /// Last sync is far behind the schedule
    Critical,
}

impl fmt::Display for VolumeHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeHealth::Healthy => write!(f, "Healthy"),
            VolumeHealth::Warning => write!(f, "Warning"),
            VolumeHealth::Critical => write!(f, "Critical"),
        }
    }
}

impl VolumeHealth {
    /// Returns an emoji representation of the health bucket.
    pub fn emoji(&self) -> &'static str {
        match self {
            VolumeHealth::Healthy => "🔵",
            VolumeHealth::Warning => "🟡",
            VolumeHealth::Critical => "🔴",
        }
    }
}

/// Namespace and name of an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationRef {
    pub namespace: String,
    pub name: String,
}

impl ApplicationRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.namespace)
    }
}

/// Restricts a computation to the records of one application.
///
/// Always carried as `Option<ApplicationFilter>`: `None` means every record
/// is considered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationFilter {
    pub namespace: String,
    pub name: String,
}

impl ApplicationFilter {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Whether a record owned by `owner` passes this filter.
    ///
    /// Records without an owning application never match.
    pub fn matches(&self, owner: Option<&ApplicationRef>) -> bool {
        owner.is_some_and(|app| app.namespace == self.namespace && app.name == self.name)
    }
}

impl From<ApplicationRef> for ApplicationFilter {
    fn from(app: ApplicationRef) -> Self {
        Self {
            namespace: app.namespace,
            name: app.name,
        }
    }
}

/// Replication state of one protected PVC, as reported by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedVolumeRecord {
    /// PVC name, informational only.
    #[serde(default)]
    pub pvc_name: String,
    #[serde(default)]
    pub replication_type: ReplicationType,
    /// Time of the last successful sync, if one was observed.
    #[serde(
        default,
        alias = "lastSyncTimestamp",
        deserialize_with = "deserialize_sync_time"
    )]
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Expected sync interval in minutes; `0` when unknown.
    #[serde(
        default,
        rename = "schedulingInterval",
        alias = "schedulingIntervalMinutes",
        deserialize_with = "deserialize_interval_minutes"
    )]
    pub scheduling_interval_minutes: u64,
    /// Owning application; missing on partially decoded records.
    #[serde(default, alias = "owningApplication")]
    pub application: Option<ApplicationRef>,
}

/// Parse a scheduling interval such as `5m`, `1h`, `1d` or a bare number of
/// minutes.
pub fn parse_interval_minutes(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };

    let value: u64 = digits.trim().parse().ok()?;
    match unit.map(|c| c.to_ascii_lowercase()) {
        None | Some('m') => Some(value),
        Some('h') => value.checked_mul(60),
        Some('d') => value.checked_mul(24 * 60),
        Some(_) => None,
    }
}

fn deserialize_interval_minutes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Interval {
        Minutes(u64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Interval::deserialize(deserializer)? {
        Interval::Minutes(minutes) => minutes,
        Interval::Text(text) => parse_interval_minutes(&text).unwrap_or(0),
        Interval::Other(_) => 0,
    })
}

/// RFC 3339 timestamp; empty or unparseable values count as never synced.
fn deserialize_sync_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
        .map(|time| time.with_timezone(&Utc)))
}

/// Counts of volumes per health bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBucketSummary {
    pub critical: usize,
    pub warning: usize,
    pub healthy: usize,
}

impl HealthBucketSummary {
    /// Number of volumes counted in any bucket.
    pub fn total(&self) -> usize {
        self.critical + self.warning + self.healthy
    }

    /// Count for a single bucket.
    pub fn get(&self, health: VolumeHealth) -> usize {
        match health {
            VolumeHealth::Critical => self.critical,
            VolumeHealth::Warning => self.warning,
            VolumeHealth::Healthy => self.healthy,
        }
    }

    pub(crate) fn record(&mut self, health: VolumeHealth) {
        match health {
            VolumeHealth::Critical => self.critical += 1,
            VolumeHealth::Warning => self.warning += 1,
            VolumeHealth::Healthy => self.healthy += 1,
        }
    }
}

/// Protected volume totals shown next to the health donut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub total: usize,
    pub with_issues: usize,
}

/// A DRPlacementControl that binds an application placement to a policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementControlRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for PlacementControlRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A DR policy assigned to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    pub name: String,
    /// Placement controls removed when this policy is unassigned.
    #[serde(default, alias = "placementControlInfo")]
    pub placement_controls: Vec<PlacementControlRef>,
    /// Remaining fields, carried through untouched.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
impl PolicyRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placement_controls: Vec::new(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Placement control of a discovered application, as watched in the
/// discovered-apps namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredPlacementControl {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Name of the referenced DR policy.
    #[serde(default, alias = "drPolicyRef")]
    pub policy_ref: String,
    #[serde(default)]
    pub protected_namespaces: Vec<String>,
}

/// Load state of a watched resource list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default = "default_loaded")]
    pub loaded: bool,
    #[serde(default)]
    pub load_error: Option<String>,
}

fn default_loaded() -> bool {
    true
}

impl Default for ResourceStatus {
    fn default() -> Self {
        Self::ready()
    }
}

impl ResourceStatus {
    pub fn ready() -> Self {
        Self {
            loaded: true,
            load_error: None,
        }
    }

    #[cfg(test)]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loaded: true,
            load_error: Some(error.into()),
        }
    }

    /// Combine two watch sources: loaded only when both are, first error wins.
    pub fn combine(&self, other: &ResourceStatus) -> ResourceStatus {
        ResourceStatus {
            loaded: self.loaded && other.loaded,
            load_error: self.load_error.clone().or_else(|| other.load_error.clone()),
        }
    }

    /// Loaded without error.
    pub fn is_ready(&self) -> bool {
        self.loaded && self.load_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_ordering() {
        assert!(VolumeHealth::Healthy < VolumeHealth::Warning);
        assert!(VolumeHealth::Warning < VolumeHealth::Critical);
    }

    #[test]
    fn test_parse_interval_minutes() {
        assert_eq!(parse_interval_minutes("5m"), Some(5));
        assert_eq!(parse_interval_minutes("2h"), Some(120));
        assert_eq!(parse_interval_minutes("1d"), Some(1440));
        assert_eq!(parse_interval_minutes(" 15 "), Some(15));
        assert_eq!(parse_interval_minutes("10x"), None);
        assert_eq!(parse_interval_minutes("m"), None);
        assert_eq!(parse_interval_minutes(""), None);
    }

    #[test]
    fn test_volume_record_accepts_both_interval_forms() {
        let json = r#"[
            {"pvcName": "a", "replicationType": "async", "schedulingInterval": "5m",
             "application": {"namespace": "ns", "name": "app"}},
            {"replicationType": "SYNC", "schedulingInterval": 10},
            {"replicationType": "async", "schedulingInterval": "soon"}
        ]"#;

        let records: Vec<ProtectedVolumeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].scheduling_interval_minutes, 5);
        assert_eq!(records[0].application, Some(ApplicationRef::new("ns", "app")));
        assert_eq!(records[1].replication_type, ReplicationType::Sync);
        assert_eq!(records[1].scheduling_interval_minutes, 10);
        assert!(records[1].application.is_none());
        assert_eq!(records[2].scheduling_interval_minutes, 0);
    }

    #[test]
    fn test_partial_volume_records_use_safe_defaults() {
        let json = r#"[
            {"pvcName": "no-type"},
            {"pvcName": "metro", "replicationType": "metro"},
            {"pvcName": "empty-sync", "replicationType": "ASYNC", "lastSyncTime": ""},
            {"pvcName": "bad-sync", "replicationType": "Async", "lastSyncTime": "yesterday"},
            {"pvcName": "ok", "replicationType": "async", "lastSyncTime": "2024-05-01T12:00:00Z"}
        ]"#;

        let records: Vec<ProtectedVolumeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].replication_type, ReplicationType::Sync);
        assert_eq!(records[1].replication_type, ReplicationType::Sync);
        assert_eq!(records[2].replication_type, ReplicationType::Async);
        assert!(records[2].last_sync_time.is_none());
        assert!(records[3].last_sync_time.is_none());
        assert!(records[4].last_sync_time.is_some());
    }

    #[test]
    fn test_filter_never_matches_missing_owner() {
        let filter = ApplicationFilter::new("ns", "app");
        assert!(filter.matches(Some(&ApplicationRef::new("ns", "app"))));
        assert!(!filter.matches(Some(&ApplicationRef::new("ns", "other"))));
        assert!(!filter.matches(None));
    }

    #[test]
    fn test_policy_record_keeps_opaque_fields() {
        let json = r#"{"name": "gold", "schedulingInterval": "5m",
            "placementControlInfo": [{"namespace": "ns", "name": "drpc-1"}]}"#;
        let policy: PolicyRecord = serde_json::from_str(json).unwrap();

        assert_eq!(policy.name, "gold");
        assert_eq!(policy.placement_controls.len(), 1);
        assert_eq!(
            policy.attributes.get("schedulingInterval"),
            Some(&serde_json::Value::String("5m".to_string()))
        );
    }

    #[test]
    fn test_resource_status_combine() {
        let loading = ResourceStatus {
            loaded: false,
            load_error: None,
        };
        let failed = ResourceStatus::failed("forbidden");

        let combined = ResourceStatus::ready().combine(&loading);
        assert!(!combined.loaded);
        assert!(!combined.is_ready());

        let combined = ResourceStatus::ready().combine(&failed);
        assert_eq!(combined.load_error.as_deref(), Some("forbidden"));
        assert!(ResourceStatus::ready().combine(&ResourceStatus::ready()).is_ready());
    }

    #[test]
    fn test_bucket_summary_total() {
        let mut summary = HealthBucketSummary::default();
        summary.record(VolumeHealth::Critical);
        summary.record(VolumeHealth::Healthy);
        summary.record(VolumeHealth::Healthy);

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.get(VolumeHealth::Healthy), 2);
        assert_eq!(summary.get(VolumeHealth::Warning), 0);
    }
}
