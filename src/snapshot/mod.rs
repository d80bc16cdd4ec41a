//! Hub resource snapshots.
//!
//! A snapshot is the already-decoded output of the resource watchers,
//! written as JSON. Individual records that fail to decode are skipped with
//! a warning instead of failing the whole load.

use crate::models::{
    ApplicationRef, DiscoveredPlacementControl, PolicyRecord, ProtectedVolumeRecord,
    ResourceStatus,
};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Resources of one managed cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterResources {
    pub name: String,
    pub protected_apps: Vec<ApplicationRef>,
    pub volumes: Vec<ProtectedVolumeRecord>,
}

/// Everything the dashboard reads.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub clusters: Vec<ClusterResources>,
    pub policies: Vec<PolicyRecord>,
    pub policies_status: ResourceStatus,
    pub discovered_placement_controls: Vec<DiscoveredPlacementControl>,
    pub discovered_status: ResourceStatus,
    pub eligible_policies: Vec<String>,
    pub workload_namespace: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    clusters: Vec<RawCluster>,
    #[serde(default)]
    policies: Vec<Value>,
    #[serde(default)]
    policies_status: ResourceStatus,
    #[serde(default)]
    discovered_placement_controls: Vec<Value>,
    #[serde(default)]
    discovered_status: ResourceStatus,
    #[serde(default)]
    eligible_policies: Vec<String>,
    #[serde(default)]
    workload_namespace: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCluster {
    name: String,
    #[serde(default)]
    protected_apps: Vec<Value>,
    #[serde(default)]
    volumes: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProtectedApp {
    #[serde(alias = "namespace")]
    app_namespace: String,
    #[serde(alias = "name")]
    app_name: String,
}

impl Snapshot {
    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
    }

    /// Parse a snapshot document.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(content)?;

        let clusters = raw
            .clusters
            .into_iter()
            .map(|cluster| {
                let protected_apps = decode_lenient::<RawProtectedApp>(
                    cluster.protected_apps,
                    "protected application",
                )
                .into_iter()
                .map(|app| ApplicationRef::new(app.app_namespace, app.app_name))
                .collect();
                let volumes = decode_lenient(cluster.volumes, "protected volume");
                debug!("Cluster {} loaded", cluster.name);
                ClusterResources {
                    name: cluster.name,
                    protected_apps,
                    volumes,
                }
            })
            .collect();

        Ok(Self {
            clusters,
            policies: decode_lenient(raw.policies, "policy"),
            policies_status: raw.policies_status,
            discovered_placement_controls: decode_lenient(
                raw.discovered_placement_controls,
                "discovered placement control",
            ),
            discovered_status: raw.discovered_status,
            eligible_policies: raw.eligible_policies,
            workload_namespace: raw.workload_namespace,
        })
    }

    /// Cluster names in snapshot order.
    pub fn cluster_names(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.name.clone()).collect()
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterResources> {
        self.clusters.iter().find(|c| c.name == name)
    }
}

/// Decode each value on its own, dropping the ones that don't fit.
fn decode_lenient<T: DeserializeOwned>(values: Vec<Value>, kind: &str) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} #{}: {}", kind, index, e);
                None
            }
        })
        .collect()
}
