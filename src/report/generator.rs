//! Dashboard report generation.
//!
//! Renders the computed dashboard as Markdown for terminals and as JSON
//! for other tools.

use crate::health::VolumeDashboard;
use crate::models::{HealthBucketSummary, IssueCount, VolumeHealth};
use crate::policies::PolicyListView;
use crate::workflow::{MessageVariant, UnassignWorkflow, WorkflowMessage};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the dashboard report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Snapshot file the report was built from.
    pub snapshot: String,
    /// Cluster shown, if the snapshot had any.
    pub cluster: Option<String>,
    /// Label of the selected application.
    pub application: String,
    /// Dropdown item id of the selected application.
    pub application_id: String,
    /// Workload namespace checked for DR protection.
    pub workload_namespace: String,
    pub generated_at: DateTime<Utc>,
}

/// Application dropdown group.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationGroup {
    pub namespace: String,
    pub applications: Vec<String>,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport<'a> {
    pub metadata: ReportMetadata,
    pub clusters: Vec<String>,
    pub applications: Vec<ApplicationGroup>,
    pub volumes: VolumeDashboard,
    pub policies: PolicyListView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassign: Option<UnassignWorkflow>,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DashboardReport<'_>) -> String {
    let mut output = String::new();

    output.push_str("# Disaster Recovery Dashboard\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_volume_section(&report.volumes));
    output.push_str(&generate_policy_section(&report.policies));

    if let Some(ref workflow) = report.unassign {
        output.push_str(&generate_unassign_section(workflow));
    }

    output.push_str(&generate_selection_section(
        &report.clusters,
        &report.applications,
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Snapshot:** `{}`\n", metadata.snapshot));
    section.push_str(&format!(
        "- **Cluster:** {}\n",
        metadata.cluster.as_deref().unwrap_or("none")
    ));
    section.push_str(&format!("- **Application:** {}\n", metadata.application));
    if !metadata.workload_namespace.is_empty() {
        section.push_str(&format!(
            "- **Workload Namespace:** `{}`\n",
            metadata.workload_namespace
        ));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

/// Generate the volume replication health section.
fn generate_volume_section(volumes: &VolumeDashboard) -> String {
    let mut section = String::new();

    section.push_str("## Volume Replication Health\n\n");
    section.push_str(&generate_health_table(&volumes.summary));
    section.push_str(&generate_issue_line(&volumes.issues));

    section
}

/// Bucket table, one column per health level.
pub fn generate_health_table(summary: &HealthBucketSummary) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "| {} Critical | {} Warning | {} Healthy | **Volumes** |\n",
        VolumeHealth::Critical.emoji(),
        VolumeHealth::Warning.emoji(),
        VolumeHealth::Healthy.emoji(),
    ));
    table.push_str("|:---:|:---:|:---:|:---:|\n");
    table.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.critical,
        summary.warning,
        summary.healthy,
        summary.total()
    ));

    table
}

fn generate_issue_line(issues: &IssueCount) -> String {
    format!(
        "**Protected PVCs:** {} ({} with issues)\n\n",
        issues.total, issues.with_issues
    )
}

/// Generate the assigned policies section.
fn generate_policy_section(view: &PolicyListView<'_>) -> String {
    let mut section = String::new();

    section.push_str("## My Assigned Policies\n\n");

    if !view.ready {
        match view.load_error {
            Some(ref error) => {
                section.push_str(&format!("> ⚠️ Unable to load policies: {}\n\n", error))
            }
            None => section.push_str("Loading…\n\n"),
        }
        return section;
    }

    section.push_str(&format!(
        "*Enroll application: {}*\n\n",
        if view.enroll_enabled { "available" } else { "unavailable" }
    ));

    if !view.has_assigned_policies {
        section.push_str(&format!("### {}\n\n", view.empty_state_title()));
        if view.namespace_protected {
            section.push_str(
                "This managed application namespace is already DR protected. \
                 You may have protected this namespace while enrolling discovered applications.\n\n",
            );
        } else {
            section.push_str(
                "You have not enrolled this application yet. \
                 To protect your application, use **Enroll application**.\n\n",
            );
        }
        return section;
    }

    if view.page.is_empty() {
        section.push_str("No policies match the search.\n\n");
    } else {
        section.push_str("| Policy | Placement Controls |\n");
        section.push_str("|:---|:---:|\n");
        for policy in &view.page.visible {
            section.push_str(&format!(
                "| `{}` | {} |\n",
                policy.name,
                policy.placement_controls.len()
            ));
        }
        section.push_str("\n");
    }

    section.push_str(&format!(
        "*Page {} of {} ({} matching policies)*\n\n",
        view.page_number, view.page_count, view.page.total_count
    ));

    section
}

/// Generate the unassign outcome section.
fn generate_unassign_section(workflow: &UnassignWorkflow) -> String {
    let mut section = String::new();

    section.push_str("## Unassign Policies\n\n");
    section.push_str(&format!("**State:** {}\n\n", workflow.state()));

    if let Some(message) = workflow.message() {
        section.push_str(&generate_message_block(message));
    }

    section
}

/// Alert block for a workflow message.
pub fn generate_message_block(message: &WorkflowMessage) -> String {
    let icon = match message.variant {
        MessageVariant::Info => "ℹ️",
        MessageVariant::Success => "✅",
        MessageVariant::Danger => "❌",
    };

    let mut block = format!("> {} {}\n", icon, message.title);
    if let Some(ref description) = message.description {
        block.push_str(&format!(">\n> {}\n", description));
    }
    block.push('\n');
    block
}

/// Generate the cluster/application listing.
fn generate_selection_section(clusters: &[String], applications: &[ApplicationGroup]) -> String {
    if clusters.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Clusters and Applications\n\n");
    section.push_str(&format!("- **Clusters:** {}\n", clusters.join(", ")));
    for group in applications {
        section.push_str(&format!(
            "- **Namespace `{}`:** {}\n",
            group.namespace,
            group.applications.join(", ")
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DashboardReport<'_>) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
