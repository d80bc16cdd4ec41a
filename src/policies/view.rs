//! Derived state of the "manage policies" list view.

use crate::models::{DiscoveredPlacementControl, PolicyRecord, ResourceStatus};
use crate::policies::paginator::{filter_and_paginate, page_count, Page};
use serde::Serialize;

/// Whether `workload_namespace` is already protected by a discovered
/// application's placement control that uses one of the eligible policies.
pub fn is_namespace_protected(
    workload_namespace: &str,
    eligible_policies: &[String],
    placement_controls: &[DiscoveredPlacementControl],
) -> bool {
    placement_controls.iter().any(|drpc| {
        drpc.protected_namespaces
            .iter()
            .any(|ns| ns == workload_namespace)
            && eligible_policies.iter().any(|name| *name == drpc.policy_ref)
    })
}

/// Everything the policy list renders, computed in one place.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyListView<'a> {
    /// Assigned policies and discovered placement controls both loaded
    /// without error.
    pub ready: bool,
    /// First load error, if any.
    pub load_error: Option<String>,
    /// At least one policy is assigned before any search is applied.
    pub has_assigned_policies: bool,
    /// The namespace is already enrolled through a discovered application.
    pub namespace_protected: bool,
    /// The "Enroll application" action is available.
    pub enroll_enabled: bool,
    /// The search box is shown.
    pub search_visible: bool,
    pub page: Page<'a, PolicyRecord>,
    pub page_number: usize,
    pub page_count: usize,
}

/// Inputs of [`PolicyListView::build`].
#[derive(Debug, Clone, Copy)]
pub struct PolicyListInput<'a> {
    pub policies: &'a [PolicyRecord],
    pub policies_status: &'a ResourceStatus,
    pub discovered: &'a [DiscoveredPlacementControl],
    pub discovered_status: &'a ResourceStatus,
    pub workload_namespace: &'a str,
    pub eligible_policies: &'a [String],
    /// Policies currently selected in the table.
    pub selected_count: usize,
}

impl<'a> PolicyListView<'a> {
    pub fn build(input: PolicyListInput<'a>, search_text: &str, page: usize, per_page: usize) -> Self {
        let status = input.policies_status.combine(input.discovered_status);
        let namespace_protected = is_namespace_protected(
            input.workload_namespace,
            input.eligible_policies,
            input.discovered,
        );
        let has_assigned_policies = !input.policies.is_empty();
        let page_slice = filter_and_paginate(input.policies, search_text, page, per_page);
        let pages = page_count(page_slice.total_count, per_page);

        Self {
            ready: status.is_ready(),
            load_error: status.load_error,
            has_assigned_policies,
            namespace_protected,
            enroll_enabled: input.selected_count == 0 && !namespace_protected,
            search_visible: has_assigned_policies,
            page: page_slice,
            page_number: page.max(1),
            page_count: pages,
        }
    }

    /// Heading of the empty state shown when nothing is assigned.
    pub fn empty_state_title(&self) -> &'static str {
        if self.namespace_protected {
            "Application already enrolled in disaster recovery"
        } else {
            "No assigned disaster recovery policy found"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drpc(policy: &str, namespaces: &[&str]) -> DiscoveredPlacementControl {
        DiscoveredPlacementControl {
            name: format!("{}-drpc", policy),
            namespace: "openshift-dr-ops".to_string(),
            policy_ref: policy.to_string(),
            protected_namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn input<'a>(
        policies: &'a [PolicyRecord],
        discovered: &'a [DiscoveredPlacementControl],
        eligible: &'a [String],
        status: &'a ResourceStatus,
    ) -> PolicyListInput<'a> {
        PolicyListInput {
            policies,
            policies_status: status,
            discovered,
            discovered_status: status,
            workload_namespace: "busybox",
            eligible_policies: eligible,
            selected_count: 0,
        }
    }

    #[test]
    fn test_namespace_protection_needs_both_conditions() {
        let eligible = vec!["gold".to_string()];

        assert!(is_namespace_protected("busybox", &eligible, &[drpc("gold", &["busybox"])]));
        assert!(!is_namespace_protected("busybox", &eligible, &[drpc("silver", &["busybox"])]));
        assert!(!is_namespace_protected("busybox", &eligible, &[drpc("gold", &["other"])]));
        assert!(!is_namespace_protected("busybox", &eligible, &[]));
    }

    #[test]
    fn test_empty_list_view() {
        let status = ResourceStatus::ready();
        let eligible = vec!["gold".to_string()];
        let discovered = vec![drpc("gold", &["busybox"])];

        let view = PolicyListView::build(input(&[], &discovered, &eligible, &status), "", 1, 4);

        assert!(view.ready);
        assert!(!view.has_assigned_policies);
        assert!(!view.search_visible);
        assert!(view.namespace_protected);
        assert!(!view.enroll_enabled);
        assert_eq!(
            view.empty_state_title(),
            "Application already enrolled in disaster recovery"
        );
    }

    #[test]
    fn test_selection_disables_enroll() {
        let status = ResourceStatus::ready();
        let policies = vec![PolicyRecord::new("gold"), PolicyRecord::new("silver")];

        let mut view_input = input(&policies, &[], &[], &status);
        let view = PolicyListView::build(view_input, "", 1, 4);
        assert!(view.enroll_enabled);
        assert_eq!(view.page.total_count, 2);
        assert_eq!(view.page_count, 1);

        view_input.selected_count = 1;
        let view = PolicyListView::build(view_input, "", 1, 4);
        assert!(!view.enroll_enabled);
    }

    #[test]
    fn test_load_error_is_surfaced() {
        let ready = ResourceStatus::ready();
        let failed = ResourceStatus::failed("drpc watch forbidden");
        let policies = vec![PolicyRecord::new("gold")];

        let mut view_input = input(&policies, &[], &[], &ready);
        view_input.discovered_status = &failed;
        let view = PolicyListView::build(view_input, "", 1, 4);

        assert!(!view.ready);
        assert_eq!(view.load_error.as_deref(), Some("drpc watch forbidden"));
    }
}
