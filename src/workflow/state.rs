//! Policy unassign workflow.
//!
//! ```text
//! Idle -> PoliciesSelected -> ActionConfirmPending -> Succeeded | Failed
//! ```
//!
//! Selection, confirmation and the batch outcome drive the transitions.
//! The batch is all-or-nothing: one failed placement control fails the
//! whole action and leaves the selection in place.

use crate::models::{PlacementControlRef, PolicyRecord};
use crate::workflow::batch::{unassign_all, PlacementUnassigner};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Where the unassign workflow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignState {
    Idle,
    PoliciesSelected,
    ActionConfirmPending,
    Succeeded,
    Failed,
}

impl fmt::Display for UnassignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnassignState::Idle => "idle",
            UnassignState::PoliciesSelected => "policies selected",
            UnassignState::ActionConfirmPending => "confirmation pending",
            UnassignState::Succeeded => "succeeded",
            UnassignState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Alert styling of a workflow message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVariant {
    Info,
    Success,
    Danger,
}

/// User-facing message attached to the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowMessage {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub variant: MessageVariant,
}

/// A transition that is not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: UnassignState,
        action: &'static str,
    },
}

/// Selection and outcome of the unassign action.
#[derive(Debug, Clone, Serialize)]
pub struct UnassignWorkflow {
    state: UnassignState,
    selected: Vec<PolicyRecord>,
    message: Option<WorkflowMessage>,
}

impl Default for UnassignWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl UnassignWorkflow {
    pub fn new() -> Self {
        Self {
            state: UnassignState::Idle,
            selected: Vec::new(),
            message: None,
        }
    }

    pub fn state(&self) -> UnassignState {
        self.state
    }

    pub fn selected(&self) -> &[PolicyRecord] {
        &self.selected
    }

    pub fn message(&self) -> Option<&WorkflowMessage> {
        self.message.as_ref()
    }

    /// Replace the selection. An empty selection returns to idle.
    pub fn select_policies(&mut self, policies: Vec<PolicyRecord>) -> Result<(), WorkflowError> {
        if self.state == UnassignState::ActionConfirmPending {
            return Err(self.invalid("change the selection"));
        }

        self.state = if policies.is_empty() {
            UnassignState::Idle
        } else {
            UnassignState::PoliciesSelected
        };
        self.selected = policies;
        self.message = None;
        Ok(())
    }

    /// Ask for confirmation before unassigning the selection.
    pub fn request_unassign(&mut self) -> Result<(), WorkflowError> {
        if self.state != UnassignState::PoliciesSelected {
            return Err(self.invalid("request unassign"));
        }

        self.state = UnassignState::ActionConfirmPending;
        self.message = Some(WorkflowMessage {
            title: format!(
                "Selected policies ({}) will be removed for your application. This may have some affect on other applications sharing the placement.",
                self.selected.len()
            ),
            description: None,
            variant: MessageVariant::Info,
        });
        Ok(())
    }

    /// Dismiss the confirmation and keep the selection.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        if self.state != UnassignState::ActionConfirmPending {
            return Err(self.invalid("cancel"));
        }

        self.state = UnassignState::PoliciesSelected;
        self.message = None;
        Ok(())
    }

    /// Every placement control owned by the selected policies.
    pub fn placement_controls(&self) -> Vec<PlacementControlRef> {
        self.selected
            .iter()
            .flat_map(|policy| policy.placement_controls.iter().cloned())
            .collect()
    }

    /// Run the confirmed batch and move to its terminal state.
    ///
    /// A failed batch is an outcome, not an error: it lands in
    /// [`UnassignState::Failed`] with the reason in the message.
    pub async fn confirm<U>(&mut self, unassigner: &U) -> Result<UnassignState, WorkflowError>
    where
        U: PlacementUnassigner + Sync,
    {
        if self.state != UnassignState::ActionConfirmPending {
            return Err(self.invalid("confirm"));
        }

        let controls = self.placement_controls();
        let count = self.selected.len();
        info!(
            "Unassigning {} policies ({} placement controls)",
            count,
            controls.len()
        );

        match unassign_all(unassigner, &controls).await {
            Ok(()) => {
                self.selected.clear();
                self.state = UnassignState::Succeeded;
                self.message = Some(WorkflowMessage {
                    title: format!(
                        "Selected policies ({}) unassigned for the application.",
                        count
                    ),
                    description: None,
                    variant: MessageVariant::Success,
                });
            }
            Err(e) => {
                warn!("Policy unassign failed: {}", e);
                self.state = UnassignState::Failed;
                self.message = Some(WorkflowMessage {
                    title: "Unable to unassign all selected policies for the application."
                        .to_string(),
                    description: Some(e.to_string()),
                    variant: MessageVariant::Danger,
                });
            }
        }

        Ok(self.state)
    }

    fn invalid(&self, action: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            state: self.state,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::batch::testing::FakeUnassigner;

    fn policy(name: &str, controls: &[&str]) -> PolicyRecord {
        let mut policy = PolicyRecord::new(name);
        policy.placement_controls = controls
            .iter()
            .map(|c| PlacementControlRef {
                namespace: "apps".to_string(),
                name: c.to_string(),
            })
            .collect();
        policy
    }

    fn pending(policies: Vec<PolicyRecord>) -> UnassignWorkflow {
        let mut workflow = UnassignWorkflow::new();
        workflow.select_policies(policies).unwrap();
        workflow.request_unassign().unwrap();
        workflow
    }

    #[test]
    fn test_selection_transitions() {
        let mut workflow = UnassignWorkflow::new();
        assert_eq!(workflow.state(), UnassignState::Idle);

        workflow.select_policies(vec![policy("gold", &[])]).unwrap();
        assert_eq!(workflow.state(), UnassignState::PoliciesSelected);

        workflow.select_policies(Vec::new()).unwrap();
        assert_eq!(workflow.state(), UnassignState::Idle);
    }

    #[test]
    fn test_request_and_cancel() {
        let mut workflow = pending(vec![policy("gold", &["a"]), policy("silver", &["b"])]);
        assert_eq!(workflow.state(), UnassignState::ActionConfirmPending);
        assert!(workflow
            .message()
            .unwrap()
            .title
            .starts_with("Selected policies (2) will be removed"));

        workflow.cancel().unwrap();
        assert_eq!(workflow.state(), UnassignState::PoliciesSelected);
        assert!(workflow.message().is_none());
        assert_eq!(workflow.selected().len(), 2);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut workflow = UnassignWorkflow::new();
        assert_eq!(
            workflow.request_unassign(),
            Err(WorkflowError::InvalidTransition {
                state: UnassignState::Idle,
                action: "request unassign",
            })
        );
        assert!(workflow.cancel().is_err());

        let mut workflow = pending(vec![policy("gold", &["a"])]);
        assert!(workflow.select_policies(Vec::new()).is_err());
        assert!(workflow.request_unassign().is_err());
    }

    #[tokio::test]
    async fn test_confirm_requires_pending() {
        let mut workflow = UnassignWorkflow::new();
        let unassigner = FakeUnassigner::default();

        assert!(workflow.confirm(&unassigner).await.is_err());
        assert!(unassigner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_succeed_clears_selection() {
        let mut workflow = pending(vec![policy("gold", &["a", "b"]), policy("silver", &["c"])]);
        let unassigner = FakeUnassigner::default();

        let state = workflow.confirm(&unassigner).await.unwrap();

        assert_eq!(state, UnassignState::Succeeded);
        assert!(workflow.selected().is_empty());
        assert_eq!(unassigner.calls(), vec!["a", "b", "c"]);
        let message = workflow.message().unwrap();
        assert_eq!(message.variant, MessageVariant::Success);
        assert_eq!(
            message.title,
            "Selected policies (2) unassigned for the application."
        );
    }

    #[tokio::test]
    async fn test_one_failure_fails_batch_and_keeps_selection() {
        let mut workflow = pending(vec![policy("gold", &["a", "b"]), policy("silver", &["c"])]);
        let unassigner = FakeUnassigner::failing(&["b"]);

        let state = workflow.confirm(&unassigner).await.unwrap();

        assert_eq!(state, UnassignState::Failed);
        assert_eq!(workflow.selected().len(), 2);
        assert_eq!(unassigner.calls().len(), 3);
        let message = workflow.message().unwrap();
        assert_eq!(message.variant, MessageVariant::Danger);
        assert!(message.description.as_deref().unwrap().contains("apps/b"));
    }

    #[tokio::test]
    async fn test_can_reselect_after_terminal_state() {
        let mut workflow = pending(vec![policy("gold", &["a"])]);
        workflow
            .confirm(&FakeUnassigner::failing(&["a"]))
            .await
            .unwrap();

        workflow.select_policies(vec![policy("silver", &[])]).unwrap();
        assert_eq!(workflow.state(), UnassignState::PoliciesSelected);
        assert!(workflow.message().is_none());
    }
}
