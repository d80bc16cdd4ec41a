//! Policy unassign workflow and its batch executor.

pub mod batch;
pub mod state;

pub use state::{MessageVariant, UnassignState, UnassignWorkflow, WorkflowMessage};
