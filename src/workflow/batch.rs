//! Concurrent unassign of placement controls.

use crate::models::PlacementControlRef;
use futures::future::join_all;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure to unassign one placement control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnassignError {
    #[error("request for {control} timed out after {timeout_secs}s")]
    Timeout { control: String, timeout_secs: u64 },

    #[error("cannot connect to hub API at {url}")]
    Connect { url: String },

    #[error("hub API rejected {control}: {status} {body}")]
    Status {
        control: String,
        status: u16,
        body: String,
    },

    #[error("failed to unassign {control}: {message}")]
    Request { control: String, message: String },
}

/// Removes one placement control from the hub.
pub trait PlacementUnassigner {
    fn unassign(
        &self,
        control: &PlacementControlRef,
    ) -> impl Future<Output = Result<(), UnassignError>> + Send;
}

/// Unassign every control concurrently and wait for all of them.
///
/// Every request runs to completion even after one fails. The first error
/// in input order is returned.
pub async fn unassign_all<U>(
    unassigner: &U,
    controls: &[PlacementControlRef],
) -> Result<(), UnassignError>
where
    U: PlacementUnassigner + Sync,
{
    debug!("Unassigning {} placement controls", controls.len());

    let outcomes = join_all(controls.iter().map(|control| unassigner.unassign(control))).await;

    let mut first_error = None;
    for (control, outcome) in controls.iter().zip(outcomes) {
        if let Err(e) = outcome {
            warn!("Unassign of {} failed: {}", control, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
