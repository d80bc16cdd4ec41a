//! Hub cluster API client.
//!
//! Unassigning a DR policy from an application deletes its
//! DRPlacementControl resources on the hub cluster.

use crate::models::PlacementControlRef;
use crate::workflow::batch::{PlacementUnassigner, UnassignError};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

const DRPC_API_PATH: &str = "apis/ramendr.openshift.io/v1alpha1";

/// Connection settings for the hub API.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl From<&crate::config::HubSettings> for HubConfig {
    fn from(settings: &crate::config::HubSettings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            token: settings.token.clone(),
            timeout_seconds: settings.timeout_seconds,
        }
    }
}

/// Deletes placement controls through the Kubernetes REST API of the hub.
pub struct HubClient {
    config: HubConfig,
    http_client: reqwest::Client,
}

impl HubClient {
    pub fn new(config: HubConfig) -> Result<Self> {
        info!("Using hub API at {}", config.api_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Resource URL of one DRPlacementControl.
    pub fn placement_control_url(&self, control: &PlacementControlRef) -> String {
        format!(
            "{}/{}/namespaces/{}/drplacementcontrols/{}",
            self.config.api_url.trim_end_matches('/'),
            DRPC_API_PATH,
            control.namespace,
            control.name
        )
    }

    async fn delete_placement_control(
        &self,
        control: &PlacementControlRef,
    ) -> Result<(), UnassignError> {
        let url = self.placement_control_url(control);
        debug!("DELETE {}", url);

        let mut request = self.http_client.delete(&url);
        if let Some(ref token) = self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UnassignError::Timeout {
                    control: control.to_string(),
                    timeout_secs: self.config.timeout_seconds,
                }
            } else if e.is_connect() {
                UnassignError::Connect {
                    url: self.config.api_url.clone(),
                }
            } else {
                UnassignError::Request {
                    control: control.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let body = if status.is_success() || status == StatusCode::NOT_FOUND {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        delete_outcome(control, status, body)
    }
}

/// Map the status of a DELETE response to the unassign result.
///
/// A missing resource was already unassigned.
fn delete_outcome(
    control: &PlacementControlRef,
    status: StatusCode,
    body: String,
) -> Result<(), UnassignError> {
    if status == StatusCode::NOT_FOUND {
        debug!("{} already removed", control);
        return Ok(());
    }
    if !status.is_success() {
        return Err(UnassignError::Status {
            control: control.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    info!("Removed placement control {}", control);
    Ok(())
}

impl PlacementUnassigner for HubClient {
    async fn unassign(&self, control: &PlacementControlRef) -> Result<(), UnassignError> {
        self.delete_placement_control(control).await
    }
}
