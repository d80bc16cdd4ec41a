//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.drdash.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".drdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Replication health settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Policy list settings.
    #[serde(default)]
    pub policies: PoliciesConfig,

    /// Hub cluster API settings.
    #[serde(default)]
    pub hub: HubSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format: "markdown" or "json".
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Volume replication health settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Lag ratio (elapsed / interval) above which a volume is in warning.
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,

    /// Lag ratio at or above which a volume is critical.
    #[serde(default = "default_critical_ratio")]
    pub critical_ratio: f64,

    /// Elapsed seconds assumed when a volume never reported a sync.
    #[serde(default = "default_missing_sync_floor")]
    pub missing_sync_floor_seconds: u64,

    /// Recompute period of the live monitor.
    #[serde(default = "default_refresh")]
    pub refresh_seconds: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            warning_ratio: default_warning_ratio(),
            critical_ratio: default_critical_ratio(),
            missing_sync_floor_seconds: default_missing_sync_floor(),
            refresh_seconds: default_refresh(),
        }
    }
}

fn default_warning_ratio() -> f64 {
    crate::health::classifier::WARNING_RATIO
}

fn default_critical_ratio() -> f64 {
    crate::health::classifier::CRITICAL_RATIO
}

fn default_missing_sync_floor() -> u64 {
    crate::health::aggregator::MISSING_SYNC_FLOOR_SECS
}

fn default_refresh() -> u64 {
    60
}

/// Policy list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliciesConfig {
    /// Rows per page.
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

fn default_per_page() -> usize {
    crate::policies::DEFAULT_PER_PAGE
}

/// Hub cluster API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Kubernetes API URL of the hub cluster.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token; usually supplied through the environment instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://localhost:6443".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Reject values the dashboard cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.health.warning_ratio < 0.0 || self.health.critical_ratio < self.health.warning_ratio
        {
            anyhow::bail!(
                "health ratios must satisfy 0 <= warning_ratio <= critical_ratio (got {} and {})",
                self.health.warning_ratio,
                self.health.critical_ratio
            );
        }
        if self.health.refresh_seconds == 0 {
            anyhow::bail!("health.refresh_seconds must be at least 1");
        }
        if self.policies.per_page == 0 {
            anyhow::bail!("policies.per_page must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(per_page) = args.per_page {
            self.policies.per_page = per_page;
        }

        if let Some(ref url) = args.hub_url {
            self.hub.api_url = url.clone();
        }
        if let Some(ref token) = args.token {
            self.hub.token = Some(token.clone());
        }

        if let Some(format) = args.format {
            self.general.format = format.as_str().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
