//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::VolumeHealth;
use crate::policies::INITIAL_PAGE;
use clap::Parser;
use std::path::PathBuf;

/// drdash - disaster-recovery dashboard for protected applications
///
/// Summarise volume replication health and assigned DR policies from a
/// snapshot of hub cluster resources, and unassign policies.
///
/// Examples:
///   drdash --snapshot hub.json
///   drdash --snapshot hub.json --cluster east-1 --app busybox-ns/busybox
///   drdash --snapshot hub.json --search gold --page 2 --format json
///   drdash --snapshot hub.json --unassign gold-5m --yes
///   drdash --snapshot hub.json --watch
///   drdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON snapshot of the watched hub resources
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub snapshot: Option<PathBuf>,

    /// Cluster to summarise (defaults to the first cluster in the snapshot)
    #[arg(long, value_name = "NAME")]
    pub cluster: Option<String>,

    /// Restrict volume health to one application
    ///
    /// Accepts `namespace/name` or `namespace%#%name`.
    #[arg(short, long, value_name = "APP")]
    pub app: Option<String>,

    /// Case-insensitive search over assigned policy names
    #[arg(long, default_value = "", value_name = "TEXT")]
    pub search: String,

    /// Page of the policy list to show (1-based)
    #[arg(long, default_value_t = INITIAL_PAGE, value_name = "N")]
    pub page: usize,

    /// Policies per page
    #[arg(long, value_name = "N")]
    pub per_page: Option<usize>,

    /// Workload namespace checked for existing DR protection
    ///
    /// Overrides the namespace recorded in the snapshot.
    #[arg(short, long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Unassign these policies (comma-separated names)
    #[arg(long, value_name = "POLICIES", value_delimiter = ',')]
    pub unassign: Option<Vec<String>>,

    /// Confirm the unassign action without prompting
    #[arg(short, long, requires = "unassign")]
    pub yes: bool,

    /// Hub cluster API URL
    #[arg(long, value_name = "URL", env = "DRDASH_HUB_URL")]
    pub hub_url: Option<String>,

    /// Bearer token for the hub API
    #[arg(long, value_name = "TOKEN", env = "DRDASH_HUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Keep recomputing volume health and print every change
    #[arg(short, long, conflicts_with = "unassign")]
    pub watch: bool,

    /// Exit with code 2 if any volume is at or above this health level
    ///
    /// Values: warning, critical
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .drdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .drdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        }
    }

    /// Parse the `general.format` config value, falling back to Markdown.
    pub fn from_config(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Markdown,
        }
    }
}

/// Health level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Warning,
    Critical,
}

impl FailOnLevel {
    pub fn as_health(&self) -> VolumeHealth {
        match self {
            FailOnLevel::Warning => VolumeHealth::Warning,
            FailOnLevel::Critical => VolumeHealth::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.page == 0 {
            return Err("Page must be at least 1".to_string());
        }

        if self.per_page == Some(0) {
            return Err("Per-page must be at least 1".to_string());
        }

        if let Some(ref app) = self.app {
            if crate::selection::parse_application_arg(app).is_none() {
                return Err(format!(
                    "Application must be given as namespace/name, got '{}'",
                    app
                ));
            }
        }

        if let Some(ref names) = self.unassign {
            if names.iter().all(|n| n.trim().is_empty()) {
                return Err("--unassign needs at least one policy name".to_string());
            }
        }

        if let Some(ref url) = self.hub_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Hub URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref snapshot) = self.snapshot {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file; `-q`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
