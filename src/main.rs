//! drdash - disaster-recovery dashboard for protected applications
//!
//! A CLI that reads a snapshot of hub cluster resources, summarises
//! volume replication health and assigned DR policies, and runs the
//! policy unassign workflow against the hub API.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, snapshot, unknown cluster, etc.)
//!   2 - Volumes at or above the --fail-on level, or the unassign batch failed

mod cli;
mod config;
mod health;
mod hub;
mod models;
mod policies;
mod report;
mod selection;
mod snapshot;
mod workflow;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use health::{HealthAggregator, HealthMonitor, VolumeDashboard};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ApplicationFilter, HealthBucketSummary, PolicyRecord, VolumeHealth};
use policies::{PolicyListInput, PolicyListView};
use report::{ApplicationGroup, DashboardReport, ReportMetadata};
use snapshot::Snapshot;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use workflow::{UnassignState, UnassignWorkflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first so `[general] verbose` can pick the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("drdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Snapshot: {:?}", args.snapshot);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .drdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  .drdash.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .drdash.toml")?;

    println!("✅ Created .drdash.toml with default settings.");
    println!("   Edit it to tune health thresholds, page size and the hub API.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `-v`/`-q` and `[general] verbose`.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the dashboard. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    config.validate()?;

    let snapshot_path = args
        .snapshot
        .clone()
        .context("--snapshot is required")?;
    let snapshot = Snapshot::load(&snapshot_path)?;
    info!(
        "Loaded snapshot with {} clusters and {} policies",
        snapshot.clusters.len(),
        snapshot.policies.len()
    );

    let cluster_names = snapshot.cluster_names();
    let cluster_name = match selection::resolve_cluster(&cluster_names, args.cluster.as_deref()) {
        Some(name) => Some(name.clone()),
        None if args.cluster.is_some() => {
            let requested = args.cluster.as_deref().unwrap_or_default();
            let suggestions = selection::filter_clusters(&cluster_names, requested);
            anyhow::bail!(
                "Unknown cluster '{}'{}",
                requested,
                if suggestions.is_empty() {
                    String::new()
                } else {
                    format!(
                        " (did you mean {}?)",
                        suggestions
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                }
            );
        }
        None => {
            warn!("Snapshot contains no clusters");
            None
        }
    };
    let cluster = cluster_name.as_deref().and_then(|name| snapshot.cluster(name));

    let app_filter = args
        .app
        .as_deref()
        .and_then(selection::parse_application_arg);
    let aggregator = HealthAggregator::from_config(&config.health);

    if args.watch {
        let records = cluster.map(|c| c.volumes.clone()).unwrap_or_default();
        return run_watch(
            &snapshot_path,
            cluster_name,
            records,
            app_filter,
            aggregator,
            Duration::from_secs(config.health.refresh_seconds),
        )
        .await;
    }

    let volumes = VolumeDashboard::compute(
        &aggregator,
        cluster.map(|c| c.volumes.as_slice()).unwrap_or_default(),
        app_filter.as_ref(),
        Utc::now(),
    );

    let workload_namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| snapshot.workload_namespace.clone());

    // Unassign workflow
    let mut policies = snapshot.policies.clone();
    let workflow = match args.unassign {
        Some(ref names) => Some(run_unassign(&config, &policies, names, args.yes).await?),
        None => None,
    };
    if let (Some(wf), Some(names)) = (&workflow, &args.unassign) {
        if wf.state() == UnassignState::Succeeded {
            remove_unassigned(&mut policies, names);
        }
    }

    let view = PolicyListView::build(
        PolicyListInput {
            policies: &policies,
            policies_status: &snapshot.policies_status,
            discovered: &snapshot.discovered_placement_controls,
            discovered_status: &snapshot.discovered_status,
            workload_namespace: &workload_namespace,
            eligible_policies: &snapshot.eligible_policies,
            selected_count: workflow.as_ref().map_or(0, |wf| wf.selected().len()),
        },
        &args.search,
        args.page,
        config.policies.per_page,
    );

    let applications = cluster
        .map(|c| selection::application_options(&c.protected_apps))
        .unwrap_or_default()
        .into_iter()
        .map(|(namespace, applications)| ApplicationGroup {
            namespace,
            applications,
        })
        .collect();

    let unassign_failed = workflow
        .as_ref()
        .is_some_and(|wf| wf.state() == UnassignState::Failed);

    let report = DashboardReport {
        metadata: ReportMetadata {
            snapshot: snapshot_path.display().to_string(),
            cluster: cluster_name,
            application: selection::application_label(app_filter.as_ref()),
            application_id: selection::application_item_id(app_filter.as_ref()),
            workload_namespace: workload_namespace.clone(),
            generated_at: Utc::now(),
        },
        clusters: cluster_names,
        applications,
        volumes,
        policies: view,
        unassign: workflow,
    };

    let output = match OutputFormat::from_config(&config.general.format) {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", output),
    }

    if unassign_failed {
        return Ok(2);
    }

    if let Some(level) = args.fail_on {
        if exceeds_level(&report.volumes.summary, level.as_health()) {
            eprintln!(
                "\n⛔ Volumes found at or above {} health. Failing (exit code 2).",
                level.as_health()
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Whether any volume sits in `level` or a worse bucket.
fn exceeds_level(summary: &HealthBucketSummary, level: VolumeHealth) -> bool {
    [VolumeHealth::Warning, VolumeHealth::Critical]
        .into_iter()
        .filter(|health| *health >= level)
        .any(|health| summary.get(health) > 0)
}

/// Policy names given on the command line, without surrounding whitespace.
fn requested_names(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Drop the policies that were just unassigned from the listing.
fn remove_unassigned(policies: &mut Vec<PolicyRecord>, names: &[String]) {
    let removed = requested_names(names);
    policies.retain(|policy| !removed.contains(&policy.name.as_str()));
}

/// Select the named policies, ask for confirmation and run the batch.
async fn run_unassign(
    config: &Config,
    policies: &[PolicyRecord],
    names: &[String],
    confirmed: bool,
) -> Result<UnassignWorkflow> {
    let names = requested_names(names);
    let selected: Vec<PolicyRecord> = policies
        .iter()
        .filter(|p| names.contains(&p.name.as_str()))
        .cloned()
        .collect();

    for name in &names {
        if !policies.iter().any(|p| p.name == *name) {
            warn!("Policy '{}' is not assigned, skipping", name);
        }
    }
    if selected.is_empty() {
        anyhow::bail!("None of the requested policies are assigned to the application");
    }

    let mut workflow = UnassignWorkflow::new();
    workflow.select_policies(selected)?;
    workflow.request_unassign()?;

    if let Some(message) = workflow.message() {
        eprintln!("{}", report::generate_message_block(message).trim_end());
    }

    if !confirmed {
        workflow.cancel()?;
        eprintln!("   Re-run with --yes to unassign.");
        return Ok(workflow);
    }

    let client = hub::HubClient::new(hub::HubConfig::from(&config.hub))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "Unassigning {} placement controls...",
        workflow.placement_controls().len()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let state = workflow.confirm(&client).await?;
    spinner.finish_and_clear();

    info!("Unassign finished: {}", state);
    Ok(workflow)
}

/// Keep the dashboard live: reload the snapshot on every refresh and print
/// the volume summary whenever it changes. Runs until Ctrl-C.
async fn run_watch(
    snapshot_path: &Path,
    cluster_name: Option<String>,
    records: Vec<models::ProtectedVolumeRecord>,
    app_filter: Option<ApplicationFilter>,
    aggregator: HealthAggregator,
    period: Duration,
) -> Result<i32> {
    let (records_tx, records_rx) = watch::channel(Arc::new(records));
    let (_filter_tx, filter_rx) = watch::channel(app_filter);

    let monitor = HealthMonitor::new(aggregator, period);
    let (mut dashboard, monitor_handle) = monitor.spawn(records_rx, filter_rx);

    // Snapshot reloader acting as the watch source
    let path = snapshot_path.to_path_buf();
    let reloader = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match Snapshot::load(&path) {
                Ok(snapshot) => {
                    let volumes = cluster_name
                        .as_deref()
                        .and_then(|name| snapshot.cluster(name))
                        .map(|c| c.volumes.clone())
                        .unwrap_or_default();
                    records_tx.send_if_modified(|current| {
                        if **current == volumes {
                            false
                        } else {
                            *current = Arc::new(volumes);
                            true
                        }
                    });
                }
                Err(e) => warn!("Snapshot reload failed: {:#}", e),
            }
        }
    });

    println!("👀 Watching volume replication health (Ctrl-C to stop)\n");
    print_dashboard(&dashboard.borrow_and_update());

    loop {
        tokio::select! {
            changed = dashboard.changed() => {
                if changed.is_err() {
                    break;
                }
                print_dashboard(&dashboard.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
        }
    }

    reloader.abort();
    monitor_handle.abort();
    Ok(0)
}

fn print_dashboard(dashboard: &VolumeDashboard) {
    let stamp = dashboard
        .computed_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    println!(
        "[{}] {} Critical: {} | {} Warning: {} | {} Healthy: {} | {} with issues",
        stamp,
        VolumeHealth::Critical.emoji(),
        dashboard.summary.critical,
        VolumeHealth::Warning.emoji(),
        dashboard.summary.warning,
        VolumeHealth::Healthy.emoji(),
        dashboard.summary.healthy,
        dashboard.issues.with_issues
    );
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring .drdash.toml: {:#}", e);
            Ok(Config::default())
        }
    }
}
