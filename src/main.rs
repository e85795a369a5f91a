//! SkillTrend - job-skill trend aggregator
//!
//! Stores scraped job postings, derives which skills are in demand,
//! evicts stale postings on a weekly sweep and pushes trend snapshots
//! to a configured endpoint.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, store, failed sync, etc.)

mod analysis;
mod badge;
mod cli;
mod config;
mod jobs;
mod models;
mod report;
mod router;
mod store;
mod sync;

use anyhow::{bail, Context, Result};
use badge::{badge_text, MemoryBadge};
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use jobs::{spawn_sweeper, TrendService};
use models::{JobRecord, TrendEntry, TrendReport};
use router::{Dispatch, Message, Reply, Router, RouterHandle, QUEUE_CAPACITY};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store::{FileStore, JobStore, KvStore, MemoryStore, SettingsStore};
use sync::SyncDispatcher;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("SkillTrend v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .skilltrend.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout carries reports and `serve` replies.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the selected command. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let ephemeral = matches!(args.command, Command::Serve { ephemeral: true });
    let Runtime {
        router,
        settings,
        badge,
        task: _router_task,
    } = start_router(&config, ephemeral)?;

    match args.command {
        Command::Ingest { input } => handle_ingest(&router, &badge, &input).await,
        Command::Trends {
            top,
            format,
            output,
        } => handle_trends(&router, top, format, output.as_deref()).await,
        Command::Clear => {
            router.dispatch(Message::ClearData).await?;
            router.count().await?;
            println!("🧹 Cleared all stored jobs.");
            Ok(0)
        }
        Command::Sweep => {
            let removed = router.sweep().await?;
            let remaining = router.count().await?;
            println!(
                "🧹 Swept {} expired jobs, {} remain.",
                removed, remaining
            );
            Ok(0)
        }
        Command::Sync => handle_sync(&router, args.quiet).await,
        Command::Status => handle_status(&router, &settings).await,
        Command::SetUrl { url, unset } => handle_set_url(&settings, url, unset).await,
        Command::Serve { .. } => serve(router, &badge, &config).await,
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Handles to a running router and the state it reports through.
struct Runtime {
    router: RouterHandle,
    settings: SettingsStore,
    badge: MemoryBadge,
    task: JoinHandle<()>,
}

/// Open the buckets and start the router actor.
fn start_router(config: &Config, ephemeral: bool) -> Result<Runtime> {
    let (jobs_kv, settings_kv): (Arc<dyn KvStore>, Arc<dyn KvStore>) = if ephemeral {
        info!("Using in-memory buckets");
        (
            Arc::new(MemoryStore::new(config.store.jobs_bucket.clone())),
            Arc::new(MemoryStore::new(config.store.settings_bucket.clone())),
        )
    } else {
        let dir = &config.general.data_dir;
        let jobs = FileStore::new(dir, config.store.jobs_bucket.clone());
        let settings = FileStore::new(dir, config.store.settings_bucket.clone());
        debug!(
            "Using buckets {} and {}",
            jobs.path().display(),
            settings.path().display()
        );
        (Arc::new(jobs), Arc::new(settings))
    };

    let settings = SettingsStore::new(settings_kv);
    let badge = MemoryBadge::new();
    let service = TrendService::new(
        JobStore::new(jobs_kv),
        Arc::new(badge.clone()),
        config.limits(),
    );
    let dispatcher = SyncDispatcher::new(settings.clone(), config.sync_timeout())
        .context("Failed to create HTTP client")?;

    let (router, task) = Router::spawn(service, dispatcher, QUEUE_CAPACITY);
    Ok(Runtime {
        router,
        settings,
        badge,
        task,
    })
}

/// Route every job in a JSON file (single object or array) as JOB_SCRAPED.
async fn handle_ingest(router: &RouterHandle, badge: &MemoryBadge, input: &Path) -> Result<i32> {
    let content = if input.as_os_str() == "-" {
        tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
            .await?
            .context("Failed to read jobs from stdin")?
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let items = match serde_json::from_str::<Value>(&content).context("Invalid job JSON")? {
        Value::Array(items) => items,
        single => vec![single],
    };

    let before = router.count().await?;
    let mut rejected = 0;

    for (index, item) in items.into_iter().enumerate() {
        match JobRecord::from_value(item) {
            Ok(record) => {
                router.dispatch(Message::JobScraped(record)).await?;
            }
            Err(e) => {
                warn!("Skipping job #{}: {}", index, e);
                rejected += 1;
            }
        }
    }

    let after = router.count().await?;
    println!(
        "📥 Stored {} new jobs ({} total, {} rejected).",
        after.saturating_sub(before),
        after,
        rejected
    );
    debug!("Badge after ingest: {:?}", badge.text());
    Ok(0)
}

async fn fetch_trends(router: &RouterHandle) -> Result<Vec<TrendEntry>> {
    match router.dispatch(Message::GetTrends).await?.reply().await? {
        Some(Reply::Trends(trends)) => Ok(trends),
        Some(Reply::Error { error }) => bail!("Failed to compute trends: {}", error),
        other => bail!("Unexpected reply to GET_TRENDS: {:?}", other),
    }
}

async fn handle_trends(
    router: &RouterHandle,
    top: Option<usize>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<i32> {
    let trends = fetch_trends(router).await?;
    let total_jobs = router.count().await?;

    let mut trend_report = TrendReport::new(trends, total_jobs);
    if let Some(n) = top {
        trend_report.truncate(n);
    }

    let rendered = match format {
        OutputFormat::Json => report::generate_json_report(&trend_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&trend_report),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(0)
}

async fn handle_sync(router: &RouterHandle, quiet: bool) -> Result<i32> {
    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .context("Invalid spinner template")?,
        );
        pb.set_message("Syncing trends...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let reply = router
        .dispatch(Message::SyncToSkillos(None))
        .await?
        .reply()
        .await?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match reply {
        Some(Reply::Sync(outcome)) if outcome.success => {
            println!("✅ Trends synced.");
            Ok(0)
        }
        Some(Reply::Sync(outcome)) => {
            eprintln!(
                "❌ Sync failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            Ok(1)
        }
        other => bail!("Unexpected reply to SYNC_TO_SKILLOS: {:?}", other),
    }
}

async fn handle_status(router: &RouterHandle, settings: &SettingsStore) -> Result<i32> {
    let trends = fetch_trends(router).await?;
    let count = router.count().await?;
    let endpoint = settings.api_url().await?;

    println!("{}", analysis::generate_summary_text(&trends, count, 5));
    println!();
    println!("Badge: {:?}", badge_text(count));
    println!(
        "Sync endpoint: {}",
        endpoint.as_deref().unwrap_or("(not configured)")
    );
    Ok(0)
}

async fn handle_set_url(settings: &SettingsStore, url: Option<String>, unset: bool) -> Result<i32> {
    match url {
        Some(url) if !unset => {
            settings.set_api_url(&url).await?;
            println!("✅ Sync endpoint set to {}", url);
        }
        _ => {
            settings.clear_api_url().await?;
            println!("✅ Sync endpoint removed.");
        }
    }
    Ok(0)
}

/// Message bus mode: one JSON message per stdin line, replies on stdout.
async fn serve(router: RouterHandle, badge: &MemoryBadge, config: &Config) -> Result<i32> {
    let sweeper = spawn_sweeper(router.clone(), config.sweep_interval());
    info!(
        "Serving messages on stdin, sweeping every {} minutes",
        config.retention.sweep_interval_minutes
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<JoinHandle<()>> = Vec::new();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Rejected message: {}", e);
                continue;
            }
        };

        let dispatch = match router.dispatch_value(value).await {
            Ok(dispatch) => dispatch,
            Err(e) if e.is_closed() => return Err(e.into()),
            Err(e) => {
                warn!("Rejected message: {}", e);
                continue;
            }
        };

        match dispatch {
            Dispatch::Pending(rx) => pending.push(tokio::spawn(async move {
                match rx.await {
                    Ok(reply) => match serde_json::to_string(&reply) {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!("Failed to encode reply: {}", e),
                    },
                    Err(_) => warn!("Reply channel closed before a reply was sent"),
                }
            })),
            Dispatch::Done | Dispatch::Ignored => {}
        }

        pending.retain(|task| !task.is_finished());
    }

    info!("Input closed, waiting for {} pending replies", pending.len());
    for task in pending {
        let _ = task.await;
    }
    sweeper.abort();
    info!("Stopped with badge {:?}", badge.text());
    Ok(0)
}
