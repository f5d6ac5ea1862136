#![forbid(unsafe_code)]

//! `inapp-dispatch`: replays recorded event scripts through the in-app
//! message pipeline.
//!
//! Loads configuration and a workspace snapshot, wires the pipeline with
//! logging collaborators, feeds the script, then waits for pending delays
//! before shutting down.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use inapp_dispatch::app::{Collaborators, InAppMessaging};
use inapp_dispatch::config::GlobalConfig;
use inapp_dispatch::evaluation::reference::HiddenAwareEvaluator;
use inapp_dispatch::models::workspace::Workspace;
use inapp_dispatch::platform::ui_thread::spawn_ui_loop;
use inapp_dispatch::platform::workspace::SnapshotWorkspaceFetcher;
use inapp_dispatch::replay::{
    self, ForegroundActivity, LogTracker, LogUriOpener, LogViewFactory, SessionUserManager,
};
use inapp_dispatch::storage::{InMemoryHiddenStorage, InMemoryImpressionStorage};
use inapp_dispatch::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "inapp-dispatch",
    about = "In-app message pipeline replay runner",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workspace snapshot (JSON); overrides `workspace_path` from the config.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Event script (JSON lines).
    #[arg(long)]
    events: PathBuf,

    /// Longest time to wait for pending delays after the script ends.
    #[arg(long, default_value_t = 30)]
    max_wait_seconds: u64,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("inapp-dispatch replay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };

    let workspace_path = args
        .workspace
        .clone()
        .or_else(|| config.workspace_path.clone())
        .ok_or_else(|| AppError::Config("no workspace given".into()))?;
    let workspace = Workspace::load_from_path(&workspace_path)?;
    info!(
        path = %workspace_path.display(),
        in_app_messages = workspace.in_app_messages.len(),
        "workspace loaded"
    );

    // ── Wire collaborators ──────────────────────────────
    let ct = CancellationToken::new();
    let (ui_dispatcher, ui_handle) = spawn_ui_loop(ct.clone());

    let hidden_storage = Arc::new(InMemoryHiddenStorage::default());
    let impression_storage = Arc::new(InMemoryImpressionStorage::new(
        config.impression.max_records_per_message,
    ));
    let mut evaluator = HiddenAwareEvaluator::new(hidden_storage.clone());
    if let Some(cap) = config.impression.frequency_cap {
        evaluator = evaluator.with_frequency_cap(impression_storage.clone(), cap);
    }
    let users = Arc::new(SessionUserManager::default());
    let tracker = Arc::new(LogTracker::default());

    let messaging = InAppMessaging::start(
        &config,
        Collaborators {
            workspace_fetcher: Arc::new(SnapshotWorkspaceFetcher::new(workspace)),
            activity_provider: Arc::new(ForegroundActivity::new("ReplayActivity")),
            user_manager: users.clone(),
            evaluator: Arc::new(evaluator),
            tracker: tracker.clone(),
            uri_opener: Arc::new(LogUriOpener),
            view_factory: Arc::new(LogViewFactory),
            ui_dispatcher: Arc::new(ui_dispatcher),
            hidden_storage,
            impression_storage,
        },
    )?;

    // ── Replay ──────────────────────────────────────────
    let script = File::open(&args.events)
        .map_err(|err| AppError::Io(format!("cannot open event script: {err}")))?;
    let summary = replay::replay(&messaging, &users, BufReader::new(script)).await?;
    info!(events = summary.events, clicks = summary.clicks, "script replayed");

    // ── Drain pending delays ────────────────────────────
    let deadline = Instant::now() + Duration::from_secs(args.max_wait_seconds);
    while messaging.delay_manager().pending_count() > 0 {
        if Instant::now() >= deadline {
            warn!(
                pending = messaging.delay_manager().pending_count(),
                "gave up waiting for pending delays"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    messaging.shutdown().await;
    ct.cancel();
    let _ = ui_handle.await;
    info!(tracked = tracker.tracked(), "replay finished");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
