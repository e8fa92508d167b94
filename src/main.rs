#![forbid(unsafe_code)]

//! `insta-unfurl`: Slack bridge server binary.
//!
//! Bootstraps configuration, starts the HTTP transport, and runs the queue
//! worker that feeds delivery batches back through the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use insta_unfurl::dispatch::Dispatcher;
use insta_unfurl::extract::Extractor;
use insta_unfurl::fetch::{build_http_client, HttpFetcher};
use insta_unfurl::http;
use insta_unfurl::queue::consumer::QueueConsumer;
use insta_unfurl::queue::memory::MemoryQueue;
use insta_unfurl::slack::client::SlackPoster;
use insta_unfurl::state::AppState;
use insta_unfurl::{AppError, GlobalConfig, Result};

/// Deliveries handed to one dispatcher invocation.
const QUEUE_BATCH_SIZE: usize = 10;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "insta-unfurl", about = "Slack bridge that expands Instagram posts", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Falls back to `CONFIG_JSON`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("insta-unfurl server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = load_config(args.config.as_deref())?;
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!(teams = config.slack_teams.len(), "configuration loaded");

    // ── Build shared application state ──────────────────
    let client = build_http_client(&config)?;
    let extractor = Extractor::new()?;
    let queue = Arc::new(MemoryQueue::new(config.queue_url.clone()));

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        queue: Arc::clone(&queue) as _,
        source: Arc::new(HttpFetcher::new(client.clone(), extractor, &config)),
        sink: Arc::new(SlackPoster::new(client, &config.slack_api_url)?),
    });

    let consumer = QueueConsumer::new(
        Arc::clone(&queue) as _,
        Arc::clone(&state) as _,
        config.max_lag(),
    );
    let dispatcher = Arc::new(Dispatcher::new(state, consumer));

    // ── Start transport and worker ──────────────────────
    let ct = CancellationToken::new();
    let listener = http::bind(config.http_port).await?;

    let http_ct = ct.clone();
    let http_dispatcher = Arc::clone(&dispatcher);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(listener, http_dispatcher, http_ct).await {
            error!(%err, "http transport failed");
        }
    });

    let worker_handle = tokio::spawn(run_queue_worker(queue, dispatcher, ct.clone()));

    info!(port = config.http_port, "insta-unfurl ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = tokio::join!(http_handle, worker_handle);
    info!("insta-unfurl shut down");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<GlobalConfig> {
    if let Some(path) = path {
        return GlobalConfig::load_from_path(path);
    }
    match std::env::var("CONFIG_JSON") {
        Ok(raw) => GlobalConfig::from_json_str(&raw),
        Err(_) => Err(AppError::Config(
            "no configuration: pass --config or set CONFIG_JSON".into(),
        )),
    }
}

/// Receive delivery batches and hand each one to the dispatcher as a
/// queue invocation, until cancelled.
async fn run_queue_worker(
    queue: Arc<MemoryQueue>,
    dispatcher: Arc<Dispatcher>,
    ct: CancellationToken,
) {
    info!("queue worker started");
    loop {
        let batch = tokio::select! {
            () = ct.cancelled() => break,
            batch = queue.receive_batch(QUEUE_BATCH_SIZE) => batch,
        };

        let payload = match serde_json::to_vec(&batch) {
            Ok(payload) => payload,
            Err(err) => {
                error!(%err, "failed to encode queue batch");
                continue;
            }
        };

        if let Err(err) = dispatcher.dispatch(&payload).await {
            warn!(%err, "queue batch rejected by dispatcher");
        }
    }
    info!(in_flight = queue.in_flight_count(), "queue worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
