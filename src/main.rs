//! # News Rewriter
//!
//! Runs one rewrite batch against the JSON collections in the data directory.
//!
//! ## Usage
//!
//! ```sh
//! DEEPSEEK_API_KEY=... news_rewriter -c config.yaml
//! ```
//!
//! Press Ctrl-C to stop starting new articles; articles in flight are still
//! stored and marked.

use clap::Parser;
use news_rewriter::cli::Cli;
use news_rewriter::config::RewriteConfig;
use news_rewriter::providers::{ProviderChain, default_descriptors};
use news_rewriter::retry::Retrying;
use news_rewriter::runner::BatchRunner;
use news_rewriter::store::JsonStore;
use news_rewriter::utils::ensure_writable_dir;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

const PROVIDER_RETRIES: usize = 2;
const PROVIDER_RETRY_BASE: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_rewriter starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Configuration: file, then CLI overrides, then validation ---
    let mut config = RewriteConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;
    info!(
        style = %config.style,
        language = %config.language,
        dedup = %config.dedup,
        batch_size = config.batch_size,
        concurrency = config.concurrency,
        collection = %config.collection_name,
        "Configuration ready"
    );

    // Early check: ensure the data dir is writable
    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            path = %config.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e as Box<dyn Error>);
    }

    // --- Providers ---
    let chain = ProviderChain::discover(&default_descriptors(), config.request_timeout()).await?;
    info!(providers = ?chain.names(), "Provider chain ready");
    let provider = Arc::new(Retrying::new(chain, PROVIDER_RETRIES, PROVIDER_RETRY_BASE));

    // --- Store ---
    let store = Arc::new(JsonStore::new(
        &config.data_dir,
        &config.source_collection,
        &config.collection_name,
    ));
    info!(
        raw = %store.raw_path().display(),
        rewritten = %store.rewritten_path().display(),
        "Using JSON collections"
    );

    // --- Cancellation ---
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing articles in flight");
            let _ = cancel_tx.send(true);
        }
    });

    // ---- Run one batch ----
    let runner = BatchRunner::new(&config, provider, store.clone(), store).with_cancellation(cancel_rx);
    let report = runner.run().await?;

    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        report = %serde_json::to_string(&report)?,
        "news_rewriter finished"
    );

    Ok(())
}
