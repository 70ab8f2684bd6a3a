//! One rewrite batch: select, transform, persist.
//!
//! # Pipeline
//!
//! ```text
//! ArticleSource ──► WorkSelector ──► TextTransformer ──► PersistenceWriter
//!   (snapshot)       (≤ batch_size)    (≤ K in flight)     (write, then mark)
//! ```
//!
//! With `concurrency = 1` items run one after another with a pacing delay
//! between them. With `concurrency > 1` up to K items are in flight at once
//! and pacing is skipped.
//!
//! # Cancellation
//!
//! The runner watches a `bool` channel. Once it reads `true`, no new item
//! starts and a pending pacing delay ends early; items already in flight still
//! finish their write and mark.

use crate::config::{DedupMode, RewriteConfig};
use crate::error::PersistenceError;
use crate::models::RawArticle;
use crate::providers::Provider;
use crate::selector::{WorkSelector, dedup_for};
use crate::store::{ArticleSink, ArticleSource};
use crate::transformer::TextTransformer;
use crate::writer::PersistenceWriter;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items that were started.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Raw articles dropped by the selector's filters.
    pub skipped: usize,
    /// Succeeded items with at least one fallback value.
    pub degraded: usize,
    /// Selected items never started because of cancellation.
    pub cancelled: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stored { degraded: bool },
    Failed,
    Cancelled,
}

impl BatchReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Stored { degraded } => {
                self.attempted += 1;
                self.succeeded += 1;
                if degraded {
                    self.degraded += 1;
                }
            }
            Outcome::Failed => {
                self.attempted += 1;
                self.failed += 1;
            }
            Outcome::Cancelled => self.cancelled += 1,
        }
    }
}

pub struct BatchRunner {
    source: Arc<dyn ArticleSource>,
    sink: Arc<dyn ArticleSink>,
    selector: WorkSelector,
    transformer: TextTransformer,
    writer: PersistenceWriter,
    dedup: DedupMode,
    concurrency: usize,
    pacing: Duration,
    cancel: watch::Receiver<bool>,
}

impl BatchRunner {
    pub fn new(
        config: &RewriteConfig,
        provider: Arc<dyn Provider>,
        source: Arc<dyn ArticleSource>,
        sink: Arc<dyn ArticleSink>,
    ) -> Self {
        // A receiver whose sender is gone never reports cancellation.
        let (_never, cancel) = watch::channel(false);
        Self {
            selector: WorkSelector::from_config(config),
            transformer: TextTransformer::new(provider, config.clone()),
            writer: PersistenceWriter::new(sink.clone(), source.clone(), config.store_timeout()),
            source,
            sink,
            dedup: config.dedup,
            concurrency: config.concurrency.max(1),
            pacing: config.pacing(),
            cancel,
        }
    }

    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Run one batch to completion.
    ///
    /// Only a failure to read the collections fails the batch; every per-item
    /// failure is counted in the report.
    #[instrument(level = "info", skip_all, fields(dedup = %self.dedup, concurrency = self.concurrency))]
    pub async fn run(&self) -> Result<BatchReport, PersistenceError> {
        let t0 = Instant::now();

        let raw = self.source.load_raw().await?;
        let titles = match self.dedup {
            DedupMode::TitleSet => self.sink.rewritten_titles().await?,
            DedupMode::ProcessedFlag => HashSet::new(),
        };
        let dedup = dedup_for(self.dedup, titles);
        let selection = self.selector.select(raw, dedup.as_ref());

        let mut report = BatchReport {
            skipped: selection.skipped,
            ..BatchReport::default()
        };
        let batch = selection.batch;
        if batch.is_empty() {
            info!("Nothing to rewrite");
            return Ok(report);
        }
        let total = batch.len();

        if self.concurrency == 1 {
            for (i, article) in batch.into_iter().enumerate() {
                if self.is_cancelled() {
                    report.record(Outcome::Cancelled);
                    continue;
                }
                report.record(self.process(i, total, article).await);
                if i + 1 < total {
                    self.pause().await;
                }
            }
        } else {
            let outcomes: Vec<Outcome> = stream::iter(batch.into_iter().enumerate())
                .map(|(i, article)| async move {
                    if self.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    self.process(i, total, article).await
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
            for outcome in outcomes {
                report.record(outcome);
            }
        }

        if report.cancelled > 0 {
            warn!(cancelled = report.cancelled, "Batch cancelled before completion");
        }
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            degraded = report.degraded,
            "Completed rewrite batch"
        );
        Ok(report)
    }

    async fn process(&self, i: usize, total: usize, article: RawArticle) -> Outcome {
        info!(
            index = i + 1,
            total,
            title = %crate::utils::truncate_for_log(&article.title, 60),
            "Processing article"
        );
        let rewritten = self.transformer.transform(&article).await;
        let degraded = rewritten.degraded.any();

        match self.writer.write(&rewritten, &article.source_link).await {
            Ok(_) => Outcome::Stored { degraded },
            Err(e) => {
                error!(index = i + 1, link = %article.source_link, error = %e, "Failed to persist article");
                Outcome::Failed
            }
        }
    }

    /// Sleep for the pacing delay, waking early on cancellation.
    async fn pause(&self) {
        if self.pacing.is_zero() || self.is_cancelled() {
            return;
        }
        let mut cancel = self.cancel.clone();
        tokio::select! {
            _ = sleep(self.pacing) => {}
            Ok(()) = cancel.changed() => {}
        }
    }
}
