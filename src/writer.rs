//! Write-then-mark persistence of rewritten articles.

use crate::error::PersistenceError;
use crate::models::RewrittenArticle;
use crate::store::{ArticleSink, ArticleSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Stores a rewritten article, then marks its source processed.
///
/// The two steps are not atomic. When the mark fails after a successful
/// write, the rewritten article exists but its source will be selected again
/// on the next run; the error is [`PersistenceError::MarkFailed`] and carries
/// the stored id so the duplicate can be traced. Consumers key rewritten
/// articles by `original_link`.
#[derive(Clone)]
pub struct PersistenceWriter {
    sink: Arc<dyn ArticleSink>,
    source: Arc<dyn ArticleSource>,
    timeout: Duration,
}

impl PersistenceWriter {
    pub fn new(sink: Arc<dyn ArticleSink>, source: Arc<dyn ArticleSource>, timeout: Duration) -> Self {
        Self {
            sink,
            source,
            timeout,
        }
    }

    #[instrument(level = "info", skip_all, fields(link = %source_link))]
    pub async fn write(
        &self,
        article: &RewrittenArticle,
        source_link: &str,
    ) -> Result<String, PersistenceError> {
        let id = self.bounded(self.sink.append(article)).await?;

        if let Err(e) = self.bounded(self.source.mark_processed(source_link)).await {
            error!(%id, error = %e, "Stored rewritten article but failed to mark source processed");
            return Err(PersistenceError::MarkFailed {
                id,
                link: source_link.to_string(),
                source: Box::new(e),
            });
        }

        let source = article.source_tag().unwrap_or_else(|| "unknown".to_string());
        info!(
            %id,
            %source,
            category = %article.category,
            "Stored rewritten article"
        );
        Ok(id)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, PersistenceError>>,
    ) -> Result<T, PersistenceError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PersistenceError::Timeout(self.timeout))?
    }
}
