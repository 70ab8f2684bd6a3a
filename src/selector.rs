//! Selection of raw articles that still need a rewrite.

use crate::config::{DedupMode, RewriteConfig, SENTINEL_BODY};
use crate::models::RawArticle;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Decides whether a raw article was already rewritten.
pub trait DedupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_processed(&self, article: &RawArticle) -> bool;
}

/// Treats an article as processed when its title is already recorded in the
/// rewritten collection (see [`crate::store::ArticleSink::rewritten_titles`]).
#[derive(Debug, Clone, Default)]
pub struct TitleSetDedup {
    titles: HashSet<String>,
}

impl TitleSetDedup {
    pub fn new(titles: HashSet<String>) -> Self {
        Self { titles }
    }
}

impl DedupStrategy for TitleSetDedup {
    fn name(&self) -> &'static str {
        "title-set"
    }

    fn is_processed(&self, article: &RawArticle) -> bool {
        self.titles.contains(&article.title)
    }
}

/// Treats an article as processed when its `processed` flag is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessedFlagDedup;

impl DedupStrategy for ProcessedFlagDedup {
    fn name(&self) -> &'static str {
        "processed-flag"
    }

    fn is_processed(&self, article: &RawArticle) -> bool {
        article.processed
    }
}

/// Build the strategy configured by `mode`.
///
/// `rewritten_titles` is only consulted in title-set mode.
pub fn dedup_for(mode: DedupMode, rewritten_titles: HashSet<String>) -> Box<dyn DedupStrategy> {
    match mode {
        DedupMode::TitleSet => Box::new(TitleSetDedup::new(rewritten_titles)),
        DedupMode::ProcessedFlag => Box::new(ProcessedFlagDedup),
    }
}

/// Outcome of one selection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Articles to process now, in source order.
    pub batch: Vec<RawArticle>,
    /// Articles dropped for a missing link, an exclusion marker or an empty body.
    pub skipped: usize,
    pub already_processed: usize,
    /// Eligible articles left for later runs.
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct WorkSelector {
    exclusion_markers: Vec<String>,
    batch_size: usize,
}

impl WorkSelector {
    pub fn new(exclusion_markers: Vec<String>, batch_size: usize) -> Self {
        Self {
            exclusion_markers,
            batch_size,
        }
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        Self::new(config.exclusion_markers.clone(), config.batch_size)
    }

    fn is_excluded(&self, article: &RawArticle) -> bool {
        self.exclusion_markers
            .iter()
            .any(|marker| article.title.contains(marker.as_str()))
    }

    /// Pick at most `batch_size` unprocessed, non-excluded articles.
    ///
    /// Source order is kept. Nothing is mutated.
    #[instrument(level = "info", skip_all, fields(dedup = dedup.name(), total = raw.len()))]
    pub fn select(&self, raw: Vec<RawArticle>, dedup: &dyn DedupStrategy) -> Selection {
        let mut selection = Selection::default();
        let mut eligible = Vec::new();

        for article in raw {
            if article.source_link.is_empty() {
                warn!(title = %article.title, "Skipping raw record without a link");
                selection.skipped += 1;
                continue;
            }
            if dedup.is_processed(&article) {
                selection.already_processed += 1;
                continue;
            }
            if self.is_excluded(&article) {
                debug!(title = %article.title, "Skipping excluded article");
                selection.skipped += 1;
                continue;
            }
            if !has_body(&article) {
                debug!(link = %article.source_link, "Skipping article without full text");
                selection.skipped += 1;
                continue;
            }
            eligible.push(article);
        }

        let take = eligible.len().min(self.batch_size);
        selection.remaining = eligible.len() - take;
        eligible.truncate(take);
        selection.batch = eligible;

        info!(
            selected = selection.batch.len(),
            skipped = selection.skipped,
            already_processed = selection.already_processed,
            remaining = selection.remaining,
            "Selected work batch"
        );
        selection
    }
}

fn has_body(article: &RawArticle) -> bool {
    let body = article.body.trim();
    !body.is_empty() && body != SENTINEL_BODY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(n: usize, title: &str, body: &str, processed: bool) -> RawArticle {
        RawArticle {
            source_link: format!("https://www.nu.nl/{n}"),
            title: title.to_string(),
            body: body.to_string(),
            published_at: String::new(),
            processed,
        }
    }

    fn selector(batch_size: usize) -> WorkSelector {
        WorkSelector::from_config(&RewriteConfig {
            batch_size,
            ..RewriteConfig::default()
        })
    }

    #[test]
    fn test_processed_flag_excludes_processed() {
        let articles = vec![
            raw(1, "Een", "tekst", true),
            raw(2, "Twee", "tekst", false),
            raw(3, "Drie", "tekst", true),
            raw(4, "Vier", "tekst", false),
        ];
        let selection = selector(10).select(articles, &ProcessedFlagDedup);
        let links: Vec<&str> = selection.batch.iter().map(|a| a.source_link.as_str()).collect();
        assert_eq!(links, vec!["https://www.nu.nl/2", "https://www.nu.nl/4"]);
        assert!(selection.batch.iter().all(|a| !a.processed));
        assert_eq!(selection.already_processed, 2);
    }

    #[test]
    fn test_title_set_excludes_rewritten_titles() {
        let titles: HashSet<String> = ["Een".to_string(), "Drie".to_string()].into_iter().collect();
        let articles = vec![
            raw(1, "Een", "tekst", false),
            raw(2, "Twee", "tekst", false),
            raw(3, "Drie", "tekst", false),
        ];
        let dedup = TitleSetDedup::new(titles);
        let selection = selector(10).select(articles, &dedup);
        assert_eq!(selection.batch.len(), 1);
        assert_eq!(selection.batch[0].title, "Twee");
        assert_eq!(selection.already_processed, 2);
    }

    #[test]
    fn test_empty_and_sentinel_bodies_are_skipped() {
        let articles = vec![
            raw(1, "Leeg", "   ", false),
            raw(2, "Sentinel", SENTINEL_BODY, false),
            raw(3, "Goed", "echte tekst", false),
        ];
        let selection = selector(10).select(articles, &ProcessedFlagDedup);
        assert_eq!(selection.batch.len(), 1);
        assert_eq!(selection.batch[0].title, "Goed");
        assert_eq!(selection.skipped, 2);
    }

    #[test]
    fn test_records_without_link_are_skipped() {
        let mut linkless = raw(1, "Zonder link", "tekst", false);
        linkless.source_link = String::new();
        let articles = vec![linkless, raw(2, "Met link", "tekst", false)];
        let selection = selector(10).select(articles, &ProcessedFlagDedup);
        assert_eq!(selection.batch.len(), 1);
        assert_eq!(selection.batch[0].title, "Met link");
        assert_eq!(selection.skipped, 1);
        assert_eq!(selection.remaining, 0);
    }

    #[test]
    fn test_exclusion_markers() {
        let articles = vec![
            raw(1, "Video | Overstroming", "tekst", false),
            raw(2, "NU+ | Analyse", "tekst", false),
            raw(3, "Gewoon nieuws", "tekst", false),
        ];
        let selection = selector(10).select(articles, &ProcessedFlagDedup);
        assert_eq!(selection.batch.len(), 1);
        assert_eq!(selection.skipped, 2);
    }

    #[test]
    fn test_batch_is_truncated_in_source_order() {
        let articles: Vec<RawArticle> = (1..=5)
            .map(|n| raw(n, &format!("Artikel {n}"), "tekst", false))
            .collect();
        let selection = selector(3).select(articles, &ProcessedFlagDedup);
        let titles: Vec<&str> = selection.batch.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Artikel 1", "Artikel 2", "Artikel 3"]);
        assert_eq!(selection.remaining, 2);
    }

    #[test]
    fn test_dedup_for_mode() {
        assert_eq!(dedup_for(DedupMode::ProcessedFlag, HashSet::new()).name(), "processed-flag");
        let titles: HashSet<String> = ["X".to_string()].into_iter().collect();
        let dedup = dedup_for(DedupMode::TitleSet, titles);
        assert_eq!(dedup.name(), "title-set");
        assert!(dedup.is_processed(&raw(1, "X", "tekst", false)));
    }
}
