//! Document store collaborators.
//!
//! The pipeline reads raw articles through [`ArticleSource`] and writes
//! rewritten articles through [`ArticleSink`]. Two backends ship with the
//! crate:
//!
//! - [`json::JsonStore`]: one JSON array file per collection in a data directory
//! - [`memory::MemoryStore`]: in-process collections, used by tests and dry runs

use crate::error::PersistenceError;
use crate::models::{RawArticle, RewrittenArticle};
use async_trait::async_trait;
use rand::{Rng, rng};
use std::collections::HashSet;

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Read side: the raw collection filled by ingestion.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Every raw article, in stored order.
    async fn load_raw(&self) -> Result<Vec<RawArticle>, PersistenceError>;

    /// Set `processed = true` on the raw article keyed by `link`.
    async fn mark_processed(&self, link: &str) -> Result<(), PersistenceError>;
}

/// Write side: the rewritten collection.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Store `article` and return its newly assigned id.
    async fn append(&self, article: &RewrittenArticle) -> Result<String, PersistenceError>;

    /// Titles recorded in the rewritten collection, both the new headline and
    /// the original title of each article.
    async fn rewritten_titles(&self) -> Result<HashSet<String>, PersistenceError>;
}

/// A random 20-character hex document id.
pub(crate) fn new_document_id() -> String {
    let mut r = rng();
    (0..20)
        .map(|_| char::from_digit(r.random_range(0..16u32), 16).unwrap_or('0'))
        .collect()
}
