//! In-process store.

use super::{ArticleSink, ArticleSource, new_document_id};
use crate::error::PersistenceError;
use crate::models::{RawArticle, RewrittenArticle};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Both collections held in memory.
///
/// Writes and marks can be made to fail for specific source links, which is
/// how tests exercise the writer's partial-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: RwLock<Vec<RawArticle>>,
    rewritten: RwLock<Vec<(String, RewrittenArticle)>>,
    fail_append_for: RwLock<HashSet<String>>,
    fail_mark_for: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(raw: Vec<RawArticle>) -> Self {
        Self {
            raw: RwLock::new(raw),
            ..Self::default()
        }
    }

    /// Make `append` fail for articles whose `original_link` is `link`.
    pub async fn fail_append_for(&self, link: &str) {
        self.fail_append_for.write().await.insert(link.to_string());
    }

    /// Make `mark_processed(link)` fail.
    pub async fn fail_mark_for(&self, link: &str) {
        self.fail_mark_for.write().await.insert(link.to_string());
    }

    /// Make every call fail as if the backing service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn raw(&self) -> Vec<RawArticle> {
        self.raw.read().await.clone()
    }

    pub async fn rewritten(&self) -> Vec<(String, RewrittenArticle)> {
        self.rewritten.read().await.clone()
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ArticleSource for MemoryStore {
    async fn load_raw(&self) -> Result<Vec<RawArticle>, PersistenceError> {
        self.check_available()?;
        Ok(self.raw.read().await.clone())
    }

    async fn mark_processed(&self, link: &str) -> Result<(), PersistenceError> {
        self.check_available()?;
        if self.fail_mark_for.read().await.contains(link) {
            return Err(PersistenceError::Unavailable(format!("mark rejected for {link}")));
        }
        let mut raw = self.raw.write().await;
        let article = raw
            .iter_mut()
            .find(|a| a.source_link == link)
            .ok_or_else(|| PersistenceError::NotFound(link.to_string()))?;
        article.processed = true;
        Ok(())
    }
}

#[async_trait]
impl ArticleSink for MemoryStore {
    async fn append(&self, article: &RewrittenArticle) -> Result<String, PersistenceError> {
        self.check_available()?;
        if self.fail_append_for.read().await.contains(&article.original_link) {
            return Err(PersistenceError::Unavailable(format!(
                "append rejected for {}",
                article.original_link
            )));
        }
        let id = new_document_id();
        self.rewritten.write().await.push((id.clone(), article.clone()));
        Ok(id)
    }

    async fn rewritten_titles(&self) -> Result<HashSet<String>, PersistenceError> {
        self.check_available()?;
        Ok(self
            .rewritten
            .read()
            .await
            .iter()
            .flat_map(|(_, a)| [a.title.clone(), a.original_title.clone()])
            .filter(|t| !t.is_empty())
            .collect())
    }
}
