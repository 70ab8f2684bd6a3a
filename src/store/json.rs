//! JSON-file document store.
//!
//! Each collection is one JSON array in the data directory:
//!
//! ```text
//! data_dir/
//! ├── HetNieuws_Raw.json         # written by ingestion, `processed` set here
//! └── HetNieuws_Rewritten.json   # appended to by the pipeline
//! ```
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the
//! collection, so readers never see a half-written array. A process-wide lock
//! serializes read-modify-write cycles within this store.

use super::{ArticleSink, ArticleSource, new_document_id};
use crate::error::PersistenceError;
use crate::models::{RawArticle, RewrittenArticle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// A rewritten article as stored, with its assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: String,
    #[serde(flatten)]
    pub article: RewrittenArticle,
}

#[derive(Debug)]
pub struct JsonStore {
    raw_path: PathBuf,
    rewritten_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(data_dir: &Path, source_collection: &str, target_collection: &str) -> Self {
        Self {
            raw_path: data_dir.join(format!("{source_collection}.json")),
            rewritten_path: data_dir.join(format!("{target_collection}.json")),
            lock: Mutex::new(()),
        }
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn rewritten_path(&self) -> &Path {
        &self.rewritten_path
    }

    /// Every stored rewritten article, in insertion order.
    pub async fn load_rewritten(&self) -> Result<Vec<StoredArticle>, PersistenceError> {
        read_array(&self.rewritten_path).await
    }
}

/// Read a JSON array; a missing file is an empty collection.
async fn read_array<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    match fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Collection file missing; treating as empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_array<T: Serialize>(path: &Path, items: &[T]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ArticleSource for JsonStore {
    #[instrument(level = "info", skip_all, fields(path = %self.raw_path.display()))]
    async fn load_raw(&self) -> Result<Vec<RawArticle>, PersistenceError> {
        // Per-record decoding keeps one malformed document from failing the batch.
        let docs: Vec<Value> = read_array(&self.raw_path).await?;
        let articles: Vec<RawArticle> = docs
            .iter()
            .map(|doc| {
                if !doc.is_object() {
                    warn!(record = %doc, "Raw record is not a document");
                }
                RawArticle::from_document(doc)
            })
            .collect();
        info!(count = articles.len(), "Loaded raw articles");
        Ok(articles)
    }

    async fn mark_processed(&self, link: &str) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        // Untyped so fields owned by ingestion survive the rewrite.
        let mut docs: Vec<Value> = read_array(&self.raw_path).await?;
        let doc = docs
            .iter_mut()
            .find(|d| d.get("link").and_then(Value::as_str) == Some(link))
            .ok_or_else(|| PersistenceError::NotFound(link.to_string()))?;
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("processed".to_string(), Value::Bool(true));
        }
        write_array(&self.raw_path, &docs).await?;
        debug!(%link, "Marked raw article processed");
        Ok(())
    }
}

#[async_trait]
impl ArticleSink for JsonStore {
    async fn append(&self, article: &RewrittenArticle) -> Result<String, PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load_rewritten().await?;
        let id = new_document_id();
        docs.push(StoredArticle {
            id: id.clone(),
            article: article.clone(),
        });
        write_array(&self.rewritten_path, &docs).await?;
        debug!(%id, total = docs.len(), "Appended rewritten article");
        Ok(id)
    }

    async fn rewritten_titles(&self) -> Result<HashSet<String>, PersistenceError> {
        let docs = self.load_rewritten().await?;
        Ok(docs
            .into_iter()
            .flat_map(|d| [d.article.title, d.article.original_title])
            .filter(|t| !t.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Degraded;
    use tempfile::TempDir;

    fn rewritten(title: &str, original_title: &str, link: &str) -> RewrittenArticle {
        RewrittenArticle {
            title: title.to_string(),
            body: "<p>Tekst</p>".to_string(),
            summary: "Tekst".to_string(),
            category: "Nieuws".to_string(),
            tags: vec!["Nederland".to_string()],
            original_title: original_title.to_string(),
            original_link: link.to_string(),
            published: String::new(),
            language: "dutch".to_string(),
            style: "normal".to_string(),
            created_at: "2024-01-01 12:00:00".to_string(),
            image_url: None,
            slug: "titel".to_string(),
            url: "https://hetnieuws.app/category/nieuws/titel.html".to_string(),
            source: "news-rewriter".to_string(),
            degraded: Degraded::default(),
        }
    }

    async fn seed_raw(dir: &TempDir) -> JsonStore {
        let raw = r#"[
            {"link": "https://www.nu.nl/1", "title": "Een", "full_text": "tekst", "published": "2024-01-01", "feed": "nu"},
            {"link": "https://www.nu.nl/2", "title": "Twee", "body": "tekst", "processed": false}
        ]"#;
        fs::write(dir.path().join("Raw.json"), raw).await.unwrap();
        JsonStore::new(dir.path(), "Raw", "Rewritten")
    }

    #[tokio::test]
    async fn test_missing_collections_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "Raw", "Rewritten");
        assert!(store.load_raw().await.unwrap().is_empty());
        assert!(store.rewritten_titles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_processed_keeps_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let store = seed_raw(&dir).await;

        store.mark_processed("https://www.nu.nl/1").await.unwrap();

        let raw = store.load_raw().await.unwrap();
        assert!(raw[0].processed);
        assert!(!raw[1].processed);
        assert_eq!(raw[0].body, "tekst");

        let docs: Vec<Value> =
            serde_json::from_slice(&fs::read(store.raw_path()).await.unwrap()).unwrap();
        assert_eq!(docs[0]["feed"], "nu");
        assert!(!store.raw_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_mark_processed_unknown_link() {
        let dir = TempDir::new().unwrap();
        let store = seed_raw(&dir).await;
        let err = store.mark_processed("https://elders.nl/x").await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_append_assigns_ids_and_records_titles() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "Raw", "Rewritten");

        let a = store
            .append(&rewritten("Nieuwe kop", "Een", "https://www.nu.nl/1"))
            .await
            .unwrap();
        let b = store
            .append(&rewritten("Andere kop", "Twee", "https://www.nu.nl/2"))
            .await
            .unwrap();
        assert_ne!(a, b);

        let stored = store.load_rewritten().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, a);
        assert_eq!(stored[1].article.original_link, "https://www.nu.nl/2");

        let titles = store.rewritten_titles().await.unwrap();
        for t in ["Nieuwe kop", "Een", "Andere kop", "Twee"] {
            assert!(titles.contains(t), "missing {t}");
        }
    }

    #[tokio::test]
    async fn test_irregular_records_do_not_fail_the_load() {
        let dir = TempDir::new().unwrap();
        let raw = r#"[
            {"link": "https://www.nu.nl/1", "title": "Een", "body": "kort", "full_text": "lange tekst"},
            {"title": "Zonder link", "body": "tekst"},
            {"link": "https://www.nu.nl/3", "title": null, "body": "tekst", "published": null}
        ]"#;
        fs::write(dir.path().join("Raw.json"), raw).await.unwrap();
        let store = JsonStore::new(dir.path(), "Raw", "Rewritten");

        let articles = store.load_raw().await.unwrap();
        assert_eq!(articles.len(), 3);

        assert_eq!(articles[0].body, "lange tekst");
        assert_eq!(articles[0].title, "Een");

        assert_eq!(articles[1].source_link, "");
        assert_eq!(articles[1].title, "Zonder link");

        assert_eq!(articles[2].source_link, "https://www.nu.nl/3");
        assert_eq!(articles[2].title, "");
        assert_eq!(articles[2].published_at, "");

        // The linkless record is counted as skipped, the rest are selected.
        let selection = crate::selector::WorkSelector::new(Vec::new(), 10)
            .select(articles, &crate::selector::ProcessedFlagDedup);
        assert_eq!(selection.batch.len(), 2);
        assert_eq!(selection.skipped, 1);
    }

    #[tokio::test]
    async fn test_corrupt_collection_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Raw.json"), "{not json").await.unwrap();
        let store = JsonStore::new(dir.path(), "Raw", "Rewritten");
        assert!(matches!(
            store.load_raw().await,
            Err(PersistenceError::Serialization(_))
        ));
    }
}
