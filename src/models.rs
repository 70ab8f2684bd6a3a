//! Data models for raw and rewritten articles.
//!
//! - [`RawArticle`]: an ingested article, keyed by its source link
//! - [`RewrittenArticle`]: the transformed article written to the target collection
//! - [`Degraded`]: which parts of a rewrite came from a deterministic fallback
//!
//! Serialized field names follow the document layout the ingestion side
//! already uses (`link`, `full_text`, `published`, `timestamp`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw news article as stored by the ingestion collaborator.
///
/// The pipeline treats it as read-only except for the `processed` flag, which
/// is set once a rewritten counterpart has been stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticle {
    /// The article's source URL; unique key of the raw collection.
    /// Empty when the stored document has no usable `link`.
    pub source_link: String,
    pub title: String,
    pub body: String,
    pub published_at: String,
    pub processed: bool,
}

impl RawArticle {
    /// Read one ingested document leniently.
    ///
    /// Missing, `null` or non-string fields read as empty. The text comes from
    /// `full_text`, falling back to `body` when `full_text` is absent or blank.
    pub fn from_document(doc: &Value) -> Self {
        let text = |key: &str| doc.get(key).and_then(Value::as_str).unwrap_or_default();
        let body = match text("full_text") {
            full if !full.trim().is_empty() => full,
            _ => text("body"),
        };
        Self {
            source_link: text("link").trim().to_string(),
            title: text("title").to_string(),
            body: body.to_string(),
            published_at: text("published").to_string(),
            processed: doc.get("processed").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// Which sub-steps of a rewrite fell back to deterministic output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degraded {
    pub title: bool,
    pub category: bool,
    pub tags: bool,
    pub body: bool,
}

impl Degraded {
    pub fn any(&self) -> bool {
        self.title || self.category || self.tags || self.body
    }
}

/// A fully rewritten article, ready for the target collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewrittenArticle {
    pub title: String,
    #[serde(rename = "full_text")]
    pub body: String,
    pub summary: String,
    pub category: String,
    pub tags: Vec<String>,
    pub original_title: String,
    pub original_link: String,
    pub published: String,
    pub language: String,
    pub style: String,
    #[serde(rename = "timestamp")]
    pub created_at: String,
    pub image_url: Option<String>,
    pub slug: String,
    pub url: String,
    /// Producer tag identifying this pipeline as the writer.
    pub source: String,
    #[serde(default)]
    pub degraded: Degraded,
}

impl RewrittenArticle {
    /// Host of the original article, e.g. `"nu"` for `https://www.nu.nl/...`.
    pub fn source_tag(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.original_link).ok()?;
        let host = parsed.host_str()?;
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() >= 2 {
            Some(parts[parts.len() - 2].to_string())
        } else {
            None
        }
    }
}
