//! Run configuration.
//!
//! A single [`RewriteConfig`] value is loaded once (YAML file, then CLI
//! overrides), validated, and handed to every component constructor. Nothing
//! reads configuration from ambient state after startup.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Writing register requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Style {
    #[serde(alias = "technical")]
    Technical,
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "easy")]
    Easy,
}

/// Target language of the rewritten article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    #[serde(alias = "dutch")]
    Dutch,
    #[serde(alias = "english")]
    English,
    #[serde(alias = "german")]
    German,
}

/// How already-processed raw articles are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupMode {
    /// Skip raw articles whose title already appears among rewritten titles.
    TitleSet,
    /// Skip raw articles whose `processed` flag is set.
    ProcessedFlag,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Technical => "technical",
            Style::Normal => "normal",
            Style::Easy => "easy",
        }
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Dutch => "dutch",
            Language::English => "english",
            Language::German => "german",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupMode::TitleSet => f.write_str("title-set"),
            DedupMode::ProcessedFlag => f.write_str("processed-flag"),
        }
    }
}

pub const SENTINEL_BODY: &str = "Full text not found.";

/// Everything a rewrite run needs to know.
///
/// Field names match the keys accepted in `config.yaml`; every key is
/// optional and falls back to [`RewriteConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub style: Style,
    pub language: Language,
    pub html_formatting: bool,
    pub max_title_length: usize,
    pub num_tags: usize,
    pub batch_size: usize,
    /// Collection receiving rewritten articles.
    pub collection_name: String,
    /// Collection holding raw ingested articles.
    pub source_collection: String,
    pub dedup: DedupMode,
    /// Maximum number of articles transformed at once.
    pub concurrency: usize,
    /// Delay between items in sequential mode.
    pub pacing_ms: u64,
    /// Characters per rewrite call.
    pub chunk_size: usize,
    pub request_timeout_secs: u64,
    pub store_timeout_secs: u64,
    /// Titles containing any of these markers are never rewritten.
    pub exclusion_markers: Vec<String>,
    pub generate_images: bool,
    pub site_base_url: String,
    pub data_dir: PathBuf,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            style: Style::Normal,
            language: Language::Dutch,
            html_formatting: true,
            max_title_length: 160,
            num_tags: 3,
            batch_size: 3,
            collection_name: "HetNieuws_Rewritten".to_string(),
            source_collection: "HetNieuws_Raw".to_string(),
            dedup: DedupMode::ProcessedFlag,
            concurrency: 1,
            pacing_ms: 3_000,
            chunk_size: 512,
            request_timeout_secs: 30,
            store_timeout_secs: 30,
            exclusion_markers: vec!["Video |".to_string(), "NU+ |".to_string()],
            generate_images: false,
            site_base_url: "https://hetnieuws.app".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl RewriteConfig {
    /// Load configuration from a YAML file, or defaults when no path is given.
    ///
    /// The result is not validated yet; callers apply overrides first and then
    /// call [`RewriteConfig::validate`].
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_title_length", self.max_title_length, 50, 300)?;
        check_range("num_tags", self.num_tags, 1, 5)?;
        check_range("batch_size", self.batch_size, 1, 10)?;
        check_range("concurrency", self.concurrency, 1, 16)?;
        check_range("chunk_size", self.chunk_size, 64, 8_192)?;
        check_range("request_timeout_secs", secs(self.request_timeout_secs), 1, 30)?;
        check_range("store_timeout_secs", secs(self.store_timeout_secs), 1, 300)?;
        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::Empty("collection_name"));
        }
        if self.source_collection.trim().is_empty() {
            return Err(ConfigError::Empty("source_collection"));
        }
        if self.source_collection.trim() == self.collection_name.trim() {
            return Err(ConfigError::SameCollection(self.collection_name.clone()));
        }
        url::Url::parse(&self.site_base_url)?;
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

fn secs(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn check_range(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RewriteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_tags, 3);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_title_length, 160);
        assert_eq!(config.dedup, DedupMode::ProcessedFlag);
        assert_eq!(config.pacing(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
style: Technical
language: english
num_tags: 5
dedup: title-set
exclusion_markers: ["LIVE |"]
"#;
        let config = RewriteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.style, Style::Technical);
        assert_eq!(config.language, Language::English);
        assert_eq!(config.num_tags, 5);
        assert_eq!(config.dedup, DedupMode::TitleSet);
        assert_eq!(config.exclusion_markers, vec!["LIVE |".to_string()]);
        assert_eq!(config.collection_name, "HetNieuws_Rewritten");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut config = RewriteConfig::default();
        config.max_title_length = 40;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "max_title_length",
                ..
            })
        ));

        let mut config = RewriteConfig::default();
        config.num_tags = 6;
        assert!(config.validate().is_err());

        let mut config = RewriteConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RewriteConfig::default();
        config.batch_size = 10;
        config.max_title_length = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_collection_name_is_rejected() {
        let mut config = RewriteConfig::default();
        config.collection_name = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Empty("collection_name"))
        ));
    }

    #[test]
    fn test_timeouts_must_be_positive_and_bounded() {
        let mut config = RewriteConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "request_timeout_secs",
                ..
            })
        ));

        config.request_timeout_secs = 31;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "request_timeout_secs",
                value: 31,
                ..
            })
        ));

        config.request_timeout_secs = 1;
        assert!(config.validate().is_ok());

        config.store_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "store_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_source_and_target_collections_must_differ() {
        let mut config = RewriteConfig::default();
        config.source_collection = config.collection_name.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SameCollection(_))
        ));

        config.source_collection = format!(" {} ", config.collection_name);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_style_fails_to_parse() {
        assert!(RewriteConfig::from_yaml("style: Fancy").is_err());
    }

    #[test]
    fn test_load_without_path_returns_defaults() {
        let config = RewriteConfig::load(None).unwrap();
        assert_eq!(config, RewriteConfig::default());
    }
}
