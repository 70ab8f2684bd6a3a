//! Command-line interface definitions for the news rewriter.
//!
//! Every option can also come from an environment variable. Options that are
//! given override the matching key of the YAML config file.

use crate::config::{DedupMode, Language, RewriteConfig, Style};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one rewrite run.
///
/// # Examples
///
/// ```sh
/// # Defaults: Dutch, normal style, 3 articles from ./data
/// news_rewriter
///
/// # English, technical, 5 articles, 3 at a time
/// news_rewriter --language english --style technical --batch-size 5 --concurrency 3
///
/// # Config file plus a one-off override
/// news_rewriter -c config.yaml --dedup title-set
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "NEWS_REWRITER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the collection JSON files
    #[arg(short, long, env = "NEWS_REWRITER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub style: Option<Style>,

    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Articles per run (1-10)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Articles transformed at once (1-16); pacing only applies at 1
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Delay between articles in sequential mode, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// How already-processed raw articles are recognized
    #[arg(long, value_enum)]
    pub dedup: Option<DedupMode>,

    /// Number of tags per article (1-5)
    #[arg(long)]
    pub num_tags: Option<usize>,

    /// Maximum title length in characters (50-300)
    #[arg(long)]
    pub max_title_length: Option<usize>,

    /// Collection receiving rewritten articles
    #[arg(long, env = "NEWS_REWRITER_COLLECTION")]
    pub collection_name: Option<String>,

    /// Store rewritten bodies as plain text instead of HTML
    #[arg(long)]
    pub plain_text: bool,

    /// Generate an illustration per article when an image provider is available
    #[arg(long)]
    pub images: bool,
}

impl Cli {
    /// Overwrite the config keys that were given on the command line.
    pub fn apply_to(&self, config: &mut RewriteConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(style) = self.style {
            config.style = style;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(k) = self.concurrency {
            config.concurrency = k;
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing_ms = ms;
        }
        if let Some(mode) = self.dedup {
            config.dedup = mode;
        }
        if let Some(n) = self.num_tags {
            config.num_tags = n;
        }
        if let Some(n) = self.max_title_length {
            config.max_title_length = n;
        }
        if let Some(name) = &self.collection_name {
            config.collection_name = name.clone();
        }
        if self.plain_text {
            config.html_formatting = false;
        }
        if self.images {
            config.generate_images = true;
        }
    }
}
