//! # News Rewriter
//!
//! Rewrites ingested news articles through a language model into a target
//! style and language, classifies and tags them, and stores the results so
//! that each source article is processed at most once.
//!
//! ## Features
//!
//! - Ordered fallback across OpenAI-compatible providers (DeepSeek, Groq,
//!   Together, a local Ollama, OpenAI) with an outer retry for transient errors
//! - Chunked rewriting of long bodies, title synthesis, categorization and
//!   tagging, each with a deterministic fallback
//! - Deduplicated work selection by processed flag or by rewritten titles
//! - Bounded batches with pacing or bounded concurrency, and cancellation
//! - Write-then-mark persistence to JSON collection files
//!
//! ## Architecture
//!
//! Data flows one way:
//! 1. **Selection**: [`selector::WorkSelector`] picks unprocessed articles
//! 2. **Transformation**: [`transformer::TextTransformer`] calls the
//!    [`providers::ProviderChain`]
//! 3. **Persistence**: [`writer::PersistenceWriter`] stores, then marks
//!
//! [`runner::BatchRunner`] drives the three for one batch.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod retry;
pub mod runner;
pub mod selector;
pub mod store;
pub mod transformer;
pub mod utils;
pub mod writer;

pub use config::RewriteConfig;
pub use error::{ConfigError, PersistenceError, ProviderError, ValidationError};
pub use models::{Degraded, RawArticle, RewrittenArticle};
pub use providers::{Provider, ProviderChain};
pub use runner::{BatchReport, BatchRunner};
