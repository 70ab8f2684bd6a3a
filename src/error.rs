//! Error taxonomy for the rewrite pipeline.
//!
//! Errors are contained at the smallest scope that has a fallback:
//!
//! - [`ProviderError`] triggers fallback to the next provider in the chain and,
//!   once the chain is exhausted, a deterministic transformer fallback.
//! - [`ValidationError`] describes malformed model output; the transformer
//!   substitutes defaults and never lets it escape.
//! - [`PersistenceError`] is the only error that reaches the batch runner, as a
//!   per-item outcome.
//! - [`ConfigError`] is raised while loading or validating configuration.

use crate::providers::Capability;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("provider {provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: Capability,
    },

    #[error("no eligible provider supports {0}")]
    NoEligibleProvider(Capability),

    #[error("all providers exhausted for {capability}; last error: {last}")]
    AllProvidersExhausted {
        capability: Capability,
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether repeating the same call later could succeed.
    ///
    /// Content problems (empty or malformed bodies) are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status { code, .. } => *code == 429 || *code >= 500,
            ProviderError::AllProvidersExhausted { last, .. } => last.is_transient(),
            ProviderError::MalformedBody(_)
            | ProviderError::EmptyContent
            | ProviderError::Unsupported { .. }
            | ProviderError::NoEligibleProvider(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::MalformedBody(e.to_string())
        } else if e.is_timeout() {
            ProviderError::Timeout(Duration::ZERO)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {expected} tags, model returned {got}")]
    TagCount { expected: usize, got: usize },

    #[error("model returned an empty {0}")]
    Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no source article with link {0}")]
    NotFound(String),

    #[error("stored {id} but failed to mark {link} processed: {source}")]
    MarkFailed {
        id: String,
        link: String,
        #[source]
        source: Box<PersistenceError>,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: usize,
        max: usize,
        value: usize,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("source_collection and collection_name must differ, both are {0:?}")]
    SameCollection(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid site base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
