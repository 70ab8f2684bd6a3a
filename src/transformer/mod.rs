//! Article rewriting through the provider chain.
//!
//! [`TextTransformer::transform`] turns a [`RawArticle`] into a
//! [`RewrittenArticle`] with five independent model steps:
//!
//! 1. **Body**: the body is cut into fixed-size character chunks and each chunk
//!    is rewritten on its own, in order
//! 2. **Title**: synthesized from the start of the rewritten body
//! 3. **Category**: one word from the language vocabulary, from the original body
//! 4. **Tags**: exactly `num_tags` comma-separated tags, from the original body
//! 5. **Image** (optional): one image-capability call on the title
//!
//! Every step has a deterministic fallback. The transformer never fails; the
//! result's [`Degraded`] flags record which steps fell back.

use crate::config::RewriteConfig;
use crate::error::{ProviderError, ValidationError};
use crate::models::{Degraded, RawArticle, RewrittenArticle};
use crate::providers::{Capability, Provider, ProviderRequest};
use crate::utils::{
    char_chunks, current_timestamp, ellipsize, prompt_sample, slugify_title, summarize, take_chars,
    truncate_for_log,
};
use itertools::Itertools;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub mod html;
pub mod prompts;

pub use html::{segment_html, strip_images};

/// Producer tag stored on every rewritten article.
pub const SOURCE_TAG: &str = "news-rewriter";

const TITLE_SAMPLE_CHARS: usize = 500;
const TITLE_MAX_OUTPUT: usize = 50;
const CATEGORY_SAMPLE_CHARS: usize = 500;
const CATEGORY_MAX_OUTPUT: usize = 10;
const TAGS_SAMPLE_CHARS: usize = 300;
const TAGS_MAX_OUTPUT: usize = 50;
const URL_MAX_CHARS: usize = 300;

/// Failure of a single transformer step before its fallback is applied.
#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone)]
pub struct TextTransformer {
    provider: Arc<dyn Provider>,
    config: RewriteConfig,
}

impl TextTransformer {
    pub fn new(provider: Arc<dyn Provider>, config: RewriteConfig) -> Self {
        Self { provider, config }
    }

    /// Rewrite, title, categorize and tag one article.
    #[instrument(level = "info", skip_all, fields(link = %article.source_link))]
    pub async fn transform(&self, article: &RawArticle) -> RewrittenArticle {
        let t0 = Instant::now();
        let cfg = &self.config;
        let mut degraded = Degraded::default();

        let (rewritten, body_degraded) = self.rewrite_body(&article.body).await;
        degraded.body = body_degraded;
        let rewritten = strip_images(&rewritten);

        let title = match self.synthesize_title(&rewritten).await {
            Ok(title) => title,
            Err(e) => {
                warn!(error = %e, "Title synthesis failed; using first sentence");
                degraded.title = true;
                self.fallback_title(&rewritten, &article.title)
            }
        };

        let category = match self.categorize(&article.body).await {
            Ok(category) => category,
            Err(e) => {
                warn!(error = %e, "Categorization failed; using default category");
                degraded.category = true;
                prompts::default_category(cfg.language).to_string()
            }
        };

        let tags = match self.tag(&article.body).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "Tagging failed; using default tags");
                degraded.tags = true;
                prompts::default_tags(cfg.language)
                    .iter()
                    .take(cfg.num_tags)
                    .map(|t| t.to_string())
                    .collect()
            }
        };

        let image_url = if cfg.generate_images {
            self.illustrate(&title).await
        } else {
            None
        };

        let body = if cfg.html_formatting {
            segment_html(&rewritten)
        } else {
            rewritten
        };
        let summary = summarize(&body);
        let slug = slugify_title(&title, cfg.language);
        let url = format!(
            "{}/category/{}/{}.html",
            cfg.site_base_url.trim_end_matches('/'),
            category.to_lowercase(),
            slug
        );

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            title = %truncate_for_log(&title, 80),
            %category,
            degraded = degraded.any(),
            "Article transformed"
        );

        RewrittenArticle {
            title,
            body,
            summary,
            category,
            tags,
            original_title: article.title.clone(),
            original_link: article.source_link.clone(),
            published: article.published_at.clone(),
            language: cfg.language.as_str().to_string(),
            style: cfg.style.as_str().to_string(),
            created_at: current_timestamp(),
            image_url,
            slug,
            url: take_chars(&url, URL_MAX_CHARS).to_string(),
            source: SOURCE_TAG.to_string(),
            degraded,
        }
    }

    /// Rewrite `body` chunk by chunk; a failed chunk is kept verbatim.
    ///
    /// Returns the joined text and whether any chunk fell back.
    async fn rewrite_body(&self, body: &str) -> (String, bool) {
        let cfg = &self.config;
        let system = prompts::rewrite(cfg.style, cfg.language);
        let chunks = char_chunks(body, cfg.chunk_size);
        let total = chunks.len();
        let mut degraded = false;
        let mut parts: Vec<String> = Vec::with_capacity(total);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let request = ProviderRequest::text(&system, chunk, cfg.chunk_size);
            match self.provider.generate(&request).await {
                Ok(text) => {
                    debug!(chunk = i + 1, total, "Chunk rewritten");
                    parts.push(text);
                }
                Err(e) => {
                    warn!(chunk = i + 1, total, error = %e, "Chunk rewrite failed; keeping original text");
                    degraded = true;
                    parts.push(chunk.to_string());
                }
            }
        }

        (parts.join(" ").trim().to_string(), degraded)
    }

    async fn synthesize_title(&self, rewritten: &str) -> Result<String, StepError> {
        let cfg = &self.config;
        let system = prompts::title(cfg.language, cfg.max_title_length);
        let sample = prompt_sample(rewritten, TITLE_SAMPLE_CHARS);
        let raw = self
            .provider
            .generate(&ProviderRequest::text(&system, &sample, TITLE_MAX_OUTPUT))
            .await?;

        let title = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("title").into());
        }
        Ok(ellipsize(title, cfg.max_title_length))
    }

    /// The first sentence of the rewritten body, or the source title when the
    /// body has none.
    fn fallback_title(&self, rewritten: &str, original_title: &str) -> String {
        let first_sentence = rewritten.split('.').next().unwrap_or_default().trim();
        let title = if first_sentence.is_empty() {
            original_title.trim()
        } else {
            first_sentence
        };
        ellipsize(title, self.config.max_title_length)
    }

    async fn categorize(&self, original: &str) -> Result<String, StepError> {
        let language = self.config.language;
        let system = prompts::category(language);
        let raw = self
            .provider
            .generate(&ProviderRequest::text(
                &system,
                take_chars(original, CATEGORY_SAMPLE_CHARS),
                CATEGORY_MAX_OUTPUT,
            ))
            .await?;

        let category = parse_category(&raw)?;
        if !prompts::categories(language)
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&category))
        {
            info!(%category, %language, "Category outside the vocabulary; keeping model answer");
        }
        Ok(category)
    }

    async fn tag(&self, original: &str) -> Result<Vec<String>, StepError> {
        let cfg = &self.config;
        let system = prompts::tags(cfg.language, cfg.num_tags);
        let raw = self
            .provider
            .generate(&ProviderRequest::text(
                &system,
                take_chars(original, TAGS_SAMPLE_CHARS),
                TAGS_MAX_OUTPUT,
            ))
            .await?;
        Ok(parse_tags(&raw, cfg.num_tags)?)
    }

    async fn illustrate(&self, title: &str) -> Option<String> {
        if !self.provider.supports(Capability::Image) {
            debug!("No image-capable provider; skipping illustration");
            return None;
        }
        match self.provider.generate(&ProviderRequest::image(title)).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "Image generation failed; continuing without image");
                None
            }
        }
    }
}

/// First word of the model answer, stripped of surrounding punctuation.
fn parse_category(raw: &str) -> Result<String, ValidationError> {
    raw.split_whitespace()
        .next()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::Empty("category"))
}

/// Split a comma-separated tag answer into exactly `count` distinct tags.
///
/// Duplicates are dropped case-insensitively keeping the first spelling, and
/// extra tags are cut. Fewer than `count` distinct tags is an error.
fn parse_tags(raw: &str, count: usize) -> Result<Vec<String>, ValidationError> {
    let tags: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().trim_matches(|c: char| matches!(c, '\'' | '"' | '.')).trim())
        .filter(|t| !t.is_empty())
        .unique_by(|t| t.to_lowercase())
        .take(count)
        .map(str::to_string)
        .collect();

    if tags.len() < count {
        return Err(ValidationError::TagCount {
            expected: count,
            got: tags.len(),
        });
    }
    Ok(tags)
}
