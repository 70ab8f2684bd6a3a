//! Text helpers shared by the transformer, the writer, and logging.
//!
//! All length limits in this crate count characters, never bytes, so that
//! Dutch and German text with diacritics is never cut inside a code point.

use crate::config::Language;
use chrono::{FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const ELLIPSIS: &str = "...";

/// Length of `s` in characters.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `max` characters of `s`.
pub fn take_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Bound `s` to `max` characters, marking the cut with `"..."`.
///
/// The result is never longer than `max` characters.
pub fn ellipsize(s: &str, max: usize) -> String {
    if char_len(s) <= max {
        return s.to_string();
    }
    if max <= ELLIPSIS.len() {
        return take_chars(s, max).to_string();
    }
    format!("{}{}", take_chars(s, max - ELLIPSIS.len()), ELLIPSIS)
}

/// A bounded prefix for a model prompt, suffixed with `"..."` when cut.
pub fn prompt_sample(s: &str, max: usize) -> String {
    if char_len(s) > max {
        format!("{}{}", take_chars(s, max), ELLIPSIS)
    } else {
        s.to_string()
    }
}

/// Split `s` into consecutive slices of at most `size` characters.
pub fn char_chunks(s: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let chunk = take_chars(rest, size);
        chunks.push(chunk);
        rest = &rest[chunk.len()..];
    }
    chunks
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with the number of dropped
/// bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = take_chars(s, max);
    if kept.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Summary shown in article listings: the first 300 characters of the body.
pub fn summarize(body: &str) -> String {
    prompt_sample(body, 300)
}

static SLUG_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());
static SLUG_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

static DUTCH_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "de", "het", "een", "en", "van", "in", "op", "te", "voor", "met", "is", "dat", "die",
        "niet", "aan", "er", "om", "ook", "als", "bij", "of", "naar", "uit", "nog", "over", "zijn",
        "wordt", "worden", "door", "maar", "dan", "wat", "tot", "ze", "hij", "zij", "we",
    ]
    .into_iter()
    .collect()
});

static ENGLISH_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "of", "in", "on", "to", "for", "with", "is", "that", "at", "by",
        "from", "as", "it", "be", "are", "was", "or", "but", "not", "this", "after", "over",
    ]
    .into_iter()
    .collect()
});

static GERMAN_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "der", "die", "das", "ein", "eine", "und", "von", "in", "im", "auf", "zu", "für", "mit",
        "ist", "den", "dem", "des", "nicht", "an", "als", "auch", "bei", "nach", "aus", "über",
        "wird", "werden", "sich", "oder", "aber",
    ]
    .into_iter()
    .collect()
});

fn stopwords(language: Language) -> &'static HashSet<&'static str> {
    match language {
        Language::Dutch => &*DUTCH_STOPWORDS,
        Language::English => &*ENGLISH_STOPWORDS,
        Language::German => &*GERMAN_STOPWORDS,
    }
}

/// Convert a title to a short URL slug made of its first four meaningful words.
///
/// Stop-words of the article language and bare numbers are dropped.
pub fn slugify_title(title: &str, language: Language) -> String {
    let stop = stopwords(language);
    let words: Vec<String> = title
        .replace(['\'', '’'], "")
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| !stop.contains(w.as_str()))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .take(4)
        .collect();
    let joined = words.join("-");
    let slug = SLUG_INVALID.replace_all(&joined, "-");
    let slug = SLUG_DASHES.replace_all(&slug, "-");
    slug.trim_matches('-').to_string()
}

/// Current time in the newsroom's UTC+02:00 offset, `YYYY-MM-DD HH:MM:SS`.
pub fn current_timestamp() -> String {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    Utc::now()
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Data directory is writable");
    Ok(())
}
