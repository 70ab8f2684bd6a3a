//! Light HTML structure for rewritten bodies.

use crate::utils::char_len;
use once_cell::sync::Lazy;
use regex::Regex;

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

/// Remove every `<img ...>` tag the model may have echoed from the source.
pub fn strip_images(text: &str) -> String {
    IMG_TAG.replace_all(text, "").into_owned()
}

/// Wrap the paragraphs of `text` in `<h2>`, `<h3>` and `<p>` elements.
///
/// Paragraphs are the non-empty trimmed lines. A short first paragraph becomes
/// the heading, and a short paragraph at every third position becomes a
/// subheading. An empty spacer entry follows every even paragraph after the
/// first. Text without any paragraph is returned unchanged.
///
/// Applying this twice wraps the tags again; callers format exactly once.
pub fn segment_html(text: &str) -> String {
    let paragraphs: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        return text.to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(paragraphs.len() * 3 / 2);
    for (i, paragraph) in paragraphs.iter().enumerate() {
        let len = char_len(paragraph);
        if i == 0 && len < 100 {
            out.push(format!("<h2>{paragraph}</h2>"));
        } else if i % 3 == 0 && len < 80 {
            out.push(format!("<h3>{paragraph}</h3>"));
        } else {
            out.push(format!("<p>{paragraph}</p>"));
        }

        if i > 0 && i % 2 == 0 {
            out.push(String::new());
        }
    }
    out.join("\n\n")
}
