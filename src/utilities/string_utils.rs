//! String utility functions.

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trim `text` and make sure it ends with a period.
///
/// Returns `None` when nothing is left after trimming.
pub fn ensure_period(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with('.') {
        Some(trimmed.to_string())
    } else {
        Some(format!("{}.", trimmed))
    }
}

/// Split free text into period-terminated sentences.
///
/// Sentences end at any run of `.`, `!` or `?`. Internal whitespace is
/// collapsed and empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_BOUNDARY
        .split(text)
        .filter_map(|piece| {
            let collapsed = WHITESPACE_RUN.replace_all(piece, " ");
            ensure_period(&collapsed)
        })
        .collect()
}
