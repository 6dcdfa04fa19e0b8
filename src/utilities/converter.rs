//! Output converter for turning LLM text into structured JSON.
//!
//! Models are told to answer with a bare JSON object but routinely wrap it in
//! prose or markdown fences, leave trailing commas, or emit JavaScript-isms
//! such as `undefined`. Conversion is two-tier: a direct parse of the raw
//! text, then a salvage path that slices the outermost braces, runs a fixed
//! repair pass and parses again.
//!
//! Only the span from the first `{` to the last `}` is considered, so text
//! holding several top-level objects is not supported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:,\s*)+([}\]])").unwrap());
static BLANK_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\s+\}").unwrap());
static BLANK_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s+\]").unwrap());
static UNDEFINED_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bundefined\b").unwrap());
static MISSING_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*([,}])").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Error raised when LLM output cannot be turned into JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonRepairError {
    /// The text holds no `{ ... }` span at all.
    #[error("No JSON object found in response")]
    NoJsonObjectFound,

    /// The repaired span still failed to parse.
    #[error("Failed to parse JSON after repair: {message}")]
    RepairedParseFailed {
        /// Underlying parser message.
        message: String,
        /// The text that was handed to the parser, kept for diagnostics.
        repaired: String,
    },
}

/// Parse LLM output into a JSON value, repairing common malformations.
///
/// Well-formed JSON is returned exactly as a direct parse would return it.
/// Anything else goes through [`extract_object_span`] and [`repair_json`].
pub fn normalize(raw_text: &str) -> Result<Value, JsonRepairError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw_text) {
        return Ok(value);
    }

    let span = extract_object_span(raw_text).ok_or(JsonRepairError::NoJsonObjectFound)?;
    let repaired = repair_json(span);

    serde_json::from_str::<Value>(&repaired).map_err(|e| {
        log::debug!("Repaired JSON still invalid ({}): {}", e, repaired);
        JsonRepairError::RepairedParseFailed {
            message: e.to_string(),
            repaired,
        }
    })
}

/// Slice from the first `{` to the last `}` inclusive.
///
/// Returns `None` when either brace is missing or they are out of order.
pub fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Apply the fixed repair pass to near-valid JSON text.
///
/// Structural repairs (trailing commas, blank bodies, `undefined`, missing
/// values) only touch text outside string literals. Whitespace collapsing is
/// applied everywhere, which also turns raw newlines inside literals into
/// spaces. Applying the pass twice yields the same text as applying it once.
pub fn repair_json(text: &str) -> String {
    let structural = map_outside_strings(text, repair_structural);
    let flattened = structural.replace(['\r', '\n'], " ");
    WHITESPACE_RUN.replace_all(&flattened, " ").trim().to_string()
}

fn repair_structural(segment: &str) -> String {
    let step = TRAILING_COMMA.replace_all(segment, "$1");
    let step = BLANK_OBJECT.replace_all(&step, "{}");
    let step = BLANK_ARRAY.replace_all(&step, "[]");
    let step = UNDEFINED_VALUE.replace_all(&step, "null");
    MISSING_VALUE.replace_all(&step, ": null$1").into_owned()
}

/// Run `repair` over every segment of `text` that lies outside a string
/// literal, copying literals through untouched.
///
/// An unterminated literal runs to the end of the text.
fn map_outside_strings(text: &str, repair: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=idx]);
                segment_start = idx + 1;
            }
        } else if ch == '"' {
            out.push_str(&repair(&text[segment_start..idx]));
            segment_start = idx;
            in_string = true;
        }
    }

    let rest = &text[segment_start..];
    if in_string {
        out.push_str(rest);
    } else {
        out.push_str(&repair(rest));
    }
    out
}
