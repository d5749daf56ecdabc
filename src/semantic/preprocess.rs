//! Query text preprocessing for embedding generation.
//!
//! Normalizes a free-text search query before it is embedded:
//! 1. Lowercase
//! 2. Drop digit runs
//! 3. Drop punctuation and underscores
//! 4. Collapse whitespace

use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Clean and normalize query text for semantic search.
///
/// Returns an empty string for empty input or when nothing but digits,
/// punctuation and whitespace was given.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.to_lowercase();
    let text = DIGITS.replace_all(&text, "");
    let text = NON_WORD.replace_all(&text, "");
    let text = UNDERSCORES.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");

    text.trim().to_string()
}
