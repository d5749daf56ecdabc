//! Parsing of list-valued recipe columns.
//!
//! Exports of the recipe table are not consistent about how lists are
//! written. A cell may hold:
//! - a JSON array: `["salt", "pepper"]`
//! - a Python list repr: `['salt', 'pepper']`
//! - `|`-separated values: `salt|pepper`
//! - a single plain value

use once_cell::sync::Lazy;
use regex::Regex;

static PY_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});

/// Parse a list cell. Commas are kept inside items.
pub fn parse_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return vec![];
    }

    if raw.starts_with('[') && raw.ends_with(']') {
        return parse_bracketed(raw);
    }

    if raw.contains('|') {
        return split_on(raw, '|');
    }

    vec![raw.to_string()]
}

/// Parse a keyword cell. Plain values are additionally split on commas.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let items = parse_list(raw);

    match items.as_slice() {
        [single] if single.contains(',') && !raw.trim_start().starts_with('[') => {
            split_on(single, ',')
        }
        _ => items,
    }
}

/// Parse an instructions cell. A single block of text is split into lines.
pub fn parse_instructions(raw: &str) -> Vec<String> {
    let items = parse_list(raw);

    match items.as_slice() {
        [single] if single.contains('\n') => single
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        _ => items,
    }
}

fn split_on(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bracketed(raw: &str) -> Vec<String> {
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        return values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .filter(|item| !item.is_empty())
            .collect();
    }

    PY_STRING
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| unescape(m.as_str()).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
