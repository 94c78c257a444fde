//! URL discovery in raw and JSON-structured QR payloads
//!
//! Payloads are first tried as JSON. Objects and arrays are walked with an
//! explicit work stack so hostile nesting cannot grow the call stack; every
//! string leaf is scanned. Anything else (invalid JSON, bare scalars) is
//! scanned as plain text.
//!
//! The extractor is a heuristic: it will happily swallow trailing punctuation
//! or stop inside an unusual query string, but it does not miss well-formed
//! `http(s)://`, `ftp://`, `file://`, `www.` or `ftp.` URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

/// Deduplicated URLs discovered during one run, in stable lexical order.
pub type UrlSet = BTreeSet<String>;

static RE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:(?:https?|ftp|file)://|www\.|ftp\.)(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[-A-Z0-9+&@#/%=~_|$?!:,.])*(?:\([-A-Z0-9+&@#/%=~_|$?!:,.]*\)|[A-Z0-9+&@#/%=~_|$])"#,
    )
    .unwrap()
});

/// Every URL-like substring of `text`, left to right, non-overlapping.
pub fn extract_urls(text: &str) -> impl Iterator<Item = &str> {
    RE_URL.find_iter(text).map(|m| m.as_str())
}

/// Render `value` safe for display: `.` becomes `[.]` and `:` becomes `[:]`.
pub fn defang(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 4);
    for c in value.chars() {
        match c {
            '.' => out.push_str("[.]"),
            ':' => out.push_str("[:]"),
            other => out.push(other),
        }
    }
    out
}

/// Accumulates URLs found across any number of payloads.
#[derive(Debug, Default, Clone)]
pub struct UrlDiscoverer {
    urls: UrlSet,
}

impl UrlDiscoverer {
    /// Create an empty discoverer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one payload and add every URL it contains.
    pub fn discover(&mut self, payload: &str) {
        match serde_json::from_str::<Value>(payload) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => self.walk(value),
            _ => self.extract(payload),
        }
    }

    /// Add every URL in `text` without any JSON interpretation.
    pub fn extract(&mut self, text: &str) {
        for url in extract_urls(text) {
            if !self.urls.contains(url) {
                self.urls.insert(url.to_string());
            }
        }
    }

    fn walk(&mut self, root: Value) {
        let mut stack = vec![root];
        while let Some(value) = stack.pop() {
            match value {
                Value::Object(map) => {
                    let children: Vec<Value> = map.into_iter().map(|(_, v)| v).collect();
                    stack.extend(children.into_iter().rev());
                }
                Value::Array(items) => stack.extend(items.into_iter().rev()),
                Value::String(text) => self.extract(&text),
                Value::Null | Value::Bool(_) | Value::Number(_) => {}
            }
        }
    }

    /// The accumulated set. Each entry is logged de-fanged for review.
    pub fn urls(&self) -> &UrlSet {
        tracing::info!("Extracted information:");
        for url in &self.urls {
            tracing::info!("{}", defang(url));
        }
        &self.urls
    }

    /// Consume the discoverer, returning the accumulated set.
    pub fn into_urls(self) -> UrlSet {
        self.urls
    }

    /// Number of distinct URLs found so far.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether nothing has been found yet.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
