//! Cleaning and screening of raw model output.

use thiserror::Error;

pub const MAX_OUTPUT_CHARS: usize = 300;
const MAX_OUTPUT_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("contains banned pattern {0:?}")] Banned(String),
    #[error("too short ({0} chars)")] TooShort(usize),
    #[error("too long ({0} chars)")] TooLong(usize),
}

/// Banned substrings (matched case-insensitively) plus inclusive length bounds in chars.
#[derive(Debug, Clone)]
pub struct QualityPolicy {
    pub banned: Vec<String>,
    pub min_len: usize,
    pub max_len: usize,
}

impl QualityPolicy {
    pub fn new<S: Into<String>>(banned: impl IntoIterator<Item = S>, min_len: usize, max_len: usize) -> Self {
        Self { banned: banned.into_iter().map(|s| s.into().to_lowercase()).collect(), min_len, max_len }
    }

    pub fn response_default() -> Self {
        Self::new(
            ["the first thing", "how to", "let's talk about", "(source)", "source)", "wikipedia", "according to"],
            20,
            500,
        )
    }

    pub fn reasoning_default() -> Self {
        Self::new(
            ["the first thing", "how to", "let's talk", "(source)", "source)", "wikipedia", "according to"],
            10,
            200,
        )
    }

    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        let lower = text.to_lowercase();
        if let Some(pattern) = self.banned.iter().find(|p| lower.contains(p.as_str())) {
            return Err(Rejection::Banned(pattern.clone()));
        }
        let len = text.chars().count();
        if len < self.min_len {
            return Err(Rejection::TooShort(len));
        }
        if len > self.max_len {
            return Err(Rejection::TooLong(len));
        }
        Ok(())
    }
}

/// Trim, drop one layer of matching quotes, keep the first two non-empty lines, cap the length.
pub fn clean_output(raw: &str) -> String {
    let text = strip_quotes(raw.trim()).trim();
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(MAX_OUTPUT_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, MAX_OUTPUT_CHARS).trim_end().to_string()
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
