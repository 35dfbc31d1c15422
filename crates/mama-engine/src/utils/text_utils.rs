//! Text helpers shared by the classifier and the context selector

use std::borrow::Cow;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").expect("static regex");
}

/// Ellipsis appended to truncated excerpts
pub const ELLIPSIS: &str = "...";

pub struct TextUtils;

impl TextUtils {
    /// Lowercase, trim and collapse runs of whitespace into a single space
    pub fn normalize_query(text: &str) -> String {
        Self::normalize_whitespace(text.trim()).to_lowercase()
    }

    /// Normalize whitespace efficiently
    pub fn normalize_whitespace(text: &str) -> Cow<'_, str> {
        if WHITESPACE_REGEX.is_match(text) {
            Cow::Owned(WHITESPACE_REGEX.replace_all(text, " ").trim().to_string())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Count words (no allocation)
    pub fn count_words(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Whitespace tokens with surrounding punctuation stripped ("it?" -> "it")
    pub fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
        text.split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| !word.is_empty())
    }

    /// First `max_chars` characters of `text`, char-boundary safe
    pub fn take_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }

    /// Keep the first `max_chars` characters and append [`ELLIPSIS`] when
    /// anything was cut. The marker is not counted against `max_chars`.
    pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
        let head = Self::take_chars(text, max_chars);
        if head.len() == text.len() {
            Cow::Borrowed(text)
        } else {
            let mut result = String::with_capacity(head.len() + ELLIPSIS.len());
            result.push_str(head);
            result.push_str(ELLIPSIS);
            Cow::Owned(result)
        }
    }

    /// True when `word` occurs directly before or after a space.
    ///
    /// A plain substring check, so "item" counts for "it" when preceded by a
    /// space.
    pub fn has_space_adjacent(text: &str, word: &str) -> bool {
        text.match_indices(word).any(|(idx, _)| {
            text[..idx].ends_with(' ') || text[idx + word.len()..].starts_with(' ')
        })
    }
}
