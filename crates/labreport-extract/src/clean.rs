//! Noise removal for document text.
//!
//! PDF and OCR text is full of form feeds, table rules and bullet glyphs.
//! `clean` removes them and collapses every run of two or more whitespace
//! characters, line breaks included, into one space. A lone line break
//! survives and is what the field extractor segments rows on. The transform
//! is idempotent.

use std::sync::LazyLock;

use regex::Regex;

static TABLE_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[|•·]+").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip form feeds and bullet noise, collapse whitespace runs, and trim.
pub fn clean(text: &str) -> String {
    let text = text.replace('\x0c', "");
    let text = TABLE_NOISE.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}
