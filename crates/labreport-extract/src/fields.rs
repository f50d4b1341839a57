//! Keyword-gated lab field extraction.
//!
//! Extraction runs in three stages so each can be tested on its own:
//!
//! 1. **Segment**: cleaned text is split on the line breaks that survive
//!    cleaning. A line holding only a label that ends in `:` or `-` is
//!    joined to the next line, so a value wrapped below its name is kept.
//! 2. **Gate**: every candidate span the field pattern finds on a line is
//!    checked against the catalog keywords. Spans naming no known test are
//!    dropped. This is the only precision control: unlisted synonyms are
//!    missed rather than unrelated numbers being picked up.
//! 3. **Parse**: accepted spans are split into name, value, flag, unit and
//!    reference range.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use labreport_catalog::ReferenceCatalog;
use labreport_contracts::lab::RawField;

/// `name` + separator + `value` + optional `[flag]` + optional unit + optional `low - high`.
static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)",
        r"(?P<name>[A-Za-z0-9()\- +./%]+?)",
        r"\s*[:\- ]\s*",
        r"(?P<value>[0-9]+\.?[0-9]*)",
        r"\s*",
        r"(?P<flag>\[[A-Za-z]\])?",
        r"\s*",
        r"(?P<unit>[A-Za-z/%0-9^.\-µ]+)?",
        r"\s*",
        r"(?P<range>[0-9]+\.?[0-9]*\s*[-–]\s*[0-9]+\.?[0-9]*)?",
    ))
    .unwrap()
});

/// Extract every keyword-gated lab field from already-cleaned text.
///
/// Returns an empty vector when nothing passes the gate; deciding whether
/// that halts the run is the caller's business.
pub fn extract_fields(cleaned: &str, catalog: &ReferenceCatalog) -> Vec<RawField> {
    let mut fields = Vec::new();
    let mut candidates = 0usize;

    for line in segment_rows(cleaned) {
        for caps in FIELD_PATTERN.captures_iter(&line) {
            candidates += 1;
            let name = caps.name("name").map_or("", |m| m.as_str());
            if !catalog.is_lab_name(name) {
                continue;
            }
            fields.push(parse_candidate(&caps));
        }
    }

    debug!(candidates, accepted = fields.len(), "field extraction complete");
    fields
}

/// Split cleaned text into candidate rows, folding dangling labels forward.
pub fn segment_rows(cleaned: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut pending: Option<String> = None;

    for line in cleaned.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = match pending.take() {
            Some(label) => format!("{label} {line}"),
            None => line.to_string(),
        };
        if is_dangling_label(&line) {
            pending = Some(line);
        } else {
            rows.push(line);
        }
    }
    rows.extend(pending);
    rows
}

fn is_dangling_label(line: &str) -> bool {
    line.ends_with([':', '-']) && !line.bytes().any(|b| b.is_ascii_digit())
}

fn parse_candidate(caps: &Captures<'_>) -> RawField {
    let text = |group: &str| caps.name(group).map(|m| m.as_str().to_string());

    let (ref_low, ref_high) = match caps.name("range") {
        Some(range) => split_range(range.as_str()),
        None => (None, None),
    };

    RawField {
        test_name: caps.name("name").map_or("", |m| m.as_str()).trim().to_string(),
        value: text("value").unwrap_or_default(),
        unit: text("unit"),
        flag: text("flag"),
        ref_low,
        ref_high,
    }
}

/// Split `"13.0 - 17.0"` into its bounds. Anything but exactly two parts
/// yields no bounds at all.
pub fn split_range(range: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = range.split(['-', '–']).map(str::trim).collect();
    match parts.as_slice() {
        [low, high] if !low.is_empty() && !high.is_empty() => {
            (Some((*low).to_string()), Some((*high).to_string()))
        }
        _ => (None, None),
    }
}
