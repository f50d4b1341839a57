//! Row normalization and range classification ("Model 1").
//!
//! Each `RawField` becomes exactly one `ClassifiedRow`, in order. Anything
//! the classifier cannot interpret degrades to `Unknown` with the row kept;
//! nothing here fails.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use labreport_catalog::ReferenceCatalog;
use labreport_contracts::lab::{ClassifiedRow, RawField, TestKey, TestStatus};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+\.?[0-9]*").unwrap());

/// The first decimal or integer token in `raw`, if any.
///
/// `"<0.5"` yields `0.5`, `"14,500"` yields `14`, `"n/a"` yields `None`.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let token = NUMBER.find(raw)?.as_str();
    token.trim_end_matches('.').parse().ok()
}

/// Classify a value against the catalog range for `key`.
///
/// A missing key, a key without a range, or a missing value is `Unknown`.
pub fn classify(catalog: &ReferenceCatalog, key: Option<&TestKey>, value: Option<f64>) -> TestStatus {
    match (key.and_then(|k| catalog.range(k)), value) {
        (Some(range), Some(v)) => range.classify(v),
        _ => TestStatus::Unknown,
    }
}

/// Canonicalize, coerce and classify a single field.
pub fn classify_field(catalog: &ReferenceCatalog, field: &RawField) -> ClassifiedRow {
    let key = catalog.canonicalize(&field.test_name);
    let value = coerce_numeric(&field.value);
    let status = classify(catalog, key.as_ref(), value);

    debug!(
        test_name = %field.test_name,
        key = key.as_ref().map(TestKey::as_str).unwrap_or("-"),
        ?value,
        %status,
        "field classified"
    );

    ClassifiedRow {
        test_name: field.test_name.clone(),
        value,
        unit: field.unit.clone(),
        status,
    }
}

/// Classify every field, preserving order and duplicates.
pub fn classify_rows(catalog: &ReferenceCatalog, fields: &[RawField]) -> Vec<ClassifiedRow> {
    fields.iter().map(|f| classify_field(catalog, f)).collect()
}
