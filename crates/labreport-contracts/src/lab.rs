//! Lab value types flowing from extraction through classification.
//!
//! `RawField` is what the extractor pulls out of document text. It is
//! converted one-to-one into `ClassifiedRow` and then discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One test-name/value tuple recognized in document text.
///
/// Every field is kept as the literal text that matched; interpretation is
/// left to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub test_name: String,
    pub value: String,
    pub unit: Option<String>,
    /// Bracketed marker printed next to the value by some labs, e.g. `[H]`.
    pub flag: Option<String>,
    pub ref_low: Option<String>,
    pub ref_high: Option<String>,
}

impl RawField {
    /// A field with only a name and a value, as produced by hand-entered rows.
    pub fn new(test_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            value: value.into(),
            unit: None,
            flag: None,
            ref_low: None,
            ref_high: None,
        }
    }
}

/// Canonical identifier for a lab test, e.g. `TestKey("hemoglobin")`.
///
/// The set of valid keys is fixed by the loaded reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestKey(pub String);

impl TestKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed `[low, high]` interval of normal values for one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Classify `value` against this range. Both bounds count as Normal.
    pub fn classify(&self, value: f64) -> TestStatus {
        if value < self.low {
            TestStatus::Low
        } else if value > self.high {
            TestStatus::High
        } else {
            TestStatus::Normal
        }
    }
}

/// Classification outcome for a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    Low,
    Normal,
    High,
    Unknown,
}

impl TestStatus {
    /// True for `Low` and `High`, the statuses that feed reasoning.
    pub fn is_abnormal(self) -> bool {
        matches!(self, TestStatus::Low | TestStatus::High)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Low => "Low",
            TestStatus::Normal => "Normal",
            TestStatus::High => "High",
            TestStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw field after canonicalization, numeric coercion and classification.
///
/// `test_name` is the name as it appeared in the document, not the
/// canonical key. Duplicates by name are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub test_name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub status: TestStatus,
}

/// Abnormal rows keyed by test name, in first-seen order.
///
/// When a name repeats, the entry keeps its original position but takes the
/// status of the latest occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbnormalFindings {
    entries: Vec<(String, TestStatus)>,
}

impl AbnormalFindings {
    /// Collect the `Low`/`High` rows of `rows`.
    pub fn from_rows(rows: &[ClassifiedRow]) -> Self {
        let mut findings = Self::default();
        for row in rows.iter().filter(|r| r.status.is_abnormal()) {
            findings.insert(row.test_name.clone(), row.status);
        }
        findings
    }

    pub fn insert(&mut self, test_name: String, status: TestStatus) {
        match self.entries.iter_mut().find(|(name, _)| *name == test_name) {
            Some(entry) => entry.1 = status,
            None => self.entries.push((test_name, status)),
        }
    }

    pub fn get(&self, test_name: &str) -> Option<TestStatus> {
        self.entries
            .iter()
            .find(|(name, _)| name == test_name)
            .map(|(_, status)| *status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TestStatus)> {
        self.entries.iter().map(|(name, status)| (name.as_str(), *status))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
