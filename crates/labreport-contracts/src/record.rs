//! The final structured record handed to the output sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    lab::ClassifiedRow,
    reasoning::{ReasoningResult, RepairReport},
};

/// Short identifier for one processed document.
///
/// The first eight hex digits of a v4 UUID: readable in file names and
/// support conversations, unique enough for a single operator's reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    pub report_id: ReportId,
    pub patient_name: String,
    pub generated_at: DateTime<Utc>,
    /// Classified rows in document order, duplicates included.
    pub rows: Vec<ClassifiedRow>,
    pub severity_score: u32,
    pub reasoning: ReasoningResult,
    pub repairs: RepairReport,
}
