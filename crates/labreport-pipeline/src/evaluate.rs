//! Offline evaluation of produced records against hand-labelled ground truth.
//!
//! Ground truth is a JSON array of [`TruthRow`], one per `(report_id,
//! test_name)`. Each truth row is joined to the first record row with the
//! same report id and test name; unmatched rows on either side are ignored.
//!
//! | metric               | per joined row                                   |
//! |----------------------|--------------------------------------------------|
//! | `value_accuracy`     | extracted value equals the labelled value        |
//! | `status_accuracy`    | status equals the labelled status                |
//! | `pattern_similarity` | Jaccard of lowercased record and truth patterns  |
//! | `risk_accuracy`      | record risk level equals the labelled level      |
//!
//! Every metric is the mean over joined rows, or 0.0 when nothing joined.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use labreport_contracts::{
    error::{LabReportError, LabReportResult},
    lab::TestStatus,
    reasoning::RiskLevel,
    record::LabReport,
};

const VALUE_TOLERANCE: f64 = 1e-9;

/// One labelled lab row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthRow {
    pub report_id: String,
    pub test_name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub status: Option<TestStatus>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub matched_rows: usize,
    pub value_accuracy: f64,
    pub status_accuracy: f64,
    pub pattern_similarity: f64,
    pub risk_accuracy: f64,
}

/// Jaccard similarity of two label sets, case-insensitive.
///
/// Both empty is 1.0; exactly one empty is 0.0.
pub fn jaccard_similarity(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<String> = a.iter().map(|s| s.to_lowercase()).collect();
    let b: HashSet<String> = b.iter().map(|s| s.to_lowercase()).collect();

    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let intersection = a.intersection(&b).count() as f64;
            let union = a.union(&b).count() as f64;
            intersection / union
        }
    }
}

/// Score `records` against `truth`.
pub fn evaluate(records: &[LabReport], truth: &[TruthRow]) -> EvaluationSummary {
    let mut matched = 0usize;
    let mut values = 0usize;
    let mut statuses = 0usize;
    let mut risks = 0usize;
    let mut similarity = 0.0;

    for expected in truth {
        let Some((record, row)) = records
            .iter()
            .filter(|r| r.report_id.0 == expected.report_id)
            .find_map(|r| {
                r.rows
                    .iter()
                    .find(|row| row.test_name == expected.test_name)
                    .map(|row| (r, row))
            })
        else {
            debug!(report_id = %expected.report_id, test_name = %expected.test_name, "truth row has no match");
            continue;
        };

        matched += 1;
        if values_match(row.value, expected.value) {
            values += 1;
        }
        if Some(row.status) == expected.status {
            statuses += 1;
        }
        if Some(record.reasoning.risk_level) == expected.risk_level {
            risks += 1;
        }
        similarity += jaccard_similarity(&record.reasoning.labels(), &expected.patterns);
    }

    let mean = |total: f64| if matched == 0 { 0.0 } else { total / matched as f64 };
    let summary = EvaluationSummary {
        matched_rows: matched,
        value_accuracy: mean(values as f64),
        status_accuracy: mean(statuses as f64),
        pattern_similarity: mean(similarity),
        risk_accuracy: mean(risks as f64),
    };

    info!(
        truth_rows = truth.len(),
        matched,
        value_accuracy = summary.value_accuracy,
        status_accuracy = summary.status_accuracy,
        pattern_similarity = summary.pattern_similarity,
        risk_accuracy = summary.risk_accuracy,
        "evaluation complete"
    );
    summary
}

fn values_match(actual: Option<f64>, expected: Option<f64>) -> bool {
    match (actual, expected) {
        (Some(a), Some(e)) => (a - e).abs() <= VALUE_TOLERANCE,
        (None, None) => true,
        _ => false,
    }
}

/// A truth file pre-filled with what the system produced, for hand correction.
pub fn truth_template(records: &[LabReport]) -> Vec<TruthRow> {
    records
        .iter()
        .flat_map(|record| {
            record.rows.iter().map(move |row| TruthRow {
                report_id: record.report_id.0.clone(),
                test_name: row.test_name.clone(),
                value: row.value,
                status: Some(row.status),
                patterns: record.reasoning.labels(),
                risk_level: Some(record.reasoning.risk_level),
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LabReport>),
    One(Box<LabReport>),
}

/// Load records from a JSON file holding one record or an array of them.
pub fn load_records(path: &Path) -> LabReportResult<Vec<LabReport>> {
    let records: OneOrMany = read_json(path, "records")?;
    Ok(match records {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![*record],
    })
}

/// Load a JSON array of [`TruthRow`].
pub fn load_truth(path: &Path) -> LabReportResult<Vec<TruthRow>> {
    read_json(path, "ground truth")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> LabReportResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| LabReportError::ConfigError {
        reason: format!("failed to read {} file '{}': {}", what, path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| LabReportError::ConfigError {
        reason: format!("failed to parse {} file '{}': {}", what, path.display(), e),
    })
}
