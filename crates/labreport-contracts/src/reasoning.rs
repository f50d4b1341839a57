//! Reasoning output types.
//!
//! `ReasoningResult` is the terminal artifact of the gateway. Every field is
//! guaranteed populated once the repair step has run, no matter what the
//! generator returned. `RepairReport` records how far the generator output
//! was from the wire contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Score at or below which a run is Low risk.
pub const LOW_RISK_MAX_SCORE: f64 = 20.0;
/// Score at or below which a run is Moderate risk.
pub const MODERATE_RISK_MAX_SCORE: f64 = 60.0;

/// A labeled observation with a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Named `pattern` on the wire to match the generator contract.
    #[serde(rename = "pattern")]
    pub label: String,
    pub confidence: f64,
}

impl Pattern {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Fixed vocabulary of overall risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    /// Placeholder used before a level has been derived.
    Unknown,
}

impl RiskLevel {
    /// Derive a level from a 0–100 risk score.
    ///
    /// `<= 20` is Low, `<= 60` is Moderate, anything above is High.
    pub fn from_score(score: f64) -> Self {
        if score <= LOW_RISK_MAX_SCORE {
            RiskLevel::Low
        } else if score <= MODERATE_RISK_MAX_SCORE {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    /// Read a level from free text, case-insensitively.
    ///
    /// Anything outside the vocabulary (including the empty string) maps to
    /// `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "moderate" | "medium" => RiskLevel::Moderate,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fully-populated reasoning output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Never empty.
    pub patterns: Vec<Pattern>,
    pub risk_level: RiskLevel,
    /// Always within `[0, 100]`.
    pub risk_score: f64,
    pub summary: String,
    /// One entry per pattern, or a single fallback line.
    pub recommendations: Vec<String>,
}

impl ReasoningResult {
    /// Pattern labels in order, as handed to the recommendation engine.
    pub fn labels(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.label.clone()).collect()
    }
}

/// A single correction applied to generator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    /// No JSON object could be extracted and parsed; the fallback was used.
    Unparseable,
    /// `patterns` was missing, empty, or had no usable entries.
    PatternsInjected,
    /// A `patterns` entry had no usable label and was skipped.
    PatternDropped { index: usize },
    /// A pattern had no numeric confidence; 0.5 was used.
    ConfidenceDefaulted { index: usize },
    /// A pattern confidence was outside `[0, 1]`.
    ConfidenceClamped { index: usize },
    /// `risk_score` was missing or not a number; derived from severity.
    RiskScoreDerived,
    /// `risk_score` was outside `[0, 100]`.
    RiskScoreClamped,
    /// `risk_level` was missing or outside the vocabulary; derived from score.
    RiskLevelDerived,
    /// `summary` was missing or not a string.
    SummaryDefaulted,
}

/// Everything the repair step changed, plus the raw payload's schema violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub repairs: Vec<Repair>,
    /// Human-readable wire-schema violations found in the parsed payload.
    pub schema_violations: Vec<String>,
}

impl RepairReport {
    /// True when the generator honored the contract and nothing was changed.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty() && self.schema_violations.is_empty()
    }

    pub fn contains(&self, repair: &Repair) -> bool {
        self.repairs.contains(repair)
    }
}

/// What the gateway returns: the result and how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutcome {
    pub result: ReasoningResult,
    pub report: RepairReport,
    /// False when the short-circuit path skipped the generator.
    pub generator_invoked: bool,
}
