//! Schema-checked repair of generator reasoning output.
//!
//! `SchemaRepairer` implements the `ReasoningVerifier` trait from
//! `labreport-core`. Unlike a pass/fail verifier it never rejects: every
//! defect in the payload is replaced with a deterministic value and
//! recorded as a `Repair`, so the result is complete no matter what the
//! generator returned.
//!
//! Precedence inside the repair step:
//!
//! 1. `patterns`: usable entries kept in order, the rest dropped; if none
//!    survive, the generic pattern is injected.
//! 2. `risk_score`: a JSON number is clamped to `[0, 100]`; anything else is
//!    replaced with `min(100, severity * 10)`.
//! 3. `risk_level`: a recognized label is kept; a missing, empty, `Unknown`
//!    or unrecognized one is derived from the score from step 2.
//! 4. `summary`: a non-empty string is kept, otherwise a fixed default.

use serde_json::Value;
use tracing::{debug, warn};

use labreport_contracts::{
    error::LabReportResult,
    reasoning::{Pattern, ReasoningResult, Repair, RepairReport, RiskLevel},
};
use labreport_core::traits::ReasoningVerifier;

use crate::{
    partial::{PartialPattern, PartialReasoning},
    schema::WireSchema,
};

/// Label used when the generator supplies no usable pattern.
pub const GENERIC_PATTERN: &str = "Abnormal parameters detected";
/// Confidence assigned to the generic pattern and to unscored patterns.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Summary used when the payload could not be parsed at all.
pub const UNPARSEABLE_SUMMARY: &str = "LLM output could not be parsed properly.";
/// Summary used when a parsed payload has no usable summary.
pub const MISSING_SUMMARY: &str =
    "No summary was provided; review the abnormal parameters with a healthcare professional.";

const MAX_RISK_SCORE: f64 = 100.0;
const SEVERITY_SCORE_FACTOR: u32 = 10;

/// The production `ReasoningVerifier`.
pub struct SchemaRepairer {
    schema: WireSchema,
}

impl SchemaRepairer {
    /// Compile the wire schema and build a repairer.
    pub fn new() -> LabReportResult<Self> {
        Ok(Self { schema: WireSchema::compile()? })
    }
}

impl ReasoningVerifier for SchemaRepairer {
    fn repair(&self, parsed: Option<&Value>, severity: u32) -> (ReasoningResult, RepairReport) {
        // ── Phase 1: Structural check ────────────────────────────────────────
        let schema_violations = parsed
            .map(|payload| self.schema.violations(payload))
            .unwrap_or_default();

        // ── Phase 2: Repair ──────────────────────────────────────────────────
        let (result, mut report) = repair_reasoning(parsed, severity);
        report.schema_violations = schema_violations;

        debug!(
            repairs = report.repairs.len(),
            violations = report.schema_violations.len(),
            clean = report.is_clean(),
            "generator output verified"
        );

        (result, report)
    }
}

/// The severity-derived risk score: `min(100, severity * 10)`.
pub fn severity_risk_score(severity: u32) -> f64 {
    f64::from(severity.saturating_mul(SEVERITY_SCORE_FACTOR)).min(MAX_RISK_SCORE)
}

/// Turn an optional parsed payload into a complete result.
///
/// Pure and total. `recommendations` is left empty. The returned report
/// lists repairs only; schema violations are added by [`SchemaRepairer`].
pub fn repair_reasoning(parsed: Option<&Value>, severity: u32) -> (ReasoningResult, RepairReport) {
    let mut repairs = Vec::new();

    let result = match parsed.and_then(PartialReasoning::from_payload) {
        Some(partial) => repair_partial(partial, severity, &mut repairs),
        None => fallback(severity, &mut repairs),
    };

    for repair in &repairs {
        warn!(?repair, severity, "repaired generator output");
    }

    (result, RepairReport { repairs, schema_violations: Vec::new() })
}

fn fallback(severity: u32, repairs: &mut Vec<Repair>) -> ReasoningResult {
    repairs.push(Repair::Unparseable);

    let risk_score = severity_risk_score(severity);
    // The fallback level is Unknown until derived from the score.
    let risk_level = resolve_level(RiskLevel::Unknown, risk_score, repairs);

    ReasoningResult {
        patterns: vec![Pattern::new(GENERIC_PATTERN, DEFAULT_CONFIDENCE)],
        risk_level,
        risk_score,
        summary: UNPARSEABLE_SUMMARY.to_string(),
        recommendations: Vec::new(),
    }
}

fn repair_partial(partial: PartialReasoning, severity: u32, repairs: &mut Vec<Repair>) -> ReasoningResult {
    let patterns = repair_patterns(partial.patterns.as_ref(), repairs);

    let risk_score = match partial.risk_score.as_ref().and_then(Value::as_f64) {
        Some(score) if score.is_finite() => {
            let clamped = score.clamp(0.0, MAX_RISK_SCORE);
            if clamped != score {
                repairs.push(Repair::RiskScoreClamped);
            }
            clamped
        }
        _ => {
            repairs.push(Repair::RiskScoreDerived);
            severity_risk_score(severity)
        }
    };

    let stated = partial
        .risk_level
        .as_ref()
        .and_then(Value::as_str)
        .map(RiskLevel::from_label)
        .unwrap_or(RiskLevel::Unknown);
    let risk_level = resolve_level(stated, risk_score, repairs);

    let summary = match partial.summary.as_ref().and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            repairs.push(Repair::SummaryDefaulted);
            MISSING_SUMMARY.to_string()
        }
    };

    ReasoningResult { patterns, risk_level, risk_score, summary, recommendations: Vec::new() }
}

fn repair_patterns(raw: Option<&Value>, repairs: &mut Vec<Repair>) -> Vec<Pattern> {
    let entries = raw.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    let mut patterns = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match PartialPattern::from_entry(entry) {
            PartialPattern::Labeled { label, confidence } => {
                let confidence = repair_confidence(index, confidence.as_ref(), repairs);
                patterns.push(Pattern::new(label, confidence));
            }
            PartialPattern::Unusable => repairs.push(Repair::PatternDropped { index }),
        }
    }

    if patterns.is_empty() {
        repairs.push(Repair::PatternsInjected);
        patterns.push(Pattern::new(GENERIC_PATTERN, DEFAULT_CONFIDENCE));
    }
    patterns
}

fn repair_confidence(index: usize, raw: Option<&Value>, repairs: &mut Vec<Repair>) -> f64 {
    match raw.and_then(Value::as_f64) {
        Some(c) if c.is_finite() => {
            let clamped = c.clamp(0.0, 1.0);
            if clamped != c {
                repairs.push(Repair::ConfidenceClamped { index });
            }
            clamped
        }
        _ => {
            repairs.push(Repair::ConfidenceDefaulted { index });
            DEFAULT_CONFIDENCE
        }
    }
}

fn resolve_level(stated: RiskLevel, risk_score: f64, repairs: &mut Vec<Repair>) -> RiskLevel {
    match stated {
        RiskLevel::Unknown => {
            repairs.push(Repair::RiskLevelDerived);
            RiskLevel::from_score(risk_score)
        }
        level => level,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
