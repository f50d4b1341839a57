//! The reasoning gateway: the only path from classified rows to the
//! generator and back.
//!
//! The gateway enforces the reasoning sequence:
//!
//!   Findings → Severity → Context → Prompt → [Generator::generate] → Extract → Repair → Recommend
//!
//! `Generator::generate()` is never called when there are no abnormal
//! findings, and is called at most once otherwise. Whatever it returns goes
//! through `ReasoningVerifier::repair()` before it reaches the caller.

use serde_json::Value;
use tracing::{debug, info, warn};

use labreport_catalog::recommend::RecommendationEngine;
use labreport_classify::severity_score;
use labreport_contracts::{
    error::LabReportResult,
    lab::{AbnormalFindings, ClassifiedRow},
    reasoning::{Pattern, ReasoningOutcome, ReasoningResult, RepairReport, RiskLevel},
};

use crate::{
    prompt::build_prompt,
    traits::{Generator, KnowledgeSource, ReasoningVerifier},
};

pub const NO_ABNORMALITY_PATTERN: &str = "No significant abnormalities";
pub const NO_ABNORMALITY_SUMMARY: &str = "All evaluated parameters are within normal limits.";
pub const NO_ABNORMALITY_RECOMMENDATION: &str =
    "Maintain routine health checkups and a balanced lifestyle.";

/// Drives one reasoning call per document.
///
/// The gateway owns the untrusted generator alongside the trusted verifier
/// and recommendation rules, so callers cannot reach one without the other.
pub struct ReasoningGateway {
    generator: Box<dyn Generator>,
    knowledge: Box<dyn KnowledgeSource>,
    verifier: Box<dyn ReasoningVerifier>,
    recommendations: RecommendationEngine,
}

impl ReasoningGateway {
    pub fn new(
        generator: Box<dyn Generator>,
        knowledge: Box<dyn KnowledgeSource>,
        verifier: Box<dyn ReasoningVerifier>,
        recommendations: RecommendationEngine,
    ) -> Self {
        Self { generator, knowledge, verifier, recommendations }
    }

    /// Reason over the classified rows of one document.
    ///
    /// # Pipeline
    ///
    /// 1. Derive the abnormal findings; if there are none, return the fixed
    ///    all-normal result without touching the generator
    /// 2. Compute the severity score and fetch the knowledge context
    /// 3. Build the prompt and call `generator.generate()` exactly once
    /// 4. Recover the outermost JSON object from the raw output
    /// 5. Call `verifier.repair()` (always, even on a clean payload)
    /// 6. Replace recommendations with the rule-based synthesis
    ///
    /// # Errors
    ///
    /// Only a generator transport failure (`GeneratorUnavailable`) is
    /// returned. Malformed generator content never fails the call.
    pub fn reason(&self, rows: &[ClassifiedRow]) -> LabReportResult<ReasoningOutcome> {
        // ── Step 1: Abnormal findings ────────────────────────────────────────
        let findings = AbnormalFindings::from_rows(rows);

        if findings.is_empty() {
            info!(rows = rows.len(), "no abnormal findings, generator not invoked");
            return Ok(ReasoningOutcome {
                result: all_normal_result(),
                report: RepairReport::default(),
                generator_invoked: false,
            });
        }

        // ── Step 2: Severity and reference context ───────────────────────────
        let severity = severity_score(rows);
        let context = self.knowledge.context();

        debug!(
            findings = findings.len(),
            severity,
            context_chars = context.chars().count(),
            "reasoning over abnormal findings"
        );

        // ── Step 3: Single generator call ────────────────────────────────────
        //
        // Transport errors propagate; there is no retry.
        let prompt = build_prompt(&findings, severity, &context);
        let raw = self.generator.generate(&prompt).inspect_err(|e| {
            warn!(error = %e, "generator call failed");
        })?;

        debug!(raw_chars = raw.chars().count(), "generator returned");

        // ── Step 4: JSON recovery ────────────────────────────────────────────
        let parsed = extract_json_object(&raw);
        if parsed.is_none() {
            warn!(severity, "generator output held no parseable JSON object");
        }

        // ── Step 5: Verification and repair ──────────────────────────────────
        let (mut result, report) = self.verifier.repair(parsed.as_ref(), severity);

        // ── Step 6: Recommendations ──────────────────────────────────────────
        result.recommendations = self.recommendations.synthesize(&result.labels());

        info!(
            patterns = result.patterns.len(),
            risk_level = %result.risk_level,
            risk_score = result.risk_score,
            repairs = report.repairs.len(),
            "reasoning complete"
        );

        Ok(ReasoningOutcome { result, report, generator_invoked: true })
    }
}

/// The fixed result for a document with no abnormal findings.
pub fn all_normal_result() -> ReasoningResult {
    ReasoningResult {
        patterns: vec![Pattern::new(NO_ABNORMALITY_PATTERN, 1.0)],
        risk_level: RiskLevel::Low,
        risk_score: 0.0,
        summary: NO_ABNORMALITY_SUMMARY.to_string(),
        recommendations: vec![NO_ABNORMALITY_RECOMMENDATION.to_string()],
    }
}

/// Parse the span from the first `{` to the last `}` of `raw`.
///
/// Returns `None` when there is no such span or it is not valid JSON.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use labreport_catalog::ReferenceCatalog;
    use labreport_contracts::{
        error::{LabReportError, LabReportResult},
        lab::{ClassifiedRow, TestStatus},
        reasoning::{Pattern, ReasoningResult, Repair, RepairReport, RiskLevel},
    };

    use crate::traits::{Generator, KnowledgeSource, ReasoningVerifier};

    use super::{extract_json_object, ReasoningGateway, NO_ABNORMALITY_PATTERN};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn row(name: &str, status: TestStatus) -> ClassifiedRow {
        ClassifiedRow {
            test_name: name.to_string(),
            value: Some(1.0),
            unit: None,
            status,
        }
    }

    /// A generator that records every prompt and replies with a fixed result.
    struct MockGenerator {
        prompts: Arc<Mutex<Vec<String>>>,
        /// `Err` holds the transport failure reason.
        reply: Result<String, String>,
    }

    impl MockGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                prompts: Arc::new(Mutex::new(vec![])),
                reply: Ok(reply.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                prompts: Arc::new(Mutex::new(vec![])),
                reply: Err("connection refused".to_string()),
            }
        }
    }

    impl Generator for MockGenerator {
        fn generate(&self, prompt: &str) -> LabReportResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|reason| LabReportError::GeneratorUnavailable { reason })
        }
    }

    struct FixedKnowledge(&'static str);

    impl KnowledgeSource for FixedKnowledge {
        fn context(&self) -> String {
            self.0.to_string()
        }
    }

    /// A verifier that records what it was given and reads only `pattern`
    /// labels and `risk_score`, enough to observe the gateway wiring.
    struct MockVerifier {
        seen: Arc<Mutex<Vec<(Option<Value>, u32)>>>,
    }

    impl MockVerifier {
        fn new() -> Self {
            Self { seen: Arc::new(Mutex::new(vec![])) }
        }
    }

    impl ReasoningVerifier for MockVerifier {
        fn repair(&self, parsed: Option<&Value>, severity: u32) -> (ReasoningResult, RepairReport) {
            self.seen.lock().unwrap().push((parsed.cloned(), severity));

            let labels: Vec<String> = parsed
                .and_then(|v| v["patterns"].as_array())
                .map(|ps| {
                    ps.iter()
                        .filter_map(|p| p["pattern"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            let mut report = RepairReport::default();
            if parsed.is_none() {
                report.repairs.push(Repair::Unparseable);
            }

            let result = ReasoningResult {
                patterns: labels.into_iter().map(|l| Pattern::new(l, 0.5)).collect(),
                risk_level: RiskLevel::Moderate,
                risk_score: parsed.and_then(|v| v["risk_score"].as_f64()).unwrap_or(0.0),
                summary: "s".to_string(),
                recommendations: vec!["from the verifier".to_string()],
            };
            (result, report)
        }
    }

    fn gateway(generator: MockGenerator, verifier: MockVerifier) -> ReasoningGateway {
        let catalog = ReferenceCatalog::builtin().unwrap();
        ReasoningGateway::new(
            Box::new(generator),
            Box::new(FixedKnowledge("reference notes")),
            Box::new(verifier),
            catalog.recommendations().clone(),
        )
    }

    // ── Short-circuit ────────────────────────────────────────────────────────

    /// No abnormal findings must never reach the generator.
    #[test]
    fn test_no_findings_skips_generator() {
        let generator = MockGenerator::replying("{}");
        let prompts = generator.prompts.clone();
        let verifier = MockVerifier::new();
        let seen = verifier.seen.clone();

        let rows = vec![row("Hemoglobin", TestStatus::Normal), row("MCV", TestStatus::Unknown)];
        let outcome = gateway(generator, verifier).reason(&rows).unwrap();

        assert!(prompts.lock().unwrap().is_empty(), "generate() must not be called");
        assert!(seen.lock().unwrap().is_empty(), "repair() must not be called");
        assert!(!outcome.generator_invoked);
        assert_eq!(outcome.result.risk_level, RiskLevel::Low);
        assert_eq!(outcome.result.risk_score, 0.0);
        assert_eq!(outcome.result.labels(), vec![NO_ABNORMALITY_PATTERN.to_string()]);
        assert_eq!(outcome.result.patterns[0].confidence, 1.0);
        assert_eq!(
            outcome.result.recommendations,
            vec!["Maintain routine health checkups and a balanced lifestyle.".to_string()]
        );
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn test_empty_rows_skip_generator() {
        let generator = MockGenerator::failing();
        let prompts = generator.prompts.clone();

        let outcome = gateway(generator, MockVerifier::new()).reason(&[]).unwrap();

        assert!(prompts.lock().unwrap().is_empty());
        assert_eq!(outcome.result.risk_level, RiskLevel::Low);
    }

    // ── Generator call ───────────────────────────────────────────────────────

    #[test]
    fn test_generator_called_exactly_once_with_findings() {
        let generator = MockGenerator::replying(
            r#"{"patterns":[{"pattern":"Possible inflammatory process","confidence":0.8}],"risk_score":55}"#,
        );
        let prompts = generator.prompts.clone();
        let verifier = MockVerifier::new();
        let seen = verifier.seen.clone();

        let rows = vec![
            row("Hemoglobin", TestStatus::Low),
            row("WBC", TestStatus::High),
            row("CRP", TestStatus::High),
            row("Platelet Count", TestStatus::Normal),
        ];
        let outcome = gateway(generator, verifier).reason(&rows).unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1, "generate() must be called exactly once");
        assert!(prompts[0].contains("\"Hemoglobin\": \"Low\""));
        assert!(prompts[0].contains("Severity Score: 5"));
        assert!(prompts[0].contains("reference notes"));
        assert!(!prompts[0].contains("Platelet Count"), "normal rows are not findings");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, 5, "verifier receives the severity score");
        assert!(outcome.generator_invoked);
        assert_eq!(outcome.result.risk_score, 55.0);
    }

    /// Transport failure is fatal and propagates unchanged.
    #[test]
    fn test_generator_failure_propagates() {
        let verifier = MockVerifier::new();
        let seen = verifier.seen.clone();

        let err = gateway(MockGenerator::failing(), verifier)
            .reason(&[row("CRP", TestStatus::High)])
            .unwrap_err();

        assert!(matches!(err, LabReportError::GeneratorUnavailable { .. }));
        assert!(seen.lock().unwrap().is_empty(), "nothing to repair after a transport failure");
    }

    /// Prose without JSON is content failure: repaired, not raised.
    #[test]
    fn test_unparseable_output_reaches_verifier_as_none() {
        let verifier = MockVerifier::new();
        let seen = verifier.seen.clone();

        let outcome = gateway(MockGenerator::replying("I cannot help with that."), verifier)
            .reason(&[row("CRP", TestStatus::High)])
            .unwrap();

        assert_eq!(seen.lock().unwrap()[0].0, None);
        assert!(outcome.report.contains(&Repair::Unparseable));
    }

    // ── Recommendations ──────────────────────────────────────────────────────

    #[test]
    fn test_recommendations_are_rule_based() {
        let generator = MockGenerator::replying(
            r#"{"patterns":[{"pattern":"Possible inflammatory process"},{"pattern":"xyz"}],
                "recommendations":["take aspirin"]}"#,
        );

        let outcome = gateway(generator, MockVerifier::new())
            .reason(&[row("CRP", TestStatus::High)])
            .unwrap();

        assert_eq!(outcome.result.recommendations.len(), 2);
        assert!(outcome.result.recommendations[0].contains("fever"));
        assert!(outcome
            .result
            .recommendations
            .iter()
            .all(|r| r != "take aspirin" && r != "from the verifier"));
    }

    // ── JSON recovery ────────────────────────────────────────────────────────

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let raw = "Sure! Here is the JSON:\n{\"risk_score\": 40, \"nested\": {\"a\": 1}}\nHope this helps.";
        assert_eq!(
            extract_json_object(raw),
            Some(json!({"risk_score": 40, "nested": {"a": 1}}))
        );
    }

    #[test]
    fn no_braces_or_bad_json_is_none() {
        assert_eq!(extract_json_object(""), None);
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object("{\"patterns\": [ truncated"), None);
        assert_eq!(extract_json_object("{a} and {b}"), None);
    }
}
