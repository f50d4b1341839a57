//! End-to-end runs of the lab report pipeline with stub collaborators.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use labreport_catalog::ReferenceCatalog;
use labreport_contracts::{
    error::{LabReportError, LabReportResult, PipelineStage},
    lab::TestStatus,
    reasoning::{Repair, RiskLevel},
    record::LabReport,
};
use labreport_core::traits::{Generator, KnowledgeSource, RecordSink, TextSource};
use labreport_pipeline::{adapters::JsonFileSink, LabReportPipeline};

// ── Stub collaborators ────────────────────────────────────────────────────────

struct InlineText(&'static str);

impl TextSource for InlineText {
    fn read_text(&self, _document: &Path) -> LabReportResult<String> {
        Ok(self.0.to_string())
    }
}

struct NoKnowledge;

impl KnowledgeSource for NoKnowledge {
    fn context(&self) -> String {
        String::new()
    }
}

/// Replies with canned output and records every prompt.
struct CannedGenerator {
    prompts: Arc<Mutex<Vec<String>>>,
    reply: Option<&'static str>,
}

impl CannedGenerator {
    fn new(reply: Option<&'static str>) -> Self {
        Self { prompts: Arc::new(Mutex::new(vec![])), reply }
    }
}

impl Generator for CannedGenerator {
    fn generate(&self, prompt: &str) -> LabReportResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Some(reply) => Ok(reply.to_string()),
            None => Err(LabReportError::GeneratorUnavailable {
                reason: "runner not installed".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct CollectingSink {
    reports: Arc<Mutex<Vec<LabReport>>>,
}

impl RecordSink for CollectingSink {
    fn write(&self, report: &LabReport) -> LabReportResult<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

const ABNORMAL_REPORT: &str = "\
CITY DIAGNOSTICS LAB\n\
Patient Name: Jane Roe\n\
Test | Result | Unit | Reference\n\
Hemoglobin: 12.2 g/dL 13.0 - 17.0\n\
WBC: 14500 /cumm 4000 - 11000\n\
CRP: 38.5 mg/L 0 - 5\n";

const NORMAL_REPORT: &str = "\
Patient Name: John Doe\n\
Hemoglobin: 14.8 g/dL 13.0 - 17.0\n\
WBC: 7200 /cumm 4000 - 11000\n\
Platelet Count: 250000 /cumm 150000 - 450000\n";

fn pipeline(text: &'static str, generator: CannedGenerator) -> LabReportPipeline {
    LabReportPipeline::new(
        ReferenceCatalog::builtin().unwrap(),
        Box::new(InlineText(text)),
        Box::new(NoKnowledge),
        Box::new(generator),
        20,
    )
    .unwrap()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

/// Scenario 1: Low/High/High rows score 5 and reach the generator once.
#[test]
fn test_abnormal_report_is_classified_and_reasoned() {
    let generator = CannedGenerator::new(Some(
        r#"Here you go:
        {"patterns": [{"pattern": "Possible inflammatory or infectious process", "confidence": 0.85}],
         "risk_level": "Moderate", "risk_score": 60,
         "summary": "Elevated inflammatory markers may suggest an ongoing systemic process."}"#,
    ));
    let prompts = generator.prompts.clone();
    let sink = CollectingSink::default();
    let written = sink.reports.clone();

    let report = pipeline(ABNORMAL_REPORT, generator)
        .with_sink(Box::new(sink))
        .run(Path::new("scan.txt"))
        .unwrap();

    let statuses: Vec<TestStatus> = report.rows.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![TestStatus::Low, TestStatus::High, TestStatus::High]);
    assert_eq!(report.severity_score, 5);
    assert_eq!(report.patient_name, "Jane Roe");
    assert_eq!(prompts.lock().unwrap().len(), 1);

    assert_eq!(report.reasoning.risk_level, RiskLevel::Moderate);
    assert_eq!(report.reasoning.risk_score, 60.0);
    assert_eq!(report.reasoning.recommendations.len(), 1);
    assert!(report.reasoning.recommendations[0].contains("fever"));
    assert!(report.repairs.is_clean(), "unexpected repairs: {:?}", report.repairs);

    assert_eq!(report.report_id.0.len(), 8);
    assert_eq!(written.lock().unwrap().len(), 1);
}

/// Scenario 2: an all-normal document never reaches the generator.
#[test]
fn test_normal_report_skips_generator() {
    let generator = CannedGenerator::new(None);
    let prompts = generator.prompts.clone();

    let report = pipeline(NORMAL_REPORT, generator).run(Path::new("scan.txt")).unwrap();

    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(report.severity_score, 0);
    assert_eq!(report.reasoning.risk_score, 0.0);
    assert_eq!(report.reasoning.risk_level, RiskLevel::Low);
    assert_eq!(
        report.reasoning.recommendations,
        vec!["Maintain routine health checkups and a balanced lifestyle.".to_string()]
    );
}

/// Scenario 3: unparseable generator output is repaired from severity and
/// the final level is derived, never Unknown.
#[test]
fn test_unparseable_generator_output_is_repaired() {
    let generator = CannedGenerator::new(Some("I'm sorry, I can only answer in prose."));

    let report = pipeline(ABNORMAL_REPORT, generator).run(Path::new("scan.txt")).unwrap();

    assert_eq!(report.reasoning.risk_score, 50.0);
    assert_eq!(report.reasoning.risk_level, RiskLevel::Moderate);
    assert_ne!(report.reasoning.risk_level, RiskLevel::Unknown);
    assert_eq!(report.reasoning.labels(), vec!["Abnormal parameters detected".to_string()]);
    assert_eq!(report.reasoning.summary, "LLM output could not be parsed properly.");
    assert_eq!(
        report.reasoning.recommendations,
        vec!["Monitor symptoms and consult a healthcare professional if abnormalities persist."
            .to_string()]
    );
    assert!(report.repairs.contains(&Repair::Unparseable));
    assert!(report.repairs.contains(&Repair::RiskLevelDerived));
}

/// A generator-supplied score wins over the severity fallback when the level
/// is missing; the level is derived from that score.
#[test]
fn test_generator_score_takes_precedence_for_derived_level() {
    let generator = CannedGenerator::new(Some(
        r#"{"patterns": [{"pattern": "Possible anemia"}], "risk_score": 15, "summary": "Low hemoglobin."}"#,
    ));

    let report = pipeline(ABNORMAL_REPORT, generator).run(Path::new("scan.txt")).unwrap();

    assert_eq!(report.reasoning.risk_score, 15.0);
    assert_eq!(report.reasoning.risk_level, RiskLevel::Low);
    assert_eq!(report.reasoning.patterns[0].confidence, 0.5);
    assert!(report.reasoning.recommendations[0].contains("iron"));
    assert!(!report.repairs.schema_violations.is_empty());
}

// ── Halting stages ────────────────────────────────────────────────────────────

#[test]
fn test_generator_unavailable_halts_in_reasoning() {
    let sink = CollectingSink::default();
    let written = sink.reports.clone();

    let err = pipeline(ABNORMAL_REPORT, CannedGenerator::new(None))
        .with_sink(Box::new(sink))
        .run(Path::new("scan.txt"))
        .unwrap_err();

    assert!(matches!(err, LabReportError::GeneratorUnavailable { .. }));
    assert_eq!(err.stage(), PipelineStage::Reasoning);
    assert!(err.is_infrastructure());
    assert!(written.lock().unwrap().is_empty(), "no record on a halted run");
}

#[test]
fn test_short_text_halts_in_acquisition() {
    let generator = CannedGenerator::new(None);
    let prompts = generator.prompts.clone();

    let err = pipeline("   Hb 12   ", generator).run(Path::new("scan.txt")).unwrap_err();

    assert!(matches!(err, LabReportError::InsufficientText { chars: 5, min: 20 }));
    assert_eq!(err.stage(), PipelineStage::Acquisition);
    assert!(!err.is_infrastructure());
    assert!(prompts.lock().unwrap().is_empty());
}

#[test]
fn test_text_without_lab_fields_halts_in_extraction() {
    let err = pipeline(
        "Discharge summary: patient is recovering well and will follow up in 2 weeks.",
        CannedGenerator::new(None),
    )
    .run(Path::new("scan.txt"))
    .unwrap_err();

    assert!(matches!(err, LabReportError::NoFieldsFound));
    assert_eq!(err.stage(), PipelineStage::Extraction);
}

// ── Duplicate rows ────────────────────────────────────────────────────────────

/// All duplicate rows are kept; only the last abnormal one feeds the findings.
#[test]
fn test_duplicate_rows_kept_last_finding_wins() {
    let generator = CannedGenerator::new(Some("{}"));
    let prompts = generator.prompts.clone();

    let report = pipeline(
        "Patient Name: Jane Roe\nWBC: 14500 /cumm 4000 - 11000\nWBC: 2500 /cumm 4000 - 11000\n",
        generator,
    )
    .run(Path::new("scan.txt"))
    .unwrap();

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].status, TestStatus::High);
    assert_eq!(report.rows[1].status, TestStatus::Low);
    // Severity counts every row, the findings map only the last.
    assert_eq!(report.severity_score, 3);

    let prompts = prompts.lock().unwrap();
    assert!(prompts[0].contains("\"WBC\": \"Low\""));
    assert!(!prompts[0].contains("\"WBC\": \"High\""));
}

// ── File sink ─────────────────────────────────────────────────────────────────

#[test]
fn test_json_sink_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let report = pipeline(NORMAL_REPORT, CannedGenerator::new(None))
        .with_sink(Box::new(JsonFileSink::new(dir.path())))
        .run(Path::new("scan.txt"))
        .unwrap();

    let path = dir.path().join(format!("{}_report.json", report.report_id.0));
    let written: LabReport =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written, report);
}
