//! The end-to-end lab report pipeline.
//!
//!   Acquire → Clean/Extract → Classify → Reason → Record → Sink
//!
//! Each stage that can halt the run maps to a distinct error so the caller
//! can tell an unusable document from an unavailable generator:
//!
//! | stage       | halts with                                      |
//! |-------------|-------------------------------------------------|
//! | acquisition | `AcquisitionFailed`, `InsufficientText`         |
//! | extraction  | `NoFieldsFound`                                 |
//! | reasoning   | `GeneratorUnavailable`                          |
//! | output      | `SinkFailed`                                    |

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use labreport_catalog::ReferenceCatalog;
use labreport_classify::{classify_rows, severity_score};
use labreport_contracts::{
    error::{LabReportError, LabReportResult},
    record::{LabReport, ReportId},
};
use labreport_core::{
    gateway::ReasoningGateway,
    traits::{Generator, KnowledgeSource, RecordSink, TextSource},
};
use labreport_verify::SchemaRepairer;

use crate::{
    adapters::{CommandGenerator, FileKnowledgeSource, TextFileSource},
    config::PipelineConfig,
};

/// One configured pipeline. Runs documents one at a time.
pub struct LabReportPipeline {
    catalog: ReferenceCatalog,
    source: Box<dyn TextSource>,
    gateway: ReasoningGateway,
    sinks: Vec<Box<dyn RecordSink>>,
    min_text_chars: usize,
}

impl LabReportPipeline {
    /// Wire a pipeline from explicit collaborators.
    ///
    /// Uses the schema-checked repairer as the reasoning verifier.
    pub fn new(
        catalog: ReferenceCatalog,
        source: Box<dyn TextSource>,
        knowledge: Box<dyn KnowledgeSource>,
        generator: Box<dyn Generator>,
        min_text_chars: usize,
    ) -> LabReportResult<Self> {
        let gateway = ReasoningGateway::new(
            generator,
            knowledge,
            Box::new(SchemaRepairer::new()?),
            catalog.recommendations().clone(),
        );
        Ok(Self {
            catalog,
            source,
            gateway,
            sinks: Vec::new(),
            min_text_chars,
        })
    }

    /// Wire the file-based adapters described by `config`.
    pub fn from_config(config: &PipelineConfig) -> LabReportResult<Self> {
        let knowledge = match &config.knowledge_path {
            Some(path) => FileKnowledgeSource::new(path),
            None => FileKnowledgeSource::none(),
        };
        Self::new(
            config.load_catalog()?,
            Box::new(TextFileSource),
            Box::new(knowledge),
            Box::new(CommandGenerator::new(config.generator.clone())),
            config.min_text_chars,
        )
    }

    /// Add a sink that receives every finished record, in insertion order.
    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// Read `document` through the text source and analyze it.
    pub fn run(&self, document: &Path) -> LabReportResult<LabReport> {
        debug!(document = %document.display(), "acquiring document text");
        let text = self.source.read_text(document).inspect_err(|e| {
            warn!(document = %document.display(), error = %e, "acquisition failed");
        })?;
        self.analyze_text(&text)
    }

    /// Analyze already-acquired document text and hand the record to every sink.
    pub fn analyze_text(&self, text: &str) -> LabReportResult<LabReport> {
        let report_id = ReportId::new();

        // ── Stage 1: Minimal-content check ───────────────────────────────────
        let chars = text.trim().chars().count();
        if chars < self.min_text_chars {
            warn!(report_id = %report_id.0, chars, min = self.min_text_chars, "document text too short");
            return Err(LabReportError::InsufficientText {
                chars,
                min: self.min_text_chars,
            });
        }

        // ── Stage 2: Extraction ──────────────────────────────────────────────
        let extraction = labreport_extract::extract(text, &self.catalog);
        if extraction.fields.is_empty() {
            warn!(report_id = %report_id.0, chars, "no lab fields extracted");
            return Err(LabReportError::NoFieldsFound);
        }
        debug!(report_id = %report_id.0, fields = extraction.fields.len(), "fields extracted");

        // ── Stage 3: Classification and severity ─────────────────────────────
        let rows = classify_rows(&self.catalog, &extraction.fields);
        let severity = severity_score(&rows);

        // ── Stage 4: Reasoning ───────────────────────────────────────────────
        let outcome = self.gateway.reason(&rows)?;

        let report = LabReport {
            report_id,
            patient_name: extraction.patient_name,
            generated_at: Utc::now(),
            rows,
            severity_score: severity,
            reasoning: outcome.result,
            repairs: outcome.report,
        };

        // ── Stage 5: Sinks ───────────────────────────────────────────────────
        for sink in &self.sinks {
            sink.write(&report)?;
        }

        info!(
            report_id = %report.report_id.0,
            rows = report.rows.len(),
            severity = report.severity_score,
            risk_level = %report.reasoning.risk_level,
            generator_invoked = outcome.generator_invoked,
            "lab report complete"
        );

        Ok(report)
    }
}
