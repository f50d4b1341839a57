//! Collaborator trait definitions for the lab report pipeline.
//!
//! These traits mark the boundary between the deterministic core and the
//! outside world:
//!
//! - `TextSource`:        document acquisition (PDF, OCR, plain text)
//! - `KnowledgeSource`:   read-only reference context for the prompt
//! - `Generator`:         untrusted free-text generator (usually an LLM)
//! - `ReasoningVerifier`: trusted checker that repairs generator output
//! - `RecordSink`:        consumer of the final record (rendering, export)
//!
//! The gateway calls `Generator::generate()` at most once per document, and
//! nothing the generator returns reaches the record without passing through
//! `ReasoningVerifier::repair()`.

use std::path::Path;

use serde_json::Value;

use labreport_contracts::{
    error::LabReportResult,
    reasoning::{ReasoningResult, RepairReport},
    record::LabReport,
};

/// Turns a document into raw text.
pub trait TextSource: Send + Sync {
    /// Read the full text of `document`.
    ///
    /// An empty string is a valid return; the pipeline decides whether the
    /// text is usable. Return `AcquisitionFailed` only when the document
    /// itself cannot be read.
    fn read_text(&self, document: &Path) -> LabReportResult<String>;
}

/// Supplies free-text reference material embedded in the prompt.
pub trait KnowledgeSource: Send + Sync {
    /// The reference context, or an empty string when none exists.
    ///
    /// Unavailability is not an error.
    fn context(&self) -> String;
}

/// An external text generator.
///
/// Implementations are **untrusted**: their output may be empty, prose,
/// truncated JSON, or JSON with the wrong shape. The gateway treats all of
/// that as recoverable content failure.
pub trait Generator: Send + Sync {
    /// Produce raw text for `prompt` in a single synchronous call.
    ///
    /// Return `GeneratorUnavailable` when the call itself fails (process not
    /// found, non-zero exit, network error, caller-imposed timeout). That
    /// error is fatal to the run; do not retry inside the implementation.
    fn generate(&self, prompt: &str) -> LabReportResult<String>;
}

/// The trusted repair step applied to every generator response.
pub trait ReasoningVerifier: Send + Sync {
    /// Build a fully-populated result from the parsed generator payload.
    ///
    /// `parsed` is `None` when no JSON object could be recovered from the
    /// raw output. `severity` is the run's severity score, used for
    /// fallbacks. Must never fail and never leave a field unset.
    /// `recommendations` in the returned result are left for the caller.
    fn repair(&self, parsed: Option<&Value>, severity: u32) -> (ReasoningResult, RepairReport);
}

/// Consumes the final record.
pub trait RecordSink: Send + Sync {
    /// Hand `report` to its destination.
    fn write(&self, report: &LabReport) -> LabReportResult<()>;
}
