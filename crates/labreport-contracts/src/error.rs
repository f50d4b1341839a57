//! Runtime error types for the lab report pipeline.
//!
//! Only three conditions terminate a run: unusable document text, a document
//! with no recognizable fields, and a generator that cannot be reached.
//! Everything else (unknown tests, unparseable values, malformed generator
//! output) is absorbed by the component that detects it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The pipeline stage an error halted in.
///
/// Surfaced to operators so an input problem (bad scan, unsupported layout)
/// can be told apart from an infrastructure problem (model runner down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Acquisition,
    Extraction,
    Reasoning,
    Output,
    Configuration,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Acquisition => "acquisition",
            PipelineStage::Extraction => "extraction",
            PipelineStage::Reasoning => "reasoning",
            PipelineStage::Output => "output",
            PipelineStage::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// The unified error type for the lab report pipeline.
#[derive(Debug, Error)]
pub enum LabReportError {
    /// The document text is empty or shorter than the minimal-content threshold.
    #[error("insufficient document text: {chars} characters, at least {min} required")]
    InsufficientText { chars: usize, min: usize },

    /// The document text source itself failed (unreadable file, bad encoding).
    #[error("document acquisition failed: {reason}")]
    AcquisitionFailed { reason: String },

    /// Cleaning and extraction found no recognizable lab fields.
    #[error("no structured lab fields found in document text")]
    NoFieldsFound,

    /// The external generator could not be invoked or did not complete.
    ///
    /// Malformed generator *output* never produces this error; it is repaired.
    #[error("generator unavailable: {reason}")]
    GeneratorUnavailable { reason: String },

    /// A catalog or pipeline configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A JSON Schema document could not be compiled or applied.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// The final record could not be handed to its sink.
    #[error("record sink failed: {reason}")]
    SinkFailed { reason: String },
}

impl LabReportError {
    /// The stage this error terminated the run in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            LabReportError::InsufficientText { .. } | LabReportError::AcquisitionFailed { .. } => {
                PipelineStage::Acquisition
            }
            LabReportError::NoFieldsFound => PipelineStage::Extraction,
            LabReportError::GeneratorUnavailable { .. } => PipelineStage::Reasoning,
            LabReportError::SinkFailed { .. } => PipelineStage::Output,
            LabReportError::ConfigError { .. } | LabReportError::SchemaValidation { .. } => {
                PipelineStage::Configuration
            }
        }
    }

    /// True when the failure lies with the runtime environment rather than
    /// with the submitted document.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self,
            LabReportError::InsufficientText { .. }
                | LabReportError::AcquisitionFailed { .. }
                | LabReportError::NoFieldsFound
        )
    }
}

/// Convenience alias used throughout the lab report crates.
pub type LabReportResult<T> = Result<T, LabReportError>;
