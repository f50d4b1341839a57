//! # labreport-pipeline
//!
//! Wires the lab report crates into a runnable pipeline.
//!
//! ## Overview
//!
//! [`LabReportPipeline`] runs one document through acquisition, extraction,
//! classification and reasoning, and hands the resulting
//! [`LabReport`](labreport_contracts::record::LabReport) to its sinks.
//! [`PipelineConfig`] describes the file-based setup; [`adapters`] holds the
//! concrete collaborators; [`evaluate`] scores produced records against
//! labelled ground truth.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use labreport_pipeline::{adapters::JsonFileSink, LabReportPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_file(Path::new("labreport.toml"))?;
//! let pipeline = LabReportPipeline::from_config(&config)?
//!     .with_sink(Box::new(JsonFileSink::new("reports/")));
//! let report = pipeline.run(Path::new("scan.txt"))?;
//! ```

pub mod adapters;
pub mod config;
pub mod evaluate;
pub mod pipeline;

pub use config::{GeneratorConfig, PipelineConfig};
pub use pipeline::LabReportPipeline;
