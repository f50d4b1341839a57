//! # labreport-core
//!
//! The trust boundary of the lab report pipeline.
//!
//! ## Overview
//!
//! Everything upstream of reasoning (extraction, classification, severity)
//! is deterministic. The generator is not: its output is treated as
//! untrusted text. This crate defines the collaborator traits and the
//! [`ReasoningGateway`] that brokers the single generator call:
//!
//! ```text
//! Findings → Severity → Prompt → [Generator] → Extract JSON → Repair → Recommend
//! ```
//!
//! ## Failure model
//!
//! - A generator that cannot be reached is fatal (`GeneratorUnavailable`).
//! - A generator that answers with garbage is repaired, never fatal.

pub mod gateway;
pub mod prompt;
pub mod traits;

pub use gateway::{all_normal_result, extract_json_object, ReasoningGateway};
pub use prompt::build_prompt;
pub use traits::{Generator, KnowledgeSource, ReasoningVerifier, RecordSink, TextSource};
