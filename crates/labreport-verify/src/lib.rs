//! # labreport-verify
//!
//! The trusted half of the reasoning boundary.
//!
//! [`engine::SchemaRepairer`] implements
//! [`labreport_core::traits::ReasoningVerifier`]. For every generator payload
//! it runs two phases:
//!
//! 1. **Structural**: the payload is checked against the reasoning wire
//!    schema ([`schema::wire_schema`]) with the `jsonschema` crate. Violations
//!    are logged and reported, never fatal.
//! 2. **Repair**: the payload is read into [`partial::PartialReasoning`] and
//!    every field is coerced or defaulted into a complete `ReasoningResult`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use labreport_verify::engine::SchemaRepairer;
//!
//! let repairer = SchemaRepairer::new()?;
//! let (result, report) = repairer.repair(parsed.as_ref(), severity);
//! ```

pub mod engine;
pub mod partial;
pub mod schema;

pub use engine::{
    repair_reasoning, SchemaRepairer, GENERIC_PATTERN, UNPARSEABLE_SUMMARY,
};
