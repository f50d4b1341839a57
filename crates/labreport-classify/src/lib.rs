//! # labreport-classify
//!
//! Deterministic normalization of extracted lab fields.
//!
//! - [`normalize::classify_rows`] maps raw fields to classified rows using
//!   the catalog's aliases and reference ranges.
//! - [`severity::severity_score`] folds the rows into one severity signal.
//!
//! Both are pure functions of their inputs and the catalog.

pub mod normalize;
pub mod severity;

pub use normalize::{classify, classify_field, classify_rows, coerce_numeric};
pub use severity::severity_score;
