//! # labreport-contracts
//!
//! Shared types and error contracts for the lab report pipeline.
//!
//! All crates in the workspace import from here. No pipeline logic lives in
//! this crate: only data definitions, the error type, and the small
//! invariant-carrying helpers that belong with the data.

pub mod error;
pub mod lab;
pub mod reasoning;
pub mod record;
