//! # labreport-catalog
//!
//! Reference data for the lab report pipeline, loaded from TOML.
//!
//! ## Overview
//!
//! [`ReferenceCatalog`] holds the keyword gate used by extraction, the
//! ordered alias rules used for canonicalization, the normal ranges used for
//! classification, and the [`RecommendationEngine`] used after reasoning.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use labreport_catalog::ReferenceCatalog;
//!
//! let catalog = ReferenceCatalog::builtin()?;
//! let key = catalog.canonicalize("Haemoglobin (Hb)");
//! ```
//!
//! ## Rule matching
//!
//! Alias and recommendation rules are substring matches on lowercased text,
//! applied in declaration order; the first match wins.

pub mod catalog;
pub mod recommend;
pub mod rule;

pub use catalog::{ReferenceCatalog, BUILTIN_CATALOG};
pub use recommend::RecommendationEngine;
pub use rule::{AliasRule, CatalogConfig, RangeEntry, RecommendationFallback, RecommendationRule};

// ── Tests ─────────────────────────────────────────────────────────────────────
