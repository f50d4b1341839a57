//! # labreport-extract
//!
//! Turns noisy document text into [`RawField`] tuples.
//!
//! - [`clean::clean`] strips PDF/OCR noise (idempotent).
//! - [`fields::extract_fields`] finds keyword-gated test rows.
//! - [`patient::extract_patient_name`] looks up the patient label.
//!
//! The extractor fails closed: a document it cannot read yields no fields,
//! never guessed ones.

pub mod clean;
pub mod fields;
pub mod patient;

use labreport_catalog::ReferenceCatalog;
use labreport_contracts::lab::RawField;

pub use clean::clean;
pub use fields::extract_fields;
pub use patient::{extract_patient_name, NO_PATIENT_NAME};

/// Everything pulled out of one document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub patient_name: String,
    pub fields: Vec<RawField>,
}

/// Clean `text`, then extract the patient name and lab fields from it.
pub fn extract(text: &str, catalog: &ReferenceCatalog) -> Extraction {
    let cleaned = clean(text);
    Extraction {
        patient_name: extract_patient_name(&cleaned),
        fields: extract_fields(&cleaned, catalog),
    }
}
