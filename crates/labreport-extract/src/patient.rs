//! Best-effort patient name lookup.

use std::sync::LazyLock;

use regex::Regex;

/// Returned when no patient label is present.
pub const NO_PATIENT_NAME: &str = "No patient name";

/// Label variants in priority order. The first label found anywhere wins.
static PATIENT_LABELS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Patient Name[:\- ]+([A-Za-z ]+)").unwrap(),
        Regex::new(r"(?i)Name[:\- ]+([A-Za-z ]+)").unwrap(),
        Regex::new(r"(?i)PATIENT[:\- ]+([A-Za-z ]+)").unwrap(),
    ]
});

/// Find the patient name in `text`, or return [`NO_PATIENT_NAME`].
pub fn extract_patient_name(text: &str) -> String {
    for label in PATIENT_LABELS.iter() {
        if let Some(caps) = label.captures(text) {
            let name: String = caps[1]
                .trim()
                .chars()
                .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
                .collect();
            return name;
        }
    }
    NO_PATIENT_NAME.to_string()
}
