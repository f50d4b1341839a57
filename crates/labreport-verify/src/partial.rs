//! A fully-optional view of generator output.
//!
//! Every field is kept as a raw `Value` so no generator-supplied type is
//! trusted until the repair step coerces it.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialReasoning {
    pub patterns: Option<Value>,
    pub risk_level: Option<Value>,
    pub risk_score: Option<Value>,
    pub summary: Option<Value>,
}

impl PartialReasoning {
    /// Read a parsed payload. Anything other than a JSON object is `None`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }
}

/// One pattern entry before repair.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialPattern {
    /// A usable label with whatever confidence value came with it.
    Labeled { label: String, confidence: Option<Value> },
    /// No usable label.
    Unusable,
}

impl PartialPattern {
    /// Interpret one element of the `patterns` array.
    ///
    /// A bare string is taken as the label. Empty labels are unusable.
    pub fn from_entry(entry: &Value) -> Self {
        let (label, confidence) = match entry {
            Value::String(s) => (Some(s.as_str()), None),
            Value::Object(map) => (
                map.get("pattern").and_then(Value::as_str),
                map.get("confidence").cloned(),
            ),
            _ => (None, None),
        };

        match label.map(str::trim) {
            Some(label) if !label.is_empty() => PartialPattern::Labeled {
                label: label.to_string(),
                confidence,
            },
            _ => PartialPattern::Unusable,
        }
    }
}
