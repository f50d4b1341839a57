//! The reasoning wire schema and its validator.

use jsonschema::Validator;
use serde_json::{json, Value};
use tracing::warn;

use labreport_contracts::error::{LabReportError, LabReportResult};

/// Identifier used in log lines for the wire schema.
pub const WIRE_SCHEMA_ID: &str = "labreport-reasoning-v1";

/// The JSON shape the generator is asked to return.
///
/// Stricter than the repair step: lowercase risk levels and missing
/// confidences are repairable but still count as violations.
pub fn wire_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["patterns", "risk_level", "risk_score", "summary"],
        "properties": {
            "patterns": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["pattern", "confidence"],
                    "properties": {
                        "pattern": { "type": "string", "minLength": 1 },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                    }
                }
            },
            "risk_level": { "type": "string", "enum": ["Low", "Moderate", "High"] },
            "risk_score": { "type": "number", "minimum": 0, "maximum": 100 },
            "summary": { "type": "string", "minLength": 1 }
        }
    })
}

/// Compiled wire schema.
pub struct WireSchema {
    validator: Validator,
}

impl WireSchema {
    /// Compile [`wire_schema`].
    ///
    /// Returns `SchemaValidation` if the schema document itself is invalid.
    pub fn compile() -> LabReportResult<Self> {
        let validator = jsonschema::validator_for(&wire_schema()).map_err(|e| {
            LabReportError::SchemaValidation {
                reason: format!("invalid wire schema {WIRE_SCHEMA_ID}: {e}"),
            }
        })?;
        Ok(Self { validator })
    }

    /// Every violation in `payload`, formatted as `"<path>: <message>"`.
    pub fn violations(&self, payload: &Value) -> Vec<String> {
        self.validator
            .iter_errors(payload)
            .map(|error| {
                let message = format!("{}: {}", error.instance_path, error);
                warn!(schema_id = WIRE_SCHEMA_ID, %message, "generator output violates wire schema");
                message
            })
            .collect()
    }
}
