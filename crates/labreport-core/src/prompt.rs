//! Deterministic prompt construction for the generator call.
//!
//! The prompt is a pure function of the findings, the severity score and the
//! knowledge context. Identical inputs always produce identical prompts.

use labreport_contracts::lab::AbnormalFindings;

const RULES: &str = "\
You are a medical reasoning assistant.

STRICT RULES:
- DO NOT diagnose diseases
- DO NOT recommend treatment or medications
- DO NOT mention drugs
- Use cautious language (\"possible\", \"may suggest\")
- Output ONLY valid JSON
- Start with { and end with }";

const WORKED_EXAMPLE: &str = r#"EXAMPLE:
Input:
CRP: High
WBC: High
Severity Score: 4

Output:
{
  "patterns": [
    {"pattern": "Possible inflammatory or infectious process", "confidence": 0.85}
  ],
  "risk_level": "Moderate",
  "risk_score": 60,
  "summary": "Elevated inflammatory markers may suggest an ongoing systemic process."
}"#;

const RETURN_SKELETON: &str = r#"RETURN STRICT JSON:
{
  "patterns": [
    {"pattern": "", "confidence": 0.0}
  ],
  "risk_level": "",
  "risk_score": 0,
  "summary": ""
}"#;

/// Build the single prompt sent to the generator.
pub fn build_prompt(findings: &AbnormalFindings, severity: u32, context: &str) -> String {
    format!(
        "{RULES}\n\nREFERENCE CONTEXT:\n{context}\n\n{WORKED_EXAMPLE}\n\n\
         PATIENT INPUT:\n{findings}\nSeverity Score: {severity}\n\n{RETURN_SKELETON}\n",
        findings = render_findings(findings),
    )
}

/// Render findings as a two-space indented JSON object in insertion order.
pub fn render_findings(findings: &AbnormalFindings) -> String {
    if findings.is_empty() {
        return "{}".to_string();
    }

    let body = findings
        .iter()
        .map(|(name, status)| format!("  {}: {}", json_string(name), json_string(status.as_str())))
        .collect::<Vec<_>>()
        .join(",\n");

    format!("{{\n{body}\n}}")
}

fn json_string(s: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}
