//! Rule-based recommendation engine.
//!
//! `RecommendationEngine` maps each pattern label to exactly one line of
//! guidance:
//!
//! 1. Lowercase the label.
//! 2. The first rule with a keyword contained in the label supplies the text.
//! 3. If no rule matches, the generic fallback is used.
//!
//! An empty label list produces the single `no_patterns` line so the output
//! is never empty.

use tracing::debug;

use crate::rule::{RecommendationFallback, RecommendationRule};

/// Ordered keyword rules from pattern labels to fixed-vocabulary guidance.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    rules: Vec<RecommendationRule>,
    fallback: RecommendationFallback,
}

impl RecommendationEngine {
    pub fn new(rules: Vec<RecommendationRule>, fallback: RecommendationFallback) -> Self {
        Self { rules, fallback }
    }

    /// The recommendation for a single label.
    pub fn recommend(&self, label: &str) -> &str {
        let lowered = label.to_lowercase();
        match self.rules.iter().find(|rule| rule.matches(&lowered)) {
            Some(rule) => {
                debug!(rule_id = %rule.id, label, "recommendation rule matched");
                &rule.text
            }
            None => {
                debug!(label, "no recommendation rule matched; using generic guidance");
                &self.fallback.generic
            }
        }
    }

    /// One recommendation per label, in label order.
    pub fn synthesize(&self, labels: &[String]) -> Vec<String> {
        if labels.is_empty() {
            return vec![self.fallback.no_patterns.clone()];
        }
        labels
            .iter()
            .map(|label| self.recommend(label).to_string())
            .collect()
    }

    pub fn generic(&self) -> &str {
        &self.fallback.generic
    }
}
