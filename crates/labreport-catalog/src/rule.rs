//! Catalog rule types and configuration schema.
//!
//! A `CatalogConfig` is deserialized from TOML. Alias and recommendation
//! rules are evaluated in declaration order; the first matching rule wins.

use serde::{Deserialize, Serialize};

/// Maps test names onto one canonical key by substring containment.
///
/// Example in TOML:
/// ```toml
/// [[aliases]]
/// key = "wbc"
/// contains = ["wbc", "white blood"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasRule {
    /// The canonical key produced when this rule matches.
    pub key: String,

    /// Lowercase fragments; any one of them appearing in the lowercased
    /// test name is a match.
    pub contains: Vec<String>,
}

impl AliasRule {
    /// Return true if `lowered` (an already-lowercased test name) contains
    /// any of this rule's fragments.
    pub fn matches(&self, lowered: &str) -> bool {
        self.contains.iter().any(|fragment| lowered.contains(fragment.as_str()))
    }
}

/// The normal interval for one canonical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeEntry {
    pub key: String,
    pub low: f64,
    pub high: f64,
}

/// Maps pattern labels onto one piece of lifestyle guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRule {
    /// Stable identifier used in logs.
    pub id: String,

    /// Lowercase fragments matched against the lowercased pattern label.
    pub keywords: Vec<String>,

    /// The recommendation emitted when this rule matches.
    pub text: String,
}

impl RecommendationRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Recommendation lines used when no rule applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationFallback {
    /// Emitted for a label that matches no rule.
    pub generic: String,

    /// Emitted, alone, when there are no labels at all.
    pub no_patterns: String,
}

/// The top-level structure deserialized from a catalog TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Lowercase fragments that mark a text span as a lab row.
    pub keywords: Vec<String>,

    /// Ordered canonicalization rules. First match wins.
    #[serde(default)]
    pub aliases: Vec<AliasRule>,

    #[serde(default)]
    pub ranges: Vec<RangeEntry>,

    /// Ordered recommendation rules. First match wins.
    #[serde(default)]
    pub recommendations: Vec<RecommendationRule>,

    pub fallback: RecommendationFallback,
}
