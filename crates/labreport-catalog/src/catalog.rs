//! TOML-driven reference catalog.
//!
//! `ReferenceCatalog` loads a `CatalogConfig` from a TOML string or file,
//! validates it once, and then answers the three questions the pipeline
//! asks of it:
//!
//! - does this text span name a lab test at all? (`is_lab_name`)
//! - which canonical test is it? (`canonicalize`)
//! - what is the normal range for that test? (`range`)
//!
//! The catalog is immutable after construction and is passed explicitly to
//! every component that needs it.

use std::{collections::HashMap, path::Path};

use tracing::debug;

use labreport_contracts::{
    error::{LabReportError, LabReportResult},
    lab::{ReferenceRange, TestKey},
};

use crate::{recommend::RecommendationEngine, rule::CatalogConfig};

/// The catalog compiled into the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../catalogs/default.toml");

/// Reference ranges, keyword gate and canonicalization rules.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    config: CatalogConfig,
    ranges: HashMap<TestKey, ReferenceRange>,
    recommendations: RecommendationEngine,
}

impl ReferenceCatalog {
    /// Parse `s` as TOML and build a validated catalog.
    ///
    /// Returns `LabReportError::ConfigError` if the TOML is malformed, does
    /// not match `CatalogConfig`, or fails validation.
    pub fn from_toml_str(s: &str) -> LabReportResult<Self> {
        let mut config: CatalogConfig =
            toml::from_str(s).map_err(|e| LabReportError::ConfigError {
                reason: format!("failed to parse catalog TOML: {}", e),
            })?;
        normalize(&mut config);
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a catalog.
    pub fn from_file(path: &Path) -> LabReportResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LabReportError::ConfigError {
            reason: format!("failed to read catalog file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The built-in blood report catalog.
    pub fn builtin() -> LabReportResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    fn from_config(config: CatalogConfig) -> LabReportResult<Self> {
        if config.keywords.iter().all(|k| k.is_empty()) {
            return Err(LabReportError::ConfigError {
                reason: "catalog must declare at least one non-empty keyword".to_string(),
            });
        }

        let mut ranges = HashMap::new();
        for entry in &config.ranges {
            if !(entry.low <= entry.high) {
                return Err(LabReportError::ConfigError {
                    reason: format!(
                        "range for key '{}' has low {} above high {}",
                        entry.key, entry.low, entry.high
                    ),
                });
            }
            let key = TestKey::new(entry.key.clone());
            if ranges.insert(key, ReferenceRange::new(entry.low, entry.high)).is_some() {
                return Err(LabReportError::ConfigError {
                    reason: format!("duplicate range for key '{}'", entry.key),
                });
            }
        }

        for alias in &config.aliases {
            if alias.contains.is_empty() || alias.contains.iter().any(String::is_empty) {
                return Err(LabReportError::ConfigError {
                    reason: format!("alias key '{}' has an empty match fragment", alias.key),
                });
            }
            if !ranges.contains_key(&TestKey::new(alias.key.clone())) {
                return Err(LabReportError::ConfigError {
                    reason: format!("alias key '{}' has no reference range", alias.key),
                });
            }
        }

        for rule in &config.recommendations {
            if rule.keywords.is_empty() || rule.keywords.iter().any(String::is_empty) {
                return Err(LabReportError::ConfigError {
                    reason: format!("recommendation rule '{}' has an empty keyword", rule.id),
                });
            }
        }

        debug!(
            keywords = config.keywords.len(),
            aliases = config.aliases.len(),
            ranges = ranges.len(),
            recommendation_rules = config.recommendations.len(),
            "reference catalog loaded"
        );

        let recommendations =
            RecommendationEngine::new(config.recommendations.clone(), config.fallback.clone());

        Ok(Self {
            config,
            ranges,
            recommendations,
        })
    }

    /// The keyword set that gates extraction.
    pub fn keywords(&self) -> &[String] {
        &self.config.keywords
    }

    /// Return true if `name` contains at least one catalog keyword.
    ///
    /// Matching is by substring on the lowercased name so that multi-word
    /// keywords such as "c-reactive protein" are honored.
    pub fn is_lab_name(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.config
            .keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    }

    /// Map a test name onto its canonical key. First matching alias wins.
    pub fn canonicalize(&self, test_name: &str) -> Option<TestKey> {
        let lowered = test_name.to_lowercase();
        self.config
            .aliases
            .iter()
            .find(|alias| alias.matches(&lowered))
            .map(|alias| TestKey::new(alias.key.clone()))
    }

    pub fn range(&self, key: &TestKey) -> Option<ReferenceRange> {
        self.ranges.get(key).copied()
    }

    pub fn recommendations(&self) -> &RecommendationEngine {
        &self.recommendations
    }

    /// Render the effective catalog back to TOML.
    pub fn to_toml_string(&self) -> LabReportResult<String> {
        toml::to_string_pretty(&self.config).map_err(|e| LabReportError::ConfigError {
            reason: format!("failed to render catalog TOML: {}", e),
        })
    }
}

/// Lowercase every matching fragment so lookups need only lowercase the input.
fn normalize(config: &mut CatalogConfig) {
    for keyword in &mut config.keywords {
        *keyword = keyword.trim().to_lowercase();
    }
    for alias in &mut config.aliases {
        for fragment in &mut alias.contains {
            *fragment = fragment.trim().to_lowercase();
        }
    }
    for rule in &mut config.recommendations {
        for keyword in &mut rule.keywords {
            *keyword = keyword.trim().to_lowercase();
        }
    }
}
