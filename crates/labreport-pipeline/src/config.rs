//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! min_text_chars = 20
//! catalog = "catalogs/hospital.toml"
//! knowledge_path = "knowledge/reference.txt"
//!
//! [generator]
//! program = "ollama"
//! args = ["run", "mistral:7b-instruct"]
//! timeout_secs = 120
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use labreport_catalog::ReferenceCatalog;
use labreport_contracts::error::{LabReportError, LabReportResult};

/// Minimum trimmed text length accepted from a document.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_text_chars: usize,
    /// Catalog TOML file. The built-in catalog is used when unset.
    pub catalog: Option<PathBuf>,
    /// Free-text reference context for the prompt.
    pub knowledge_path: Option<PathBuf>,
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            catalog: None,
            knowledge_path: None,
            generator: GeneratorConfig::default(),
        }
    }
}

/// The local model runner invoked once per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Kill the runner after this many seconds. No limit when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "ollama".to_string(),
            args: vec!["run".to_string(), "mistral:7b-instruct".to_string()],
            timeout_secs: None,
        }
    }
}

impl GeneratorConfig {
    /// Parse a whitespace-separated command line such as `"ollama run llama3"`.
    ///
    /// Returns `ConfigError` for an empty command.
    pub fn from_command_line(command: &str) -> LabReportResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| LabReportError::ConfigError {
            reason: "generator command is empty".to_string(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout_secs: None,
        })
    }
}

impl PipelineConfig {
    /// Parse `s` as pipeline TOML.
    ///
    /// Returns `LabReportError::ConfigError` if the TOML is malformed or has
    /// fields of the wrong type.
    pub fn from_toml_str(s: &str) -> LabReportResult<Self> {
        toml::from_str(s).map_err(|e| LabReportError::ConfigError {
            reason: format!("failed to parse pipeline TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> LabReportResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LabReportError::ConfigError {
            reason: format!("failed to read pipeline config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> LabReportResult<ReferenceCatalog> {
        match &self.catalog {
            Some(path) => ReferenceCatalog::from_file(path),
            None => ReferenceCatalog::builtin(),
        }
    }
}
