//! Configuration schema (colcascade.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a stage names the columns it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Keep the source column name verbatim
    Source,

    /// Use the business name when one is present, else the source name
    BusinessNameOrSource,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::Source
    }
}

/// Strip a prefix from column names arriving from a given stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    /// Upstream stage id the rule applies to
    pub from_stage: String,

    pub prefix: String,
}

impl PrefixRule {
    pub fn new(from_stage: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            from_stage: from_stage.into(),
            prefix: prefix.into(),
        }
    }
}

/// Per-stage cascading rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRule {
    #[serde(default)]
    pub naming: NamingConvention,

    /// Prefixes stripped on `main` edges, keyed by upstream stage
    #[serde(default)]
    pub strip_prefixes: Vec<PrefixRule>,

    /// Synthesize surrogate/business keys for dimensions and facts
    #[serde(default)]
    pub key_synthesis: bool,

    /// Append this stage's technical fields on same-stage `main` edges
    #[serde(default)]
    pub technical_fields_on_same_stage: bool,
}

impl Default for StageRule {
    fn default() -> Self {
        Self {
            naming: NamingConvention::Source,
            strip_prefixes: Vec::new(),
            key_synthesis: false,
            technical_fields_on_same_stage: false,
        }
    }
}

impl StageRule {
    /// Built-in rule for a canonical stage id
    pub fn builtin(stage_id: &str) -> Self {
        match stage_id {
            "s2" => Self {
                strip_prefixes: vec![PrefixRule::new("s1", "bronze_")],
                ..Self::default()
            },
            "s3" => Self {
                naming: NamingConvention::BusinessNameOrSource,
                key_synthesis: true,
                ..Self::default()
            },
            "s4" | "s5" | "s6" => Self {
                naming: NamingConvention::BusinessNameOrSource,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Prefix to strip for columns arriving from `from_stage`
    pub fn prefix_for(&self, from_stage: &str) -> Option<&str> {
        self.strip_prefixes
            .iter()
            .find(|rule| rule.from_stage == from_stage)
            .map(|rule| rule.prefix.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default for batch runs when the caller does not say
    #[serde(default = "default_true")]
    pub include_technical_fields: bool,

    /// Bound on columns taken over a `lookup` edge
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: usize,

    /// Dependency sweep passes; 0 derives the bound from the pending count
    #[serde(default)]
    pub max_sweep_passes: usize,

    /// Data type of synthesized surrogate keys
    #[serde(default = "default_surrogate_key_type")]
    pub surrogate_key_type: String,

    /// Type given to textual measures on fact targets
    #[serde(default = "default_measure_type")]
    pub measure_default_type: String,

    /// Stage rules keyed by stage id
    #[serde(default)]
    pub stages: BTreeMap<String, StageRule>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: std::path::PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_lookup_limit() -> usize {
    3
}

fn default_surrogate_key_type() -> String {
    "BIGINT".to_string()
}

fn default_measure_type() -> String {
    "DECIMAL(18,2)".to_string()
}

impl Default for Config {
    fn default() -> Self {
        let stages = ["s0", "s1", "s2", "s3", "s4", "s5", "s6"]
            .iter()
            .map(|id| (id.to_string(), StageRule::builtin(id)))
            .collect();

        Self {
            include_technical_fields: true,
            lookup_limit: default_lookup_limit(),
            max_sweep_passes: 0,
            surrogate_key_type: default_surrogate_key_type(),
            measure_default_type: default_measure_type(),
            stages,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.surrogate_key_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "surrogate_key_type must not be empty".to_string(),
            ));
        }
        for (stage, rule) in &self.stages {
            if rule.strip_prefixes.iter().any(|p| p.prefix.is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "stage {} has an empty strip prefix",
                    stage
                )));
            }
        }
        Ok(())
    }

    /// Rule for a stage: configured, else built-in
    pub fn stage_rule(&self, stage_id: &str) -> StageRule {
        self.stages
            .get(stage_id)
            .cloned()
            .unwrap_or_else(|| StageRule::builtin(stage_id))
    }

    /// Sweep bound for `pending` unresolved artifacts
    pub fn sweep_passes(&self, pending: usize) -> usize {
        if self.max_sweep_passes > 0 {
            self.max_sweep_passes
        } else {
            (pending * 2).max(1)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
