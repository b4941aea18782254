//! Diagnostic codes and cascade problem reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are written into batch reports.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Relation decoding
    /// Upstream id list and relation list have incompatible lengths
    CascadeRelationMismatch,

    /// A relation token is not one of main/get_key/lookup/pbi
    CascadeUnknownRelation,

    // Upstream resolution
    /// Referenced upstream artifact does not exist
    CascadeUpstreamMissing,

    /// Upstream artifact exists but has no columns yet
    CascadeUpstreamEmpty,

    /// The target artifact id is not in the workbook
    CascadeArtifactNotFound,

    /// Dependency ordering could not be resolved within the sweep budget
    CascadeUnresolvedDependency,

    // Derivation
    /// A column with the same name was already produced for the target
    CascadeDuplicateColumn,

    /// A get_key relation points into an artifact that is not a fact
    CascadeGetKeyNonFact,

    /// Artifact type could not be classified
    CascadeClassificationUnknown,

    // Persistence
    /// The metadata store rejected a read or write
    CascadeStoreError,

    // General
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CascadeRelationMismatch => "CASCADE_RELATION_MISMATCH",
            Self::CascadeUnknownRelation => "CASCADE_UNKNOWN_RELATION",
            Self::CascadeUpstreamMissing => "CASCADE_UPSTREAM_MISSING",
            Self::CascadeUpstreamEmpty => "CASCADE_UPSTREAM_EMPTY",
            Self::CascadeArtifactNotFound => "CASCADE_ARTIFACT_NOT_FOUND",
            Self::CascadeUnresolvedDependency => "CASCADE_UNRESOLVED_DEPENDENCY",
            Self::CascadeDuplicateColumn => "CASCADE_DUPLICATE_COLUMN",
            Self::CascadeGetKeyNonFact => "CASCADE_GET_KEY_NON_FACT",
            Self::CascadeClassificationUnknown => "CASCADE_CLASSIFICATION_UNKNOWN",
            Self::CascadeStoreError => "CASCADE_STORE_ERROR",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,

    /// Should be reviewed, the cascade still completed
    Warn,

    /// The artifact could not be cascaded
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Artifact being cascaded when the problem was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,

    /// Upstream artifact involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,

    /// Expected value (for comparison diagnostics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            artifact_id: None,
            upstream_id: None,
            expected: None,
            actual: None,
        }
    }

    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn with_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }

    pub fn with_upstream(mut self, upstream_id: impl Into<String>) -> Self {
        self.upstream_id = Some(upstream_id.into());
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(artifact) = &self.artifact_id {
            write!(f, " (artifact {})", artifact)?;
        }
        Ok(())
    }
}
