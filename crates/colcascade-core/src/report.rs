//! Batch report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::diagnostic::{Diagnostic, Severity};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Outcome of one artifact within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Columns were derived and persisted
    Cascaded,

    /// The artifact already had columns
    Skipped,

    /// No upstream declared, nothing to derive
    NoUpstream,

    /// The cascade raised an error
    Failed,
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cascaded => write!(f, "cascaded"),
            Self::Skipped => write!(f, "skipped"),
            Self::NoUpstream => write!(f, "no_upstream"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-artifact entry of a batch report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResult {
    pub artifact_id: String,

    pub status: ArtifactStatus,

    /// Number of columns written
    #[serde(default)]
    pub columns_added: usize,

    /// Number of candidate columns dropped as duplicates
    #[serde(default)]
    pub duplicates_skipped: usize,

    /// Processed after the dependency sweep gave up
    #[serde(default)]
    pub best_effort: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ArtifactResult {
    pub fn new(artifact_id: impl Into<String>, status: ArtifactStatus) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            status,
            columns_added: 0,
            duplicates_skipped: 0,
            best_effort: false,
            message: None,
        }
    }

    pub fn with_counts(mut self, columns_added: usize, duplicates_skipped: usize) -> Self {
        self.columns_added = columns_added;
        self.duplicates_skipped = duplicates_skipped;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every artifact processed without failure, in dependency order
    Complete,

    /// Some artifacts failed or were processed best-effort
    Partial,

    /// Every attempted artifact failed
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary statistics for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub cascaded: usize,
    pub skipped: usize,
    pub no_upstream: usize,
    pub failed: usize,

    /// Artifacts processed outside dependency order
    pub best_effort: usize,

    pub columns_added: usize,
    pub duplicates_skipped: usize,

    /// Diagnostics by severity
    pub errors: usize,
    pub warnings: usize,
}

/// Batch report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    pub status: BatchStatus,

    pub summary: ReportSummary,

    pub results: Vec<ArtifactResult>,

    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: BatchStatus::Complete,
            summary: ReportSummary::default(),
            results: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record an artifact outcome and refresh the aggregate status
    pub fn add_result(&mut self, result: ArtifactResult) {
        match result.status {
            ArtifactStatus::Cascaded => self.summary.cascaded += 1,
            ArtifactStatus::Skipped => self.summary.skipped += 1,
            ArtifactStatus::NoUpstream => self.summary.no_upstream += 1,
            ArtifactStatus::Failed => self.summary.failed += 1,
        }
        if result.best_effort {
            self.summary.best_effort += 1;
        }
        self.summary.columns_added += result.columns_added;
        self.summary.duplicates_skipped += result.duplicates_skipped;

        self.results.push(result);
        self.status = self.compute_status();
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn add_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.add_diagnostic(diagnostic);
        }
    }

    fn compute_status(&self) -> BatchStatus {
        let attempted = self.results.len();
        if attempted > 0 && self.summary.failed == attempted {
            BatchStatus::Failed
        } else if self.summary.failed > 0 || self.summary.best_effort > 0 {
            BatchStatus::Partial
        } else {
            BatchStatus::Complete
        }
    }

    /// Look up the result recorded for an artifact
    pub fn result_for(&self, artifact_id: &str) -> Option<&ArtifactResult> {
        self.results.iter().find(|r| r.artifact_id == artifact_id)
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    #[test]
    fn empty_report_is_complete() {
        let report = BatchReport::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.status, BatchStatus::Complete);
        assert!(!report.has_failures());
    }

    #[test]
    fn mixed_outcomes_are_partial() {
        let mut report = BatchReport::new();
        report.add_result(ArtifactResult::new("a1", ArtifactStatus::Cascaded).with_counts(4, 1));
        report.add_result(ArtifactResult::new("a2", ArtifactStatus::Failed).with_message("boom"));

        assert_eq!(report.status, BatchStatus::Partial);
        assert_eq!(report.summary.cascaded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.columns_added, 4);
        assert_eq!(report.summary.duplicates_skipped, 1);
    }

    #[test]
    fn best_effort_marks_partial() {
        let mut report = BatchReport::new();
        report.add_result(ArtifactResult::new("a1", ArtifactStatus::Cascaded).best_effort());
        assert_eq!(report.status, BatchStatus::Partial);
        assert_eq!(report.summary.best_effort, 1);
    }

    #[test]
    fn all_failed_is_failed() {
        let mut report = BatchReport::new();
        report.add_result(ArtifactResult::new("a1", ArtifactStatus::Failed));
        report.add_result(ArtifactResult::new("a2", ArtifactStatus::Failed));
        assert_eq!(report.status, BatchStatus::Failed);
    }

    #[test]
    fn report_serialization() {
        let mut report = BatchReport::new();
        report.add_diagnostic(Diagnostic::warn(DiagnosticCode::CascadeUpstreamEmpty, "a0 has no columns"));
        assert_eq!(report.summary.warnings, 1);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"complete\""));
        assert!(json.contains("CASCADE_UPSTREAM_EMPTY"));
    }
}
