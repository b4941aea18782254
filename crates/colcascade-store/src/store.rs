//! Metadata store trait
//!
//! The cascading engine reads stages, artifacts, columns, type mappings and
//! technical field catalogues through this trait, and writes columns back.
//! Implementations decide the physical format.

use colcascade_core::{Artifact, Column, Stage, TechnicalField, TypeMappingTable};

/// Errors raised by a metadata store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid workbook: {0}")]
    Invalid(String),

    #[error("Artifact not found: {0}")]
    UnknownArtifact(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Workbook was modified externally since it was loaded: {0}")]
    Conflict(String),
}

/// Read/write access to the workbook tables
///
/// A cascading run is the sole reader and writer of the store; implementations
/// need no locking.
pub trait MetadataStore {
    /// Store name used in logs
    fn name(&self) -> &str;

    /// All stages, in any order
    fn stages(&self) -> Result<Vec<Stage>, StoreError>;

    /// All artifacts, in workbook order
    fn artifacts(&self) -> Result<Vec<Artifact>, StoreError>;

    /// Columns of one artifact ordered by `order`, or every column when `None`
    fn columns(&self, artifact_id: Option<&str>) -> Result<Vec<Column>, StoreError>;

    fn type_mappings(&self) -> Result<TypeMappingTable, StoreError>;

    /// Technical field catalogue entries for a stage
    fn technical_field_catalog(&self, stage_id: &str) -> Result<Vec<TechnicalField>, StoreError>;

    /// Add rows for an artifact without touching any other row
    fn append_columns(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError>;

    /// Swap an artifact's rows for a new set
    fn replace_columns_for_artifact(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError>;

    fn delete_columns_for_artifact(&mut self, artifact_id: &str) -> Result<(), StoreError>;

    /// Look up one artifact
    fn artifact(&self, artifact_id: &str) -> Result<Option<Artifact>, StoreError> {
        Ok(self.artifacts()?.into_iter().find(|a| a.id == artifact_id))
    }

    /// Look up one stage
    fn stage(&self, stage_id: &str) -> Result<Option<Stage>, StoreError> {
        Ok(self.stages()?.into_iter().find(|s| s.id == stage_id))
    }
}
