//! colcascade core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes or column group tokens - they are written
//! into workbooks and reports.

pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod model;
pub mod report;

pub use catalog::{FieldScope, TechnicalField, TechnicalFieldCatalog, TypeMapping, TypeMappingTable};
pub use config::{Config, ConfigError, NamingConvention, PrefixRule, StageRule};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use model::{
    Artifact, ArtifactType, Column, ColumnGroup, ColumnId, ParseRelationError, RelationType, Stage,
    StageSide,
};
pub use report::{ArtifactResult, ArtifactStatus, BatchReport, BatchStatus, ReportSummary, ReportVersion};
