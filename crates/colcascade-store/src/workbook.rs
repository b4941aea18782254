//! JSON workbook store
//!
//! A workbook holds the stage, artifact and column tables plus optional
//! type-mapping and technical-field sections. Loading records a SHA-256
//! fingerprint of the file so a later save can refuse to clobber edits made
//! by someone else in the meantime.

use crate::store::{MetadataStore, StoreError};
use colcascade_core::{
    Artifact, Column, Stage, StageSide, TechnicalField, TechnicalFieldCatalog, TypeMappingTable,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The seven stages of the standard pipeline
pub fn standard_stages() -> Vec<Stage> {
    const STAGES: &[(&str, &str, &str)] = &[
        ("s0", "0_drop_zone", "Azure SQL"),
        ("s1", "1_bronze", "Azure SQL"),
        ("s2", "2_silver", "Azure SQL"),
        ("s3", "3_gold", "Azure SQL"),
        ("s4", "4_mart", "Azure SQL"),
        ("s5", "5_PBI_Model", "Power BI"),
        ("s6", "6_PBI_Reports", "Power BI"),
    ];

    STAGES
        .iter()
        .enumerate()
        .map(|(position, (id, name, platform))| {
            let side = if position < 2 { StageSide::Source } else { StageSide::Business };
            Stage::new(*id, *name, position as u32, *platform).with_side(side)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedFrom {
    path: PathBuf,
    fingerprint: String,
}

/// In-memory workbook backed by a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub stages: Vec<Stage>,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Overrides the built-in mapping table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_mappings: Option<TypeMappingTable>,

    /// Overrides the built-in technical field catalogue when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_fields: Option<TechnicalFieldCatalog>,

    #[serde(skip)]
    loaded_from: Option<LoadedFrom>,
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl Workbook {
    /// Empty workbook with the standard stages
    pub fn new() -> Self {
        Self {
            stages: standard_stages(),
            ..Self::default()
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn with_technical_fields(mut self, catalog: TechnicalFieldCatalog) -> Self {
        self.technical_fields = Some(catalog);
        self
    }

    pub fn with_type_mappings(mut self, table: TypeMappingTable) -> Self {
        self.type_mappings = Some(table);
        self
    }

    /// Load a workbook from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StoreError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut workbook: Workbook = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::ParseError(e.to_string()))?;
        workbook.validate()?;

        workbook.loaded_from = Some(LoadedFrom {
            path: path.to_path_buf(),
            fingerprint: fingerprint(&bytes),
        });

        tracing::debug!(
            path = %path.display(),
            artifacts = workbook.artifacts.len(),
            columns = workbook.columns.len(),
            "loaded workbook"
        );
        Ok(workbook)
    }

    /// Parse a workbook from a JSON string
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let workbook: Workbook = serde_json::from_str(json)
            .map_err(|e| StoreError::ParseError(e.to_string()))?;
        workbook.validate()?;
        Ok(workbook)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::SerializeError(e.to_string()))
    }

    /// Save to a JSON file
    ///
    /// Saving over the file this workbook was loaded from fails with
    /// [`StoreError::Conflict`] when the file changed on disk since loading.
    pub fn save_to_file(&mut self, path: &Path) -> Result<(), StoreError> {
        if let Some(loaded) = &self.loaded_from {
            if loaded.path == path && path.exists() {
                let current = std::fs::read(path)
                    .map_err(|e| StoreError::IoError(format!("{}: {}", path.display(), e)))?;
                if fingerprint(&current) != loaded.fingerprint {
                    return Err(StoreError::Conflict(path.display().to_string()));
                }
            }
        }

        let json = self.to_json()?;
        std::fs::write(path, json.as_bytes())
            .map_err(|e| StoreError::IoError(format!("{}: {}", path.display(), e)))?;

        self.loaded_from = Some(LoadedFrom {
            path: path.to_path_buf(),
            fingerprint: fingerprint(json.as_bytes()),
        });
        Ok(())
    }

    /// Save back to the file this workbook was loaded from
    pub fn save(&mut self) -> Result<(), StoreError> {
        let path = self
            .loaded_from
            .as_ref()
            .map(|loaded| loaded.path.clone())
            .ok_or_else(|| StoreError::IoError("workbook was not loaded from a file".to_string()))?;
        self.save_to_file(&path)
    }

    /// SHA-256 of the file contents at load (or last save)
    pub fn fingerprint(&self) -> Option<&str> {
        self.loaded_from.as_ref().map(|loaded| loaded.fingerprint.as_str())
    }

    fn validate(&self) -> Result<(), StoreError> {
        let mut stage_ids = HashSet::new();
        for stage in &self.stages {
            if !stage_ids.insert(stage.id.as_str()) {
                return Err(StoreError::Invalid(format!("duplicate stage id {}", stage.id)));
            }
        }

        let mut artifact_ids = HashSet::new();
        for artifact in &self.artifacts {
            if !artifact_ids.insert(artifact.id.as_str()) {
                return Err(StoreError::Invalid(format!("duplicate artifact id {}", artifact.id)));
            }
            if !stage_ids.contains(artifact.stage_id.as_str()) {
                return Err(StoreError::Invalid(format!(
                    "artifact {} references unknown stage {}",
                    artifact.id, artifact.stage_id
                )));
            }
        }

        if let Some(orphan) = self
            .columns
            .iter()
            .find(|c| !artifact_ids.contains(c.artifact_id.as_str()))
        {
            return Err(StoreError::Invalid(format!(
                "column {} references unknown artifact {}",
                orphan.name, orphan.artifact_id
            )));
        }

        Ok(())
    }

    fn ensure_artifact(&self, artifact_id: &str) -> Result<(), StoreError> {
        if self.artifacts.iter().any(|a| a.id == artifact_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownArtifact(artifact_id.to_string()))
        }
    }

    fn ensure_owned(artifact_id: &str, columns: &[Column]) -> Result<(), StoreError> {
        match columns.iter().find(|c| c.artifact_id != artifact_id) {
            Some(stray) => Err(StoreError::WriteRejected(format!(
                "column {} belongs to {}, not {}",
                stray.name, stray.artifact_id, artifact_id
            ))),
            None => Ok(()),
        }
    }
}

impl MetadataStore for Workbook {
    fn name(&self) -> &str {
        "workbook"
    }

    fn stages(&self) -> Result<Vec<Stage>, StoreError> {
        Ok(self.stages.clone())
    }

    fn artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        Ok(self.artifacts.clone())
    }

    fn columns(&self, artifact_id: Option<&str>) -> Result<Vec<Column>, StoreError> {
        match artifact_id {
            None => Ok(self.columns.clone()),
            Some(id) => {
                let mut columns: Vec<Column> = self
                    .columns
                    .iter()
                    .filter(|c| c.artifact_id == id)
                    .cloned()
                    .collect();
                columns.sort_by_key(|c| c.order);
                Ok(columns)
            }
        }
    }

    fn type_mappings(&self) -> Result<TypeMappingTable, StoreError> {
        Ok(self
            .type_mappings
            .clone()
            .unwrap_or_else(TypeMappingTable::builtin))
    }

    fn technical_field_catalog(&self, stage_id: &str) -> Result<Vec<TechnicalField>, StoreError> {
        let fields = match &self.technical_fields {
            Some(catalog) => catalog.for_stage(stage_id).to_vec(),
            None => TechnicalFieldCatalog::builtin().for_stage(stage_id).to_vec(),
        };
        Ok(fields)
    }

    fn append_columns(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError> {
        self.ensure_artifact(artifact_id)?;
        Self::ensure_owned(artifact_id, &columns)?;
        self.columns.extend(columns);
        Ok(())
    }

    fn replace_columns_for_artifact(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError> {
        self.ensure_artifact(artifact_id)?;
        Self::ensure_owned(artifact_id, &columns)?;
        self.columns.retain(|c| c.artifact_id != artifact_id);
        self.columns.extend(columns);
        Ok(())
    }

    fn delete_columns_for_artifact(&mut self, artifact_id: &str) -> Result<(), StoreError> {
        self.ensure_artifact(artifact_id)?;
        self.columns.retain(|c| c.artifact_id != artifact_id);
        Ok(())
    }
}
