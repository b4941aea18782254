//! Type mapping table and technical field catalogue
//!
//! Both are normally read from the workbook; the built-in tables below are
//! used when a workbook carries none.

use crate::model::{ArtifactType, ColumnGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platforms with a column in the built-in mapping table
pub const PLATFORM_SQL_SERVER: &str = "SQL Server";
pub const PLATFORM_DATABRICKS: &str = "Databricks";
pub const PLATFORM_POWER_BI: &str = "Power BI";

/// Normalize a platform name for comparison
///
/// Case-insensitive, ignores spaces, underscores and dashes:
/// `"Power BI"`, `"power_bi"` and `"POWERBI"` are the same platform.
pub fn platform_key(platform: &str) -> String {
    platform
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One row of the mapping table: a canonical source type and its
/// equivalent on each target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Canonical source type name (e.g. "VARCHAR")
    pub source: String,

    /// Target type per platform
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TypeMapping {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            targets: BTreeMap::new(),
            notes: None,
        }
    }

    pub fn with_target(mut self, platform: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.targets.insert(platform.into(), data_type.into());
        self
    }

    /// Target type for a platform, if this row has a column for it
    pub fn target(&self, platform: &str) -> Option<&str> {
        let key = platform_key(platform);
        self.targets
            .iter()
            .find(|(name, _)| platform_key(name) == key)
            .map(|(_, data_type)| data_type.as_str())
    }
}

/// Mapping table keyed by canonical source type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMappingTable {
    rows: Vec<TypeMapping>,
}

impl TypeMappingTable {
    pub fn new(rows: Vec<TypeMapping>) -> Self {
        Self { rows }
    }

    /// Find the row for a source type (case-insensitive, trimmed)
    pub fn lookup(&self, source_type: &str) -> Option<&TypeMapping> {
        let wanted = source_type.trim().to_uppercase();
        self.rows
            .iter()
            .find(|row| row.source.trim().to_uppercase() == wanted)
    }

    pub fn rows(&self) -> &[TypeMapping] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Built-in SQL Server / Databricks / Power BI table
    pub fn builtin() -> Self {
        const ROWS: &[(&str, &str, &str, &str)] = &[
            // Numeric
            ("INT", "INT", "INT", "INT64"),
            ("BIGINT", "BIGINT", "BIGINT", "INT64"),
            ("SMALLINT", "SMALLINT", "SMALLINT", "INT64"),
            ("TINYINT", "TINYINT", "TINYINT", "INT64"),
            ("BIT", "BIT", "BOOLEAN", "Boolean"),
            ("DECIMAL", "DECIMAL(18,2)", "DECIMAL(18,2)", "Decimal"),
            ("NUMERIC", "NUMERIC(18,2)", "NUMERIC(18,2)", "Decimal"),
            ("FLOAT", "FLOAT", "FLOAT", "Double"),
            ("REAL", "REAL", "REAL", "Double"),
            ("MONEY", "MONEY", "DECIMAL(19,4)", "Decimal"),
            ("DOUBLE", "FLOAT", "DOUBLE", "Double"),
            // String
            ("CHAR", "CHAR(255)", "CHAR(255)", "String"),
            ("VARCHAR", "VARCHAR(MAX)", "STRING", "String"),
            ("TEXT", "NVARCHAR(MAX)", "STRING", "String"),
            ("NCHAR", "NCHAR(255)", "STRING", "String"),
            ("NVARCHAR", "NVARCHAR(MAX)", "STRING", "String"),
            ("NTEXT", "NVARCHAR(MAX)", "STRING", "String"),
            ("STRING", "NVARCHAR(MAX)", "STRING", "String"),
            // Date/time
            ("DATE", "DATE", "DATE", "Date"),
            ("DATETIME", "DATETIME", "TIMESTAMP", "DateTime"),
            ("DATETIME2", "DATETIME2", "TIMESTAMP", "DateTime"),
            ("SMALLDATETIME", "SMALLDATETIME", "TIMESTAMP", "DateTime"),
            ("TIME", "TIME", "TIME", "Time"),
            ("TIMESTAMP", "DATETIME2", "TIMESTAMP", "DateTime"),
            // Binary
            ("BINARY", "BINARY(8000)", "BINARY", "Binary"),
            ("VARBINARY", "VARBINARY(MAX)", "BINARY", "Binary"),
            ("IMAGE", "VARBINARY(MAX)", "BINARY", "Binary"),
            // Special
            ("UNIQUEIDENTIFIER", "UNIQUEIDENTIFIER", "STRING", "String"),
            ("XML", "XML", "STRING", "String"),
            ("JSON", "NVARCHAR(MAX)", "STRING", "String"),
            ("BOOLEAN", "BIT", "BOOLEAN", "Boolean"),
        ];

        let rows = ROWS
            .iter()
            .map(|(source, sql_server, databricks, power_bi)| {
                TypeMapping::new(*source)
                    .with_target(PLATFORM_SQL_SERVER, *sql_server)
                    .with_target(PLATFORM_DATABRICKS, *databricks)
                    .with_target(PLATFORM_POWER_BI, *power_bi)
            })
            .collect();

        Self { rows }
    }
}

/// Which artifact types a technical field applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    #[default]
    All,
    Dimension,
    Fact,
    Bridge,
}

impl FieldScope {
    pub fn applies_to(&self, artifact_type: ArtifactType) -> bool {
        match self {
            Self::All => true,
            Self::Dimension => artifact_type == ArtifactType::Dimension,
            Self::Fact => artifact_type == ArtifactType::Fact,
            Self::Bridge => artifact_type == ArtifactType::Bridge,
        }
    }
}

fn default_technical_group() -> ColumnGroup {
    ColumnGroup::TechnicalField
}

/// A catalogue entry for one pipeline-internal column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalField {
    pub name: String,

    pub data_type: String,

    /// `technical_field` or `partition_field`
    #[serde(default = "default_technical_group")]
    pub group: ColumnGroup,

    /// Whether the stage emits this field at all
    pub emitted_here: bool,

    /// Whether the field may propagate into the next stage over `main`
    pub continues_forward: bool,

    #[serde(default)]
    pub scope: FieldScope,
}

impl TechnicalField {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            group: ColumnGroup::TechnicalField,
            emitted_here: true,
            continues_forward: false,
            scope: FieldScope::All,
        }
    }

    pub fn partition(mut self) -> Self {
        self.group = ColumnGroup::PartitionField;
        self
    }

    pub fn emitted(mut self, emitted_here: bool) -> Self {
        self.emitted_here = emitted_here;
        self
    }

    pub fn continues(mut self, continues_forward: bool) -> Self {
        self.continues_forward = continues_forward;
        self
    }

    pub fn with_scope(mut self, scope: FieldScope) -> Self {
        self.scope = scope;
        self
    }

    /// Both flags set: the field may leave its stage
    pub fn passes_gate(&self) -> bool {
        self.emitted_here && self.continues_forward
    }
}

/// Technical fields per stage id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnicalFieldCatalog {
    stages: BTreeMap<String, Vec<TechnicalField>>,
}

impl TechnicalFieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage_id: impl Into<String>, fields: Vec<TechnicalField>) -> Self {
        self.stages.insert(stage_id.into(), fields);
        self
    }

    /// Entries for a stage (empty when the stage has none)
    pub fn for_stage(&self, stage_id: &str) -> &[TechnicalField] {
        self.stages.get(stage_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, stage_id: &str, name: &str) -> Option<&TechnicalField> {
        self.for_stage(stage_id).iter().find(|field| field.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }

    /// Bronze, silver and gold fields of the standard pipeline
    ///
    /// Partition placeholders (`xxx`, `XXX`) stand for the business date
    /// column chosen per table; they are matched by exact name.
    pub fn builtin() -> Self {
        let bronze = vec![
            TechnicalField::new("__SourceSystem", "STRING").continues(true),
            TechnicalField::new("__SourceFileName", "STRING").continues(true),
            TechnicalField::new("__SourceFilePath", "STRING").continues(true),
            TechnicalField::new("__1_bronze_insert_dt", "TIMESTAMP").continues(true),
            TechnicalField::new("__1_bronze_Partition_InsertYear", "INT").partition(),
            TechnicalField::new("__1_bronze_Partition_InsertMonth", "INT").partition(),
            TechnicalField::new("__1_bronze_Partition_insertDate", "INT").partition(),
        ];

        let silver = vec![
            TechnicalField::new("__2_silver_last_update_dt", "TIMESTAMP"),
            TechnicalField::new("__silverPartition_xxxYear", "INT").partition().emitted(false),
            TechnicalField::new("__silverPartition_xxxMonth", "INT").partition().emitted(false),
            TechnicalField::new("__silverPartition_xxxDate", "INT").partition().emitted(false),
            TechnicalField::new("__silver_validFrom", "TIMESTAMP")
                .emitted(false)
                .with_scope(FieldScope::Dimension),
            TechnicalField::new("__silver_validTo", "TIMESTAMP")
                .emitted(false)
                .with_scope(FieldScope::Dimension),
        ];

        let gold = vec![
            TechnicalField::new("__3_gold_last_update_dt", "TIMESTAMP").continues(true),
            TechnicalField::new("__goldPartition_XXXYear", "INT").partition().emitted(false),
            TechnicalField::new("__goldPartition_XXXMonth", "INT").partition().emitted(false),
            TechnicalField::new("__goldPartition_XXXDate", "INT").partition().emitted(false),
        ];

        Self::new()
            .with_stage("s1", bronze)
            .with_stage("s2", silver)
            .with_stage("s3", gold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_keys_normalize() {
        assert_eq!(platform_key("Power BI"), platform_key("power_bi"));
        assert_eq!(platform_key("SQL Server"), "sqlserver");
        assert_ne!(platform_key("Azure SQL"), platform_key("SQL Server"));
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        let table = TypeMappingTable::builtin();
        let row = table.lookup(" varchar ").unwrap();
        assert_eq!(row.target("Databricks"), Some("STRING"));
        assert_eq!(row.target("power bi"), Some("String"));
        assert_eq!(row.target("Azure SQL"), None);
        assert!(table.lookup("GEOGRAPHY").is_none());
    }

    #[test]
    fn builtin_catalog_gates() {
        let catalog = TechnicalFieldCatalog::builtin();

        let cdc = catalog.find("s1", "__1_bronze_insert_dt").unwrap();
        assert!(cdc.passes_gate());

        let partition = catalog.find("s1", "__1_bronze_Partition_InsertYear").unwrap();
        assert_eq!(partition.group, ColumnGroup::PartitionField);
        assert!(partition.emitted_here);
        assert!(!partition.passes_gate());

        assert!(!catalog.find("s2", "__silverPartition_xxxDate").unwrap().emitted_here);
        assert!(catalog.for_stage("s4").is_empty());
    }

    #[test]
    fn scope_filters_artifact_types() {
        assert!(FieldScope::All.applies_to(ArtifactType::Unknown));
        assert!(FieldScope::Dimension.applies_to(ArtifactType::Dimension));
        assert!(!FieldScope::Dimension.applies_to(ArtifactType::Fact));
    }

    #[test]
    fn catalog_deserializes_with_defaults() {
        let json = r#"{
            "s1": [{ "name": "__load_dt", "data_type": "TIMESTAMP", "emitted_here": true, "continues_forward": false }]
        }"#;
        let catalog: TechnicalFieldCatalog = serde_json::from_str(json).unwrap();
        let field = catalog.find("s1", "__load_dt").unwrap();
        assert_eq!(field.group, ColumnGroup::TechnicalField);
        assert_eq!(field.scope, FieldScope::All);
    }
}
