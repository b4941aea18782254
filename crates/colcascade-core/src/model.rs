//! Workbook data model: stages, artifacts and columns

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the pipeline a stage faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageSide {
    /// Source-facing (drop zone, bronze): technical names, primary keys lead
    Source,

    /// Business-facing (silver onwards)
    Business,
}

/// One layer of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage identifier (e.g. "s1")
    pub id: String,

    /// Display name (e.g. "1_bronze")
    pub name: String,

    /// Ordinal position in the fixed stage order
    pub position: u32,

    /// Target platform used for data type translation
    #[serde(default)]
    pub platform: String,

    /// Explicit side; inferred from the stage id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<StageSide>,
}

impl Stage {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: u32, platform: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            platform: platform.into(),
            side: None,
        }
    }

    pub fn with_side(mut self, side: StageSide) -> Self {
        self.side = Some(side);
        self
    }

    /// Effective side of the stage
    ///
    /// The drop zone and bronze stages (`s0`, `s1`) are source-facing unless the
    /// stage record says otherwise; everything else is business-facing.
    pub fn side(&self) -> StageSide {
        match self.side {
            Some(side) => side,
            None if matches!(self.id.as_str(), "s0" | "s1") => StageSide::Source,
            None => StageSide::Business,
        }
    }
}

/// Conceptual role of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Dimension,
    Fact,
    Bridge,
    Unknown,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dimension => "dimension",
            Self::Fact => "fact",
            Self::Bridge => "bridge",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an explicit type field; `None` when it names no known type
    pub fn from_explicit(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dimension" | "dim" => Some(Self::Dimension),
            "fact" => Some(Self::Fact),
            "bridge" => Some(Self::Bridge),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logical table or view tracked across stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Identifier, unique within the workbook
    pub id: String,

    pub name: String,

    /// Owning stage id
    pub stage_id: String,

    /// Explicit type field as written in the workbook (may be empty)
    #[serde(default)]
    pub artifact_type: String,

    /// Free-form topology hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,

    /// Semicolon-delimited upstream artifact ids
    #[serde(default)]
    pub upstream_artifact: String,

    /// Semicolon-delimited relation tokens, parallel to `upstream_artifact`
    #[serde(default)]
    pub upstream_relation: String,
}

impl Artifact {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stage_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stage_id: stage_id.into(),
            artifact_type: String::new(),
            topology: None,
            upstream_artifact: String::new(),
            upstream_relation: String::new(),
        }
    }

    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self
    }

    /// Set the raw upstream encoding (`"a1;a2"`, `"main;get_key"`)
    pub fn with_upstream(mut self, artifacts: impl Into<String>, relations: impl Into<String>) -> Self {
        self.upstream_artifact = artifacts.into();
        self.upstream_relation = relations.into();
        self
    }

    /// Whether an upstream is declared: both lists need a non-blank entry
    pub fn has_upstream(&self) -> bool {
        let declared = |raw: &str| raw.split(';').any(|item| !item.trim().is_empty());
        declared(&self.upstream_artifact) && declared(&self.upstream_relation)
    }
}

/// Globally unique column identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub u64);

impl ColumnId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Closed set of column groups
///
/// Serialized with the canonical snake_case token. Deserialization accepts
/// the legacy spellings found in older workbooks (`SKs`, `facts`,
/// `technical fields`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnGroup {
    PrimaryKey,
    SurrogateKey,
    BusinessKey,
    Attribute,
    Measure,
    TechnicalField,
    PartitionField,
}

impl ColumnGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary_key",
            Self::SurrogateKey => "surrogate_key",
            Self::BusinessKey => "business_key",
            Self::Attribute => "attribute",
            Self::Measure => "measure",
            Self::TechnicalField => "technical_field",
            Self::PartitionField => "partition_field",
        }
    }

    /// Lenient parse; anything unrecognised is an attribute
    pub fn parse(token: &str) -> Self {
        let normalized: String = token
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "primary_key" | "primary_keys" | "primarykey" | "pk" => Self::PrimaryKey,
            "surrogate_key" | "surrogate_keys" | "sk" | "sks" => Self::SurrogateKey,
            "business_key" | "business_keys" | "bk" | "bks" => Self::BusinessKey,
            "measure" | "measures" | "fact" | "facts" => Self::Measure,
            "technical_field" | "technical_fields" | "technical" => Self::TechnicalField,
            "partition_field" | "partition_fields" | "partition" => Self::PartitionField,
            _ => Self::Attribute,
        }
    }

    /// Position in the key hierarchy
    ///
    /// primary key < surrogate key < business key < attribute/measure < technical/partition
    pub fn rank(&self) -> u8 {
        match self {
            Self::PrimaryKey => 0,
            Self::SurrogateKey => 1,
            Self::BusinessKey => 2,
            Self::Attribute | Self::Measure => 3,
            Self::TechnicalField | Self::PartitionField => 4,
        }
    }

    pub fn is_technical(&self) -> bool {
        matches!(self, Self::TechnicalField | Self::PartitionField)
    }
}

impl From<String> for ColumnGroup {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ColumnGroup> for String {
    fn from(value: ColumnGroup) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ColumnGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column row in the workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,

    /// Owning artifact id
    pub artifact_id: String,

    pub name: String,

    /// Platform-specific data type token (may be blank)
    #[serde(default)]
    pub data_type: String,

    /// 1-based position within the artifact
    pub order: u32,

    pub group: ColumnGroup,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Name of the column this one was cascaded from (itself for origin columns)
    #[serde(default)]
    pub source_column: String,
}

impl Column {
    /// Create an origin column; id and order are assigned later
    pub fn new(
        artifact_id: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
        group: ColumnGroup,
    ) -> Self {
        let name = name.into();
        Self {
            id: ColumnId::default(),
            artifact_id: artifact_id.into(),
            source_column: name.clone(),
            name,
            data_type: data_type.into(),
            order: 0,
            group,
            business_name: None,
            comment: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = ColumnId(id);
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_business_name(mut self, business_name: impl Into<String>) -> Self {
        self.business_name = Some(business_name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_source_column(mut self, source_column: impl Into<String>) -> Self {
        self.source_column = source_column.into();
        self
    }

    /// Business name, if one is set and non-blank
    pub fn business_name(&self) -> Option<&str> {
        self.business_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Cascading strategy attached to one upstream edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Full propagation, the only relation that adds technical fields
    Main,

    /// Key-only propagation into fact tables
    GetKey,

    /// Bounded, priority-ordered propagation
    Lookup,

    /// Semantic-model reference: keys and measures only
    Pbi,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::GetKey => "get_key",
            Self::Lookup => "lookup",
            Self::Pbi => "pbi",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown relation type '{0}'")]
pub struct ParseRelationError(pub String);

impl FromStr for RelationType {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "main" => Ok(Self::Main),
            "get_key" | "getkey" => Ok(Self::GetKey),
            "lookup" => Ok(Self::Lookup),
            "pbi" => Ok(Self::Pbi),
            _ => Err(ParseRelationError(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_group_accepts_legacy_tokens() {
        assert_eq!(ColumnGroup::parse("SKs"), ColumnGroup::SurrogateKey);
        assert_eq!(ColumnGroup::parse("bks"), ColumnGroup::BusinessKey);
        assert_eq!(ColumnGroup::parse("primary key"), ColumnGroup::PrimaryKey);
        assert_eq!(ColumnGroup::parse("technical fields"), ColumnGroup::TechnicalField);
        assert_eq!(ColumnGroup::parse("facts"), ColumnGroup::Measure);
        assert_eq!(ColumnGroup::parse("source column"), ColumnGroup::Attribute);
        assert_eq!(ColumnGroup::parse(""), ColumnGroup::Attribute);
    }

    #[test]
    fn column_group_serializes_canonical_token() {
        let json = serde_json::to_string(&ColumnGroup::SurrogateKey).unwrap();
        assert_eq!(json, "\"surrogate_key\"");

        let parsed: ColumnGroup = serde_json::from_str("\"Partition Field\"").unwrap();
        assert_eq!(parsed, ColumnGroup::PartitionField);
    }

    #[test]
    fn hierarchy_ranks() {
        assert!(ColumnGroup::PrimaryKey.rank() < ColumnGroup::SurrogateKey.rank());
        assert!(ColumnGroup::SurrogateKey.rank() < ColumnGroup::BusinessKey.rank());
        assert_eq!(ColumnGroup::Attribute.rank(), ColumnGroup::Measure.rank());
        assert_eq!(ColumnGroup::TechnicalField.rank(), ColumnGroup::PartitionField.rank());
    }

    #[test]
    fn relation_tokens() {
        assert_eq!("main".parse::<RelationType>(), Ok(RelationType::Main));
        assert_eq!(" Get_Key ".parse::<RelationType>(), Ok(RelationType::GetKey));
        assert_eq!("get-key".parse::<RelationType>(), Ok(RelationType::GetKey));
        assert_eq!(
            "join".parse::<RelationType>(),
            Err(ParseRelationError("join".to_string()))
        );
    }

    #[test]
    fn stage_side_defaults_by_id() {
        assert_eq!(Stage::new("s1", "1_bronze", 1, "Databricks").side(), StageSide::Source);
        assert_eq!(Stage::new("s3", "3_gold", 3, "Databricks").side(), StageSide::Business);
        assert_eq!(
            Stage::new("s3", "3_gold", 3, "Databricks").with_side(StageSide::Source).side(),
            StageSide::Source
        );
    }

    #[test]
    fn column_id_display() {
        assert_eq!(ColumnId(42).to_string(), "c42");
        assert_eq!(ColumnId(1).next(), ColumnId(2));
    }

    #[test]
    fn blank_business_name_is_ignored() {
        let col = Column::new("a1", "cust_id", "INT", ColumnGroup::Attribute).with_business_name("  ");
        assert_eq!(col.business_name(), None);
        assert_eq!(col.source_column, "cust_id");
    }

    #[test]
    fn upstream_needs_both_lists() {
        assert!(Artifact::new("a2", "orders", "s2").with_upstream("a1", "main").has_upstream());
        assert!(!Artifact::new("a2", "orders", "s2").with_upstream("a1", "").has_upstream());
        assert!(!Artifact::new("a2", "orders", "s2").with_upstream(" ; ", "main;get_key").has_upstream());
        assert!(!Artifact::new("a1", "orders", "s1").has_upstream());
    }
}
