//! Stage rule sets
//!
//! One generic pass driven by a per-stage [`StageRule`] and the stage's
//! technical field catalogue. Covers naming, prefix stripping, type
//! translation, technical fields and key synthesis.

use crate::type_mapper::TypeMapper;
use colcascade_core::{
    Artifact, ArtifactType, Column, ColumnGroup, ColumnId, NamingConvention, RelationType, Stage, StageRule,
    TechnicalField,
};

/// Rules of the stage an artifact is being cascaded into
#[derive(Debug, Clone)]
pub struct StageRuleSet {
    stage: Stage,
    rule: StageRule,
    catalog: Vec<TechnicalField>,
}

impl StageRuleSet {
    pub fn new(stage: Stage, rule: StageRule, catalog: Vec<TechnicalField>) -> Self {
        Self { stage, rule, catalog }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn rule(&self) -> &StageRule {
        &self.rule
    }

    pub fn synthesizes_keys(&self) -> bool {
        self.rule.key_synthesis
    }

    /// Whether a `main` edge from `upstream_stage` brings this stage's technical fields
    pub fn emits_technical_fields_from(&self, upstream_stage: &Stage) -> bool {
        upstream_stage.id != self.stage.id || self.rule.technical_fields_on_same_stage
    }

    /// Carry an upstream column into an artifact of this stage
    ///
    /// Applies the naming convention, strips the upstream stage's prefix on
    /// `main` edges and translates the data type between platforms. The result
    /// has no id or order yet.
    pub fn carry(
        &self,
        column: &Column,
        upstream_stage: &Stage,
        relation: RelationType,
        mapper: &TypeMapper,
        target_id: &str,
    ) -> Column {
        let mut name = match self.rule.naming {
            NamingConvention::BusinessNameOrSource if !column.group.is_technical() => column
                .business_name()
                .unwrap_or(column.name.as_str())
                .to_string(),
            _ => column.name.clone(),
        };

        if relation == RelationType::Main {
            if let Some(prefix) = self.rule.prefix_for(&upstream_stage.id) {
                if let Some(stripped) = name.strip_prefix(prefix).filter(|rest| !rest.is_empty()) {
                    name = stripped.to_string();
                }
            }
        }

        Column {
            id: ColumnId::default(),
            artifact_id: target_id.to_string(),
            name,
            data_type: mapper.convert_between(&column.data_type, &upstream_stage.platform, &self.stage.platform),
            order: 0,
            group: column.group,
            business_name: column.business_name.clone(),
            comment: column.comment.clone(),
            source_column: column.name.clone(),
        }
    }

    /// Whether this stage's catalogue lists the field as not emitted here
    pub fn suppresses(&self, field_name: &str) -> bool {
        self.catalog
            .iter()
            .any(|field| field.name == field_name && !field.emitted_here)
    }

    /// Technical fields this stage emits for an artifact type
    pub fn technical_columns(&self, artifact_type: ArtifactType, target_id: &str) -> Vec<Column> {
        self.catalog
            .iter()
            .filter(|field| field.emitted_here && field.scope.applies_to(artifact_type))
            .map(|field| Column::new(target_id, field.name.as_str(), field.data_type.as_str(), field.group))
            .collect()
    }

    /// Surrogate and business key of a dimension
    ///
    /// The business key type is left blank; it follows from a transformation
    /// expression written later.
    pub fn dimension_keys(&self, dimension: &Artifact, surrogate_key_type: &str) -> Vec<Column> {
        vec![
            Column::new(
                dimension.id.as_str(),
                format!("{}_SK", dimension.name),
                surrogate_key_type,
                ColumnGroup::SurrogateKey,
            ),
            Column::new(dimension.id.as_str(), format!("{}_BK", dimension.name), "", ColumnGroup::BusinessKey),
        ]
    }

    /// Key pair a fact receives for one `get_key` upstream
    ///
    /// The business key takes the upstream business key's type when there is one.
    pub fn fact_keys(
        &self,
        upstream: &Artifact,
        upstream_columns: &[Column],
        upstream_stage: &Stage,
        mapper: &TypeMapper,
        surrogate_key_type: &str,
        target_id: &str,
    ) -> Vec<Column> {
        let bk_type = upstream_columns
            .iter()
            .find(|c| c.group == ColumnGroup::BusinessKey && !c.data_type.trim().is_empty())
            .map(|c| mapper.convert_between(&c.data_type, &upstream_stage.platform, &self.stage.platform))
            .unwrap_or_default();

        vec![
            Column::new(
                target_id,
                format!("{}_SK", upstream.name),
                surrogate_key_type,
                ColumnGroup::SurrogateKey,
            ),
            Column::new(target_id, format!("{}_BK", upstream.name), bk_type, ColumnGroup::BusinessKey),
        ]
    }
}

/// Whether an upstream technical column may cross out of its stage
///
/// The upstream stage's catalogue must list the field as both emitted there
/// and continuing forward. Uncatalogued technical columns stop at the boundary.
pub fn passes_gate(column: &Column, upstream_catalog: &[TechnicalField]) -> bool {
    upstream_catalog
        .iter()
        .find(|field| field.name == column.name)
        .is_some_and(TechnicalField::passes_gate)
}

/// Re-tag incoming primary keys as attributes
///
/// Used on key-synthesizing stages, where the synthesized surrogate and
/// business keys identify the row and must lead the artifact. A primary key
/// carried over from the source side would otherwise sort ahead of them.
pub fn retag_primary_keys(columns: &mut [Column]) {
    for column in columns.iter_mut().filter(|c| c.group == ColumnGroup::PrimaryKey) {
        column.group = ColumnGroup::Attribute;
    }
}
