//! Cascading engine
//!
//! Derives the columns of a single artifact from its upstream edges and
//! appends them to the store. Re-running on an artifact that already has
//! columns is a no-op.

use crate::classifier::classify_artifact;
use crate::columns::{dedupe_by_name, next_id, order_by_hierarchy, promote_primary_keys};
use crate::relation::RelationProcessor;
use crate::stage_rules::{passes_gate, retag_primary_keys, StageRuleSet};
use crate::type_mapper::TypeMapper;
use crate::upstream::{parse_upstreams, split_list, UpstreamError};
use colcascade_core::{
    ArtifactResult, ArtifactStatus, ArtifactType, Column, Config, Diagnostic, DiagnosticCode, RelationType, Severity,
    Stage, TechnicalField,
};
use colcascade_store::{MetadataStore, StoreError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Errors that stop a single artifact from cascading
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Stage {stage} of artifact {artifact} not found")]
    StageNotFound { artifact: String, stage: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CascadeError {
    /// Stable diagnostic code for this error
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::ArtifactNotFound(_) => DiagnosticCode::CascadeArtifactNotFound,
            Self::StageNotFound { .. } | Self::Store(_) => DiagnosticCode::CascadeStoreError,
            Self::Upstream(UpstreamError::CountMismatch { .. }) => DiagnosticCode::CascadeRelationMismatch,
        }
    }

    /// Whether the store itself failed, as opposed to the artifact's declaration
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    pub fn to_diagnostic(&self, artifact_id: &str) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.to_string()).with_artifact(artifact_id);
        match self {
            Self::Upstream(UpstreamError::CountMismatch { upstreams, relations, .. }) => {
                diagnostic.with_comparison(upstreams.to_string(), relations.to_string())
            }
            _ => diagnostic,
        }
    }
}

/// Result of cascading one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub artifact_id: String,

    /// `Cascaded`, `Skipped` or `NoUpstream`
    pub status: ArtifactStatus,

    pub columns_added: usize,

    pub duplicates_skipped: usize,

    /// Warnings raised along the way (skipped upstream pairs, fallbacks)
    pub diagnostics: Vec<Diagnostic>,
}

impl CascadeOutcome {
    fn new(artifact_id: &str, status: ArtifactStatus) -> Self {
        Self {
            artifact_id: artifact_id.to_string(),
            status,
            columns_added: 0,
            duplicates_skipped: 0,
            diagnostics: Vec::new(),
        }
    }

    fn warn(&mut self, code: DiagnosticCode, message: String, upstream_id: &str) {
        tracing::warn!(artifact = %self.artifact_id, upstream = upstream_id, "{}", message);
        self.diagnostics.push(
            Diagnostic::warn(code, message)
                .with_artifact(self.artifact_id.as_str())
                .with_upstream(upstream_id),
        );
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= Severity::Warn)
    }

    /// Batch report entry for this outcome
    pub fn to_result(&self) -> ArtifactResult {
        ArtifactResult::new(self.artifact_id.as_str(), self.status)
            .with_counts(self.columns_added, self.duplicates_skipped)
    }
}

/// Columns collected from all edges before merging
#[derive(Default)]
struct Collected {
    keys: Vec<Column>,
    business: Vec<Column>,
    technical: Vec<Column>,
    has_main: bool,
    emit_technical: bool,
}

/// Orchestrates relation processing, stage rules and id allocation
#[derive(Debug, Clone, Default)]
pub struct CascadeEngine {
    config: Config,
}

impl CascadeEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cascade columns into one artifact
    pub fn cascade_artifact<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        artifact_id: &str,
        include_technical_fields: bool,
    ) -> Result<CascadeOutcome, CascadeError> {
        let artifacts = store.artifacts()?;
        let target = artifacts
            .iter()
            .find(|a| a.id == artifact_id)
            .ok_or_else(|| CascadeError::ArtifactNotFound(artifact_id.to_string()))?;

        if !store.columns(Some(artifact_id))?.is_empty() {
            tracing::debug!(artifact = artifact_id, "artifact already has columns, skipping");
            return Ok(CascadeOutcome::new(artifact_id, ArtifactStatus::Skipped));
        }

        let edges = parse_upstreams(target)?;
        if edges.is_empty() {
            let mut outcome = CascadeOutcome::new(artifact_id, ArtifactStatus::NoUpstream);
            let partial = !split_list(&target.upstream_artifact).is_empty()
                || !split_list(&target.upstream_relation).is_empty();
            if partial {
                let message = format!(
                    "Upstream '{}' with relation '{}' is incomplete, nothing cascaded",
                    target.upstream_artifact, target.upstream_relation
                );
                tracing::warn!(artifact = artifact_id, "{}", message);
                outcome
                    .diagnostics
                    .push(Diagnostic::warn(DiagnosticCode::Warning, message).with_artifact(artifact_id));
            } else {
                tracing::debug!(artifact = artifact_id, "no upstream declared");
            }
            return Ok(outcome);
        }

        let stages: HashMap<String, Stage> = store
            .stages()?
            .into_iter()
            .map(|stage| (stage.id.clone(), stage))
            .collect();
        let target_stage = stages
            .get(&target.stage_id)
            .ok_or_else(|| CascadeError::StageNotFound {
                artifact: target.id.clone(),
                stage: target.stage_id.clone(),
            })?;

        let target_type = classify_artifact(target);
        let rules = StageRuleSet::new(
            target_stage.clone(),
            self.config.stage_rule(&target_stage.id),
            store.technical_field_catalog(&target_stage.id)?,
        );
        let mapper = TypeMapper::new(store.type_mappings()?);
        let processor = RelationProcessor::new(self.config.lookup_limit, self.config.measure_default_type.as_str());

        tracing::info!(
            artifact = artifact_id,
            stage = %target_stage.id,
            artifact_type = %target_type,
            upstreams = edges.len(),
            "cascading artifact"
        );

        let mut outcome = CascadeOutcome::new(artifact_id, ArtifactStatus::Cascaded);
        if target_type == ArtifactType::Unknown {
            outcome.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::CascadeClassificationUnknown,
                    Severity::Info,
                    format!("Artifact '{}' has no recognisable type, no keys are synthesized", target.name),
                )
                .with_artifact(artifact_id),
            );
        }

        let mut collected = Collected::default();
        let mut upstream_catalogs: HashMap<String, Vec<TechnicalField>> = HashMap::new();

        for edge in &edges {
            if let Some(token) = &edge.unknown_token {
                outcome.warn(
                    DiagnosticCode::CascadeUnknownRelation,
                    format!("Unknown relation type '{}', treating as main", token),
                    &edge.artifact_id,
                );
            }

            let relation = edge.relation;
            if relation == RelationType::Main {
                collected.has_main = true;
            }
            if relation == RelationType::GetKey && target_type != ArtifactType::Fact {
                outcome.warn(
                    DiagnosticCode::CascadeGetKeyNonFact,
                    format!("get_key relation into {} artifact", target_type),
                    &edge.artifact_id,
                );
            }

            let resolved = artifacts
                .iter()
                .find(|a| a.id == edge.artifact_id)
                .and_then(|upstream| stages.get(&upstream.stage_id).map(|stage| (upstream, stage)));
            let Some((upstream, upstream_stage)) = resolved else {
                outcome.warn(
                    DiagnosticCode::CascadeUpstreamMissing,
                    format!("Upstream artifact '{}' not found", edge.artifact_id),
                    &edge.artifact_id,
                );
                continue;
            };

            if relation == RelationType::Main && rules.emits_technical_fields_from(upstream_stage) {
                collected.emit_technical = true;
            }

            let upstream_columns = store.columns(Some(&upstream.id))?;

            if relation == RelationType::GetKey && rules.synthesizes_keys() && target_type == ArtifactType::Fact {
                collected.keys.extend(rules.fact_keys(
                    upstream,
                    &upstream_columns,
                    upstream_stage,
                    &mapper,
                    &self.config.surrogate_key_type,
                    artifact_id,
                ));
                continue;
            }

            if upstream_columns.is_empty() {
                outcome.warn(
                    DiagnosticCode::CascadeUpstreamEmpty,
                    format!("Upstream artifact '{}' has no columns yet", upstream.id),
                    &upstream.id,
                );
                continue;
            }

            for column in processor.process(relation, &upstream_columns, target_type) {
                if !column.group.is_technical() {
                    collected
                        .business
                        .push(rules.carry(&column, upstream_stage, relation, &mapper, artifact_id));
                    continue;
                }

                if !include_technical_fields || relation != RelationType::Main {
                    continue;
                }

                let catalog = match upstream_catalogs.entry(upstream_stage.id.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(store.technical_field_catalog(&upstream_stage.id)?),
                };

                if passes_gate(&column, catalog) && !rules.suppresses(&column.name) {
                    collected
                        .technical
                        .push(rules.carry(&column, upstream_stage, relation, &mapper, artifact_id));
                } else {
                    tracing::debug!(
                        artifact = artifact_id,
                        column = %column.name,
                        from_stage = %upstream_stage.id,
                        "technical field stops at stage boundary"
                    );
                }
            }
        }

        if include_technical_fields && collected.emit_technical {
            collected
                .technical
                .extend(rules.technical_columns(target_type, artifact_id));
        }

        if rules.synthesizes_keys() {
            if target_type == ArtifactType::Dimension && collected.has_main {
                let mut keys = rules.dimension_keys(target, &self.config.surrogate_key_type);
                keys.append(&mut collected.keys);
                collected.keys = keys;
            }
            retag_primary_keys(&mut collected.business);
        }

        let merged: Vec<Column> = collected
            .keys
            .into_iter()
            .chain(collected.business)
            .chain(collected.technical)
            .collect();

        let (mut rows, duplicates) = dedupe_by_name(merged);
        if duplicates > 0 {
            tracing::debug!(artifact = artifact_id, duplicates, "skipped duplicate column names");
            outcome.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::CascadeDuplicateColumn,
                    Severity::Info,
                    format!("Skipped {} duplicate column name(s), first occurrence kept", duplicates),
                )
                .with_artifact(artifact_id),
            );
        }

        let mut id = next_id(&*store)?;
        for row in rows.iter_mut() {
            row.id = id;
            id = id.next();
        }

        order_by_hierarchy(&mut rows);
        promote_primary_keys(&mut rows, target_stage.side());

        outcome.columns_added = rows.len();
        outcome.duplicates_skipped = duplicates;

        if !rows.is_empty() {
            store.append_columns(artifact_id, rows)?;
        }

        tracing::info!(
            artifact = artifact_id,
            added = outcome.columns_added,
            duplicates,
            "cascaded artifact"
        );
        Ok(outcome)
    }
}
