//! Batch runner
//!
//! Cascades every artifact still missing columns in upstream-before-downstream
//! order, and rebuilds the whole column table from seed columns.

use crate::cascade::{CascadeEngine, CascadeError};
use crate::columns::renumber;
use crate::dag::UpstreamGraph;
use colcascade_core::{
    Artifact, ArtifactResult, ArtifactStatus, BatchReport, Column, ColumnId, Diagnostic, DiagnosticCode,
};
use colcascade_store::{MetadataStore, StoreError};
use std::collections::{HashMap, HashSet};

impl CascadeEngine {
    /// Cascade every artifact that has no columns yet
    ///
    /// Artifacts are processed once all of their upstreams are done. The sweep
    /// is bounded; whatever is still waiting afterwards (cycles, unresolved
    /// references) is processed best-effort and the batch is reported partial.
    /// A failing artifact, store failures included, is recorded as failed and
    /// the batch moves on.
    pub fn cascade_all_missing<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        include_technical_fields: bool,
    ) -> Result<BatchReport, CascadeError> {
        self.sweep(store, include_technical_fields, false)
    }

    fn sweep<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        include_technical_fields: bool,
        abort_on_store_failure: bool,
    ) -> Result<BatchReport, CascadeError> {
        let artifacts = store.artifacts()?;
        let populated: HashSet<String> = store
            .columns(None)?
            .into_iter()
            .map(|c| c.artifact_id)
            .collect();

        let mut pending: Vec<&Artifact> = artifacts.iter().filter(|a| !populated.contains(&a.id)).collect();
        let mut waiting: HashSet<&str> = pending.iter().map(|a| a.id.as_str()).collect();
        let graph = UpstreamGraph::from_artifacts(&artifacts);
        let max_passes = self.config().sweep_passes(pending.len());

        tracing::info!(
            total = artifacts.len(),
            missing = pending.len(),
            max_passes,
            "cascading artifacts without columns"
        );

        let mut report = BatchReport::new();

        for pass in 1..=max_passes {
            if pending.is_empty() {
                break;
            }

            let mut progressed = false;
            let mut still_pending = Vec::with_capacity(pending.len());

            for artifact in pending {
                let ready = graph
                    .parents(&artifact.id)
                    .iter()
                    .all(|parent| !waiting.contains(parent.as_str()));

                if ready {
                    self.record(
                        store,
                        artifact,
                        include_technical_fields,
                        false,
                        abort_on_store_failure,
                        &mut report,
                    )?;
                    waiting.remove(artifact.id.as_str());
                    progressed = true;
                } else {
                    still_pending.push(artifact);
                }
            }

            pending = still_pending;
            tracing::debug!(pass, remaining = pending.len(), "sweep pass finished");

            if !progressed {
                break;
            }
        }

        for artifact in pending {
            let blocked_by: Vec<&str> = graph
                .parents(&artifact.id)
                .into_iter()
                .map(String::as_str)
                .filter(|parent| waiting.contains(parent))
                .collect();

            tracing::warn!(artifact = %artifact.id, ?blocked_by, "dependencies unresolved, cascading best-effort");
            report.add_diagnostic(
                Diagnostic::warn(
                    DiagnosticCode::CascadeUnresolvedDependency,
                    format!("Upstream(s) {} unresolved; processed best-effort", blocked_by.join(", ")),
                )
                .with_artifact(artifact.id.as_str()),
            );

            self.record(
                store,
                artifact,
                include_technical_fields,
                true,
                abort_on_store_failure,
                &mut report,
            )?;
            waiting.remove(artifact.id.as_str());
        }

        tracing::info!(
            status = %report.status,
            cascaded = report.summary.cascaded,
            failed = report.summary.failed,
            "batch finished"
        );
        Ok(report)
    }

    /// Cascade one artifact into the report
    ///
    /// Store failures escape only when `abort_on_store_failure` is set.
    fn record<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        artifact: &Artifact,
        include_technical_fields: bool,
        best_effort: bool,
        abort_on_store_failure: bool,
        report: &mut BatchReport,
    ) -> Result<(), CascadeError> {
        match self.cascade_artifact(store, &artifact.id, include_technical_fields) {
            Ok(outcome) => {
                report.add_diagnostics(outcome.diagnostics.iter().cloned());
                let result = outcome.to_result();
                report.add_result(if best_effort { result.best_effort() } else { result });
                Ok(())
            }
            Err(err) if abort_on_store_failure && err.is_store_failure() => Err(err),
            Err(err) => {
                tracing::error!(artifact = %artifact.id, error = %err, "cascade failed");
                report.add_diagnostic(err.to_diagnostic(&artifact.id));
                let result = ArtifactResult::new(artifact.id.as_str(), ArtifactStatus::Failed).with_message(err.to_string());
                report.add_result(if best_effort { result.best_effort() } else { result });
                Ok(())
            }
        }
    }

    /// Rebuild every cascaded column from scratch
    ///
    /// Columns of artifacts without upstreams are the seed input and are kept,
    /// renumbered from id 1 in workbook order; every other column is deleted
    /// and re-derived. Any store failure aborts the rebuild and leaves the
    /// column table empty.
    pub fn regenerate_all<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        include_technical_fields: bool,
    ) -> Result<BatchReport, CascadeError> {
        let artifacts = store.artifacts()?;
        let seeds = seed_columns(&*store, &artifacts)?;

        tracing::info!(
            artifacts = artifacts.len(),
            seed_columns = seeds.values().map(Vec::len).sum::<usize>(),
            "regenerating all columns"
        );

        let rebuilt = self.rebuild(store, &artifacts, seeds, include_technical_fields);
        if let Err(err) = &rebuilt {
            tracing::error!(error = %err, "regeneration failed, clearing column table");
            if let Err(clear_err) = clear_all(store, &artifacts) {
                tracing::error!(error = %clear_err, "could not clear column table after failed regeneration");
            }
        }
        rebuilt
    }

    fn rebuild<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        artifacts: &[Artifact],
        seeds: HashMap<String, Vec<Column>>,
        include_technical_fields: bool,
    ) -> Result<BatchReport, CascadeError> {
        clear_all(store, artifacts)?;

        let mut id = ColumnId::default();
        for artifact in artifacts {
            if let Some(mut columns) = seeds.get(&artifact.id).cloned() {
                for column in columns.iter_mut() {
                    id = id.next();
                    column.id = id;
                }
                store.replace_columns_for_artifact(&artifact.id, columns)?;
            }
        }

        self.sweep(store, include_technical_fields, true)
    }
}

/// Origin columns of artifacts without upstreams, keyed by artifact
fn seed_columns<S: MetadataStore + ?Sized>(
    store: &S,
    artifacts: &[Artifact],
) -> Result<HashMap<String, Vec<Column>>, StoreError> {
    let mut seeds = HashMap::new();
    for artifact in artifacts.iter().filter(|a| !a.has_upstream()) {
        let mut columns = store.columns(Some(&artifact.id))?;
        if !columns.is_empty() {
            renumber(&mut columns);
            seeds.insert(artifact.id.clone(), columns);
        }
    }
    Ok(seeds)
}

fn clear_all<S: MetadataStore + ?Sized>(store: &mut S, artifacts: &[Artifact]) -> Result<(), StoreError> {
    for artifact in artifacts {
        store.delete_columns_for_artifact(&artifact.id)?;
    }
    Ok(())
}
