//! Maintenance passes over an existing column table
//!
//! These rewrite artifacts in place through
//! [`MetadataStore::replace_columns_for_artifact`] and never derive new columns.

use crate::columns::{dedupe_by_name, order_by_hierarchy};
use colcascade_core::{Column, ColumnId, Diagnostic, DiagnosticCode, Severity};
use colcascade_store::{MetadataStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;

/// What a maintenance pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceSummary {
    /// Artifacts whose rows were rewritten
    pub artifacts_touched: usize,

    /// Rows removed, moved or renumbered
    pub rows_changed: usize,

    pub diagnostics: Vec<Diagnostic>,
}

impl MaintenanceSummary {
    fn touch(&mut self, rows: usize) {
        self.artifacts_touched += 1;
        self.rows_changed += rows;
    }
}

/// Collapse duplicate column names per artifact, keeping the first by order
pub fn cleanup_duplicates<S: MetadataStore + ?Sized>(store: &mut S) -> Result<MaintenanceSummary, StoreError> {
    let mut summary = MaintenanceSummary::default();

    for artifact in store.artifacts()? {
        let columns = store.columns(Some(&artifact.id))?;
        let (kept, removed) = dedupe_by_name(columns);
        if removed == 0 {
            continue;
        }

        tracing::info!(artifact = %artifact.id, removed, "removed duplicate columns");
        summary.touch(removed);
        summary.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::CascadeDuplicateColumn,
                Severity::Info,
                format!("Removed {} duplicate column(s)", removed),
            )
            .with_artifact(artifact.id.as_str()),
        );
        store.replace_columns_for_artifact(&artifact.id, kept)?;
    }

    Ok(summary)
}

/// Re-apply the key hierarchy and dense order numbering to every artifact
pub fn reorder_all<S: MetadataStore + ?Sized>(store: &mut S) -> Result<MaintenanceSummary, StoreError> {
    let mut summary = MaintenanceSummary::default();

    for artifact in store.artifacts()? {
        let before = store.columns(Some(&artifact.id))?;
        let mut after = before.clone();
        order_by_hierarchy(&mut after);

        let moved = before
            .iter()
            .zip(&after)
            .filter(|(old, new)| old.name != new.name || old.order != new.order)
            .count();
        if moved == 0 {
            continue;
        }

        tracing::debug!(artifact = %artifact.id, moved, "reordered columns");
        summary.touch(moved);
        store.replace_columns_for_artifact(&artifact.id, after)?;
    }

    Ok(summary)
}

/// Reassign column ids 1..N across the workbook
///
/// Sequence is stage position, then artifact id, then column order. Fixes
/// duplicate or gapped id sequences left by manual edits.
pub fn reenumerate_ids<S: MetadataStore + ?Sized>(store: &mut S) -> Result<MaintenanceSummary, StoreError> {
    let positions: HashMap<String, u32> = store
        .stages()?
        .into_iter()
        .map(|stage| (stage.id, stage.position))
        .collect();

    let mut artifacts = store.artifacts()?;
    artifacts.sort_by(|a, b| {
        let pa = positions.get(&a.stage_id).copied().unwrap_or(u32::MAX);
        let pb = positions.get(&b.stage_id).copied().unwrap_or(u32::MAX);
        pa.cmp(&pb).then_with(|| a.id.cmp(&b.id))
    });

    let mut summary = MaintenanceSummary::default();
    let mut id = ColumnId::default();

    for artifact in &artifacts {
        let mut columns: Vec<Column> = store.columns(Some(&artifact.id))?;
        let mut changed = 0;
        for column in columns.iter_mut() {
            id = id.next();
            if column.id != id {
                column.id = id;
                changed += 1;
            }
        }

        if changed > 0 {
            summary.touch(changed);
            store.replace_columns_for_artifact(&artifact.id, columns)?;
        }
    }

    tracing::info!(columns = id.0, changed = summary.rows_changed, "re-enumerated column ids");
    Ok(summary)
}
