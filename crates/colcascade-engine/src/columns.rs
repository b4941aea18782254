//! Column-set helpers shared by cascading and maintenance passes

use colcascade_core::{Column, ColumnGroup, ColumnId, StageSide};
use colcascade_store::{MetadataStore, StoreError};
use std::collections::HashSet;

/// Next free column id: one past the largest id anywhere in the store
///
/// Recomputed from the store on every call so a fresh process resumes a
/// partially completed run safely.
pub fn next_id<S: MetadataStore + ?Sized>(store: &S) -> Result<ColumnId, StoreError> {
    let max = store
        .columns(None)?
        .iter()
        .map(|c| c.id)
        .max()
        .unwrap_or_default();
    Ok(max.next())
}

/// Drop columns whose name was already seen (case-insensitive), first wins
///
/// Returns the survivors and the number dropped.
pub fn dedupe_by_name(columns: Vec<Column>) -> (Vec<Column>, usize) {
    let mut seen = HashSet::new();
    let before = columns.len();
    let kept: Vec<Column> = columns
        .into_iter()
        .filter(|c| seen.insert(c.name.to_lowercase()))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Stable sort by key hierarchy, then renumber `order` densely from 1
pub fn order_by_hierarchy(columns: &mut [Column]) {
    columns.sort_by_key(|c| c.group.rank());
    renumber(columns);
}

/// Force primary keys to the front on source-facing stages
///
/// Business-facing stages keep primary keys where the hierarchy put them.
pub fn promote_primary_keys(columns: &mut [Column], side: StageSide) {
    if side == StageSide::Source {
        columns.sort_by_key(|c| c.group != ColumnGroup::PrimaryKey);
        renumber(columns);
    }
}

pub fn renumber(columns: &mut [Column]) {
    for (index, column) in columns.iter_mut().enumerate() {
        column.order = index as u32 + 1;
    }
}

/// Whether columns read in `order` follow the key hierarchy
pub fn respects_hierarchy(columns: &[Column]) -> bool {
    let mut ordered: Vec<&Column> = columns.iter().collect();
    ordered.sort_by_key(|c| c.order);
    ordered.windows(2).all(|pair| pair[0].group.rank() <= pair[1].group.rank())
}
