//! colcascade engine
//!
//! Derives each artifact's columns from its declared upstream edges:
//! relation selection, stage rules, type translation, key synthesis,
//! technical field gating, then hierarchy ordering and global id allocation.

pub mod batch;
pub mod cascade;
pub mod classifier;
pub mod columns;
pub mod dag;
pub mod maintenance;
pub mod relation;
pub mod stage_rules;
pub mod type_mapper;
pub mod upstream;

pub use cascade::{CascadeEngine, CascadeError, CascadeOutcome};
pub use classifier::{classify, classify_artifact};
pub use columns::next_id;
pub use dag::UpstreamGraph;
pub use maintenance::{cleanup_duplicates, reenumerate_ids, reorder_all, MaintenanceSummary};
pub use relation::RelationProcessor;
pub use stage_rules::StageRuleSet;
pub use type_mapper::TypeMapper;
pub use upstream::{parse_upstreams, UpstreamError, UpstreamRef};
