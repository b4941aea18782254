//! Artifact type classification

use colcascade_core::{Artifact, ArtifactType};

const DIMENSION_PREFIXES: &[&str] = &["dim_", "dimension_", "d_"];
const FACT_PREFIXES: &[&str] = &["fact_", "f_"];
const BRIDGE_PREFIXES: &[&str] = &["bridge_", "br_"];

/// Infer an artifact's role from its explicit type field or its name
///
/// A recognised explicit type wins. Otherwise name heuristics apply in order:
/// dimension prefixes, then fact prefixes or a `fact` substring, then bridge
/// prefixes or a `bridge` substring.
pub fn classify(name: &str, explicit_type: &str) -> ArtifactType {
    if let Some(explicit) = ArtifactType::from_explicit(explicit_type) {
        return explicit;
    }

    let lower = name.trim().to_lowercase();

    if DIMENSION_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        ArtifactType::Dimension
    } else if FACT_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.contains("fact") {
        ArtifactType::Fact
    } else if BRIDGE_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.contains("bridge") {
        ArtifactType::Bridge
    } else {
        tracing::warn!(artifact = name, explicit_type, "could not classify artifact type");
        ArtifactType::Unknown
    }
}

pub fn classify_artifact(artifact: &Artifact) -> ArtifactType {
    classify(&artifact.name, &artifact.artifact_type)
}
