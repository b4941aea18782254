//! Upstream reference decoding
//!
//! Artifacts carry two parallel semicolon-delimited lists: upstream artifact
//! ids and relation tokens. A single relation token applies to every
//! upstream. If either list is blank the artifact has no upstream.

use colcascade_core::{Artifact, RelationType};

/// One decoded upstream edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRef {
    pub artifact_id: String,

    /// Effective relation (`main` when the token was not recognised)
    pub relation: RelationType,

    /// The unrecognised token, if the relation fell back to `main`
    pub unknown_token: Option<String>,
}

impl UpstreamRef {
    fn decode(artifact_id: &str, token: &str) -> Self {
        let (relation, unknown_token) = match token.parse::<RelationType>() {
            Ok(relation) => (relation, None),
            Err(_) => (RelationType::Main, Some(token.to_string())),
        };

        Self {
            artifact_id: artifact_id.to_string(),
            relation,
            unknown_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("Artifact {artifact} declares {upstreams} upstream(s) but {relations} relation types")]
    CountMismatch {
        artifact: String,
        upstreams: usize,
        relations: usize,
    },
}

/// Split a delimited list, dropping blank entries
pub fn split_list(raw: &str) -> Vec<&str> {
    raw.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Decode an artifact's upstream edges
pub fn parse_upstreams(artifact: &Artifact) -> Result<Vec<UpstreamRef>, UpstreamError> {
    let ids = split_list(&artifact.upstream_artifact);
    let relations = split_list(&artifact.upstream_relation);

    if ids.is_empty() || relations.is_empty() {
        return Ok(Vec::new());
    }

    match relations.len() {
        1 => Ok(ids
            .iter()
            .map(|id| UpstreamRef::decode(id, relations[0]))
            .collect()),
        n if n == ids.len() => Ok(ids
            .iter()
            .zip(relations)
            .map(|(id, token)| UpstreamRef::decode(id, token))
            .collect()),
        n => Err(UpstreamError::CountMismatch {
            artifact: artifact.id.clone(),
            upstreams: ids.len(),
            relations: n,
        }),
    }
}
