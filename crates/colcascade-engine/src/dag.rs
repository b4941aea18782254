//! Upstream dependency graph
//!
//! Forward and reverse edges over artifacts' declared upstream ids, for
//! batch ordering and impact analysis.

use crate::upstream::split_list;
use colcascade_core::Artifact;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Artifact identifier
pub type NodeId = String;

/// Dependency graph with forward and reverse edges
#[derive(Debug, Clone, Default)]
pub struct UpstreamGraph {
    /// Forward edges: artifact -> artifacts it reads from
    parents: HashMap<NodeId, Vec<NodeId>>,

    /// Reverse edges: artifact -> artifacts reading from it
    children: HashMap<NodeId, Vec<NodeId>>,

    /// All artifacts, including referenced ids that do not exist
    nodes: BTreeSet<NodeId>,
}

impl UpstreamGraph {
    /// Build the graph from artifact upstream declarations
    pub fn from_artifacts(artifacts: &[Artifact]) -> Self {
        let mut graph = Self::default();

        for artifact in artifacts {
            graph.nodes.insert(artifact.id.clone());
            if !artifact.has_upstream() {
                continue;
            }

            let mut seen = HashSet::new();
            for upstream in split_list(&artifact.upstream_artifact) {
                if !seen.insert(upstream) {
                    continue;
                }
                graph.nodes.insert(upstream.to_string());
                graph
                    .parents
                    .entry(artifact.id.clone())
                    .or_default()
                    .push(upstream.to_string());
                graph
                    .children
                    .entry(upstream.to_string())
                    .or_default()
                    .push(artifact.id.clone());
            }
        }

        graph
    }

    pub fn all_nodes(&self) -> Vec<&NodeId> {
        self.nodes.iter().collect()
    }

    /// Immediate upstreams of an artifact
    pub fn parents(&self, node_id: &str) -> Vec<&NodeId> {
        self.parents
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Immediate downstreams of an artifact
    pub fn children(&self, node_id: &str) -> Vec<&NodeId> {
        self.children
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// All artifacts fed by this one, directly or transitively
    pub fn downstream(&self, node_id: &str) -> Vec<NodeId> {
        Self::walk(&self.children, node_id)
    }

    /// All artifacts this one reads from, directly or transitively
    pub fn upstream(&self, node_id: &str) -> Vec<NodeId> {
        Self::walk(&self.parents, node_id)
    }

    fn walk(edges: &HashMap<NodeId, Vec<NodeId>>, node_id: &str) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::new();
        let mut result = Vec::new();

        if let Some(next) = edges.get(node_id) {
            queue.extend(next);
        }

        // BFS
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current.clone());

            if let Some(next) = edges.get(current) {
                queue.extend(next.iter().filter(|n| !visited.contains(n)));
            }
        }

        result
    }

    /// Check if there's a path from source to target
    pub fn has_path(&self, source: &str, target: &str) -> bool {
        self.downstream(source).iter().any(|node| node == target)
    }

    /// Upstream-before-downstream order, `None` when the graph has a cycle
    pub fn topological_sort(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: HashMap<&NodeId, usize> = self
            .nodes
            .iter()
            .map(|node| (node, self.parents.get(node).map_or(0, Vec::len)))
            .collect();

        // Nodes with no dependencies, in id order
        let mut queue: VecDeque<&NodeId> = self
            .nodes
            .iter()
            .filter(|node| in_degree.get(node) == Some(&0))
            .collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        // Kahn's algorithm
        while let Some(node) = queue.pop_front() {
            result.push(node.clone());

            for child in self.children.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            Some(result)
        } else {
            None // Graph has cycles
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> UpstreamGraph {
        UpstreamGraph::from_artifacts(&[
            Artifact::new("a1", "customers", "s1"),
            Artifact::new("a2", "customers", "s2").with_upstream("a1", "main"),
            Artifact::new("a3", "dim_customer", "s3").with_upstream("a2", "main"),
            Artifact::new("a4", "orders", "s2"),
            Artifact::new("a5", "fact_orders", "s3").with_upstream("a4;a3", "main;get_key"),
        ])
    }

    #[test]
    fn immediate_edges() {
        let graph = pipeline();
        assert_eq!(graph.parents("a5"), vec!["a4", "a3"]);
        assert_eq!(graph.children("a3"), vec!["a5"]);
        assert!(graph.parents("a1").is_empty());
    }

    #[test]
    fn downstream_impact() {
        let graph = pipeline();
        assert_eq!(graph.downstream("a1"), vec!["a2", "a3", "a5"]);
        assert_eq!(graph.upstream("a5"), vec!["a4", "a3", "a2", "a1"]);
        assert!(graph.has_path("a1", "a5"));
        assert!(!graph.has_path("a4", "a1"));
    }

    #[test]
    fn topological_order() {
        let order = pipeline().topological_sort().unwrap();
        let position = |id: &str| order.iter().position(|n| n == id).unwrap();

        assert_eq!(order.len(), 5);
        assert!(position("a1") < position("a2"));
        assert!(position("a3") < position("a5"));
        assert!(position("a4") < position("a5"));
    }

    #[test]
    fn cycles_have_no_order() {
        let graph = UpstreamGraph::from_artifacts(&[
            Artifact::new("a", "a", "s2").with_upstream("b", "main"),
            Artifact::new("b", "b", "s2").with_upstream("a", "main"),
        ]);
        assert!(graph.topological_sort().is_none());
    }

    #[test]
    fn repeated_upstream_counts_once() {
        let graph = UpstreamGraph::from_artifacts(&[
            Artifact::new("d", "dim", "s3"),
            Artifact::new("f", "fact_x", "s3").with_upstream("d;d", "main;get_key"),
        ]);
        assert_eq!(graph.parents("f").len(), 1);
        assert_eq!(graph.topological_sort().unwrap(), vec!["d", "f"]);
    }

    #[test]
    fn relationless_upstream_adds_no_edge() {
        let graph = UpstreamGraph::from_artifacts(&[
            Artifact::new("a1", "orders", "s1"),
            Artifact::new("a2", "orders", "s2").with_upstream("a1", ""),
        ]);
        assert!(graph.parents("a2").is_empty());
        assert!(graph.downstream("a1").is_empty());
    }
}
