use crate::cluster::distance::DistanceMatrix;
use crate::error::AmrError;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default single-linkage cutoff, in SNPs. Organism-specific thresholds vary,
/// so callers should override it from configuration.
pub const DEFAULT_TRANSMISSION_THRESHOLD: f64 = 10.0;

/// A connected group of isolates. Members are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub members: Vec<String>,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

fn check_threshold(threshold: f64) -> Result<(), AmrError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(AmrError::Validation(format!(
            "cluster threshold {threshold} must be finite and non-negative"
        )));
    }
    Ok(())
}

/// Single-linkage clustering: isolates joined by any chain of pairs with
/// distance `<= threshold` share a cluster. Unlinked isolates form
/// singleton clusters. Clusters are ordered by their smallest member id.
pub fn detect_clusters(matrix: &DistanceMatrix, threshold: f64) -> Result<Vec<Cluster>, AmrError> {
    check_threshold(threshold)?;

    let mut sets = UnionFind::<usize>::new(matrix.len());
    for (i, j, d) in matrix.indexed_pairs() {
        if d <= threshold {
            sets.union(i, j);
        }
    }

    // Indices ascend with id order, so each group is already sorted.
    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (idx, root) in sets.into_labeling().into_iter().enumerate() {
        groups
            .entry(root)
            .or_default()
            .push(matrix.ids()[idx].clone());
    }

    let mut clusters: Vec<Cluster> = groups
        .into_values()
        .map(|members| Cluster { members })
        .collect();
    clusters.sort_by(|a, b| a.members.first().cmp(&b.members.first()));
    tracing::debug!(
        isolates = matrix.len(),
        clusters = clusters.len(),
        threshold,
        "single-linkage clustering"
    );
    Ok(clusters)
}

/// A within-cluster link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEdge {
    pub a: String,
    pub b: String,
    pub distance: f64,
    /// `1 / (1 + distance)`
    pub transmission_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub members: Vec<String>,
    pub size: usize,
    /// Largest distance among the cluster's linking edges (0 for singletons).
    pub max_link_distance: f64,
    pub edges: Vec<ClusterEdge>,
}

/// Cluster statistics for every cluster with at least `min_size` members,
/// largest first (ties by smallest member id).
pub fn summarize_clusters(
    matrix: &DistanceMatrix,
    threshold: f64,
    min_size: usize,
) -> Result<Vec<ClusterSummary>, AmrError> {
    let clusters = detect_clusters(matrix, threshold)?;

    let mut summaries: Vec<ClusterSummary> = clusters
        .into_iter()
        .filter(|c| c.size() >= min_size)
        .map(|c| {
            let edges: Vec<ClusterEdge> = c
                .members
                .iter()
                .enumerate()
                .flat_map(|(i, a)| c.members[i + 1..].iter().map(move |b| (a, b)))
                .filter_map(|(a, b)| {
                    let d = matrix.distance(a, b)?;
                    (d <= threshold).then(|| ClusterEdge {
                        a: a.clone(),
                        b: b.clone(),
                        distance: d,
                        transmission_likelihood: 1.0 / (1.0 + d),
                    })
                })
                .collect();
            let max_link_distance = edges.iter().map(|e| e.distance).fold(0.0, f64::max);
            ClusterSummary {
                size: c.size(),
                members: c.members,
                max_link_distance,
                edges,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.members.first().cmp(&b.members.first()))
    });
    Ok(summaries)
}

/// Degree centrality of every isolate in the transmission network:
/// linked neighbours divided by `n - 1`.
pub fn degree_centrality(
    matrix: &DistanceMatrix,
    threshold: f64,
) -> Result<BTreeMap<String, f64>, AmrError> {
    check_threshold(threshold)?;

    let mut graph: UnGraph<&str, f64> = UnGraph::new_undirected();
    let nodes: Vec<NodeIndex> = matrix.ids().iter().map(|id| graph.add_node(id.as_str())).collect();
    for (i, j, d) in matrix.indexed_pairs() {
        if d <= threshold {
            graph.add_edge(nodes[i], nodes[j], d);
        }
    }

    let denom = matrix.len().saturating_sub(1);
    Ok(nodes
        .iter()
        .map(|&n| {
            let degree = graph.neighbors(n).count();
            let centrality = if denom == 0 {
                0.0
            } else {
                degree as f64 / denom as f64
            };
            (graph[n].to_string(), centrality)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::DistancePair;

    fn pair(a: &str, b: &str, d: f64) -> DistancePair {
        DistancePair {
            a: a.into(),
            b: b.into(),
            distance: d,
        }
    }

    fn chain() -> DistanceMatrix {
        DistanceMatrix::from_pairs(
            ["A", "B", "C", "D"],
            &[pair("A", "B", 5.0), pair("B", "C", 8.0), pair("C", "D", 20.0)],
        )
        .unwrap()
    }

    fn members(clusters: &[Cluster]) -> Vec<Vec<&str>> {
        clusters
            .iter()
            .map(|c| c.members.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_chain_at_default_threshold() {
        let clusters = detect_clusters(&chain(), DEFAULT_TRANSMISSION_THRESHOLD).unwrap();
        assert_eq!(members(&clusters), vec![vec!["A", "B", "C"], vec!["D"]]);
    }

    #[test]
    fn test_tight_threshold_splits() {
        let clusters = detect_clusters(&chain(), 6.0).unwrap();
        assert_eq!(
            members(&clusters),
            vec![vec!["A", "B"], vec!["C"], vec!["D"]]
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let clusters = detect_clusters(&chain(), 20.0).unwrap();
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(detect_clusters(&chain(), -1.0).is_err());
        assert!(detect_clusters(&chain(), f64::INFINITY).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        let m = DistanceMatrix::from_pairs(Vec::<String>::new(), &[]).unwrap();
        assert!(detect_clusters(&m, 10.0).unwrap().is_empty());
    }

    #[test]
    fn test_summary_filters_and_sorts() {
        let m = DistanceMatrix::from_pairs(
            ["A", "B", "C", "D", "E"],
            &[pair("D", "E", 1.0), pair("A", "B", 2.0), pair("B", "C", 3.0)],
        )
        .unwrap();
        let s = summarize_clusters(&m, 5.0, 2).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].members, vec!["A", "B", "C"]);
        assert_eq!(s[0].max_link_distance, 3.0);
        assert_eq!(s[0].edges.len(), 2);
        assert!((s[0].edges[0].transmission_likelihood - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(s[1].members, vec!["D", "E"]);
    }

    #[test]
    fn test_degree_centrality() {
        let c = degree_centrality(&chain(), 10.0).unwrap();
        assert!((c["B"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((c["A"] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(c["D"], 0.0);
    }
}
