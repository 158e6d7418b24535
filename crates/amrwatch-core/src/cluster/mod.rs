//! Transmission-cluster detection over pairwise genetic distances.

pub mod detect;
pub mod distance;

pub use detect::{
    degree_centrality, detect_clusters, summarize_clusters, Cluster, ClusterEdge, ClusterSummary,
    DEFAULT_TRANSMISSION_THRESHOLD,
};
pub use distance::{DistanceMatrix, DistancePair, DistanceSource};
