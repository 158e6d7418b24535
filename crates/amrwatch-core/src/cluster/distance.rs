use crate::error::AmrError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One pairwise genetic distance, as supplied by a sequencing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistancePair {
    pub a: String,
    pub b: String,
    pub distance: f64,
}

/// Symmetric pairwise distances over a fixed, sorted set of isolate ids.
///
/// Pairs that were never supplied are treated as unlinked.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    // Keyed by (i, j) with i < j into `ids`.
    distances: BTreeMap<(usize, usize), f64>,
}

impl DistanceMatrix {
    pub fn from_pairs<I, S>(ids: I, pairs: &[DistancePair]) -> Result<Self, AmrError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        for id in ids {
            let id = id.into();
            if id.trim().is_empty() {
                return Err(AmrError::Validation("isolate id is empty".into()));
            }
            if !seen.insert(id.clone()) {
                return Err(AmrError::Validation(format!("duplicate isolate id '{id}'")));
            }
        }
        let ids: Vec<String> = seen.into_iter().collect();

        let mut distances = BTreeMap::new();
        for pair in pairs {
            let d = pair.distance;
            if !d.is_finite() || d < 0.0 {
                return Err(AmrError::Validation(format!(
                    "distance {d} between '{}' and '{}' must be finite and non-negative",
                    pair.a, pair.b
                )));
            }
            let i = index_in(&ids, &pair.a)?;
            let j = index_in(&ids, &pair.b)?;
            if i == j {
                if d != 0.0 {
                    return Err(AmrError::Validation(format!(
                        "self-distance of '{}' must be 0, got {d}",
                        pair.a
                    )));
                }
                continue;
            }
            let key = (i.min(j), i.max(j));
            match distances.insert(key, d) {
                Some(prev) if prev != d => {
                    return Err(AmrError::Validation(format!(
                        "conflicting distances {prev} and {d} for '{}' / '{}'",
                        pair.a, pair.b
                    )))
                }
                _ => {}
            }
        }

        Ok(Self { ids, distances })
    }

    /// Hamming distances between aligned sequences (case-insensitive).
    pub fn from_sequences(sequences: &BTreeMap<String, String>) -> Result<Self, AmrError> {
        let mut lengths = sequences.iter().map(|(id, s)| (id, s.chars().count()));
        if let Some((first_id, expected)) = lengths.next() {
            if let Some((id, len)) = lengths.find(|(_, len)| *len != expected) {
                return Err(AmrError::Validation(format!(
                    "sequence '{id}' has length {len}, expected {expected} (as '{first_id}'); sequences must be aligned"
                )));
            }
        }

        let entries: Vec<(&String, Vec<char>)> = sequences
            .iter()
            .map(|(id, s)| (id, s.to_ascii_uppercase().chars().collect()))
            .collect();
        let mut pairs = Vec::new();
        for (i, (a, sa)) in entries.iter().enumerate() {
            for (b, sb) in &entries[i + 1..] {
                let d = sa.iter().zip(sb).filter(|(x, y)| x != y).count();
                pairs.push(DistancePair {
                    a: (*a).clone(),
                    b: (*b).clone(),
                    distance: d as f64,
                });
            }
        }
        Self::from_pairs(sequences.keys().cloned(), &pairs)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.binary_search_by(|probe| probe.as_str().cmp(id)).ok()
    }

    /// Distance between two ids, if known. An id is at distance 0 from itself.
    pub fn distance(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        if i == j {
            return Some(0.0);
        }
        self.distances.get(&(i.min(j), i.max(j))).copied()
    }

    /// Index pairs (i < j) with their distances, in index order.
    pub fn indexed_pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.distances.iter().map(|(&(i, j), &d)| (i, j, d))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.indexed_pairs()
            .map(|(i, j, d)| (self.ids[i].as_str(), self.ids[j].as_str(), d))
    }

    /// The sub-matrix over the given ids. Ids not in the matrix are ignored.
    pub fn restrict(&self, keep: &BTreeSet<String>) -> DistanceMatrix {
        let ids: Vec<String> = self.ids.iter().filter(|id| keep.contains(*id)).cloned().collect();
        let remap: BTreeMap<usize, usize> = self
            .ids
            .iter()
            .enumerate()
            .filter_map(|(old, id)| {
                ids.binary_search(id).ok().map(|new| (old, new))
            })
            .collect();
        let distances = self
            .distances
            .iter()
            .filter_map(|(&(i, j), &d)| Some(((*remap.get(&i)?, *remap.get(&j)?), d)))
            .collect();
        DistanceMatrix { ids, distances }
    }
}

fn index_in(ids: &[String], id: &str) -> Result<usize, AmrError> {
    ids.binary_search_by(|probe| probe.as_str().cmp(id))
        .map_err(|_| AmrError::Validation(format!("distance references unknown isolate '{id}'")))
}

/// Distance input as accepted from JSON: either explicit pairs or aligned
/// sequences to compare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DistanceSource {
    Pairs {
        ids: Vec<String>,
        pairs: Vec<DistancePair>,
    },
    Sequences {
        sequences: BTreeMap<String, String>,
    },
}

impl DistanceSource {
    pub fn into_matrix(self) -> Result<DistanceMatrix, AmrError> {
        match self {
            DistanceSource::Pairs { ids, pairs } => DistanceMatrix::from_pairs(ids, &pairs),
            DistanceSource::Sequences { sequences } => DistanceMatrix::from_sequences(&sequences),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str, d: f64) -> DistancePair {
        DistancePair {
            a: a.into(),
            b: b.into(),
            distance: d,
        }
    }

    #[test]
    fn test_symmetric_lookup() {
        let m = DistanceMatrix::from_pairs(["B", "A", "C"], &[pair("B", "A", 5.0)]).unwrap();
        assert_eq!(m.ids(), &["A", "B", "C"]);
        assert_eq!(m.distance("A", "B"), Some(5.0));
        assert_eq!(m.distance("B", "A"), Some(5.0));
        assert_eq!(m.distance("A", "C"), None);
        assert_eq!(m.distance("C", "C"), Some(0.0));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(DistanceMatrix::from_pairs(["A", "B"], &[pair("A", "B", -1.0)]).is_err());
        assert!(DistanceMatrix::from_pairs(["A", "B"], &[pair("A", "B", f64::NAN)]).is_err());
    }

    #[test]
    fn test_rejects_unknown_id() {
        let err = DistanceMatrix::from_pairs(["A"], &[pair("A", "Z", 1.0)]).unwrap_err();
        assert!(err.to_string().contains("'Z'"));
    }

    #[test]
    fn test_conflicting_duplicate_rejected() {
        let pairs = [pair("A", "B", 1.0), pair("B", "A", 2.0)];
        assert!(DistanceMatrix::from_pairs(["A", "B"], &pairs).is_err());
        let pairs = [pair("A", "B", 1.0), pair("B", "A", 1.0)];
        assert!(DistanceMatrix::from_pairs(["A", "B"], &pairs).is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        assert!(DistanceMatrix::from_pairs(["A", "A"], &[]).is_err());
    }

    #[test]
    fn test_hamming_from_sequences() {
        let seqs: BTreeMap<String, String> = [
            ("iso1".to_string(), "ACGTAC".to_string()),
            ("iso2".to_string(), "acgtaa".to_string()),
            ("iso3".to_string(), "TTTTTT".to_string()),
        ]
        .into_iter()
        .collect();
        let m = DistanceMatrix::from_sequences(&seqs).unwrap();
        assert_eq!(m.distance("iso1", "iso2"), Some(1.0));
        assert_eq!(m.distance("iso1", "iso3"), Some(5.0));
    }

    #[test]
    fn test_unaligned_sequences_rejected() {
        let seqs: BTreeMap<String, String> = [
            ("a".to_string(), "ACGT".to_string()),
            ("b".to_string(), "ACG".to_string()),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            DistanceMatrix::from_sequences(&seqs),
            Err(AmrError::Validation(_))
        ));
    }

    #[test]
    fn test_restrict() {
        let m = DistanceMatrix::from_pairs(
            ["A", "B", "C"],
            &[pair("A", "B", 1.0), pair("B", "C", 2.0), pair("A", "C", 3.0)],
        )
        .unwrap();
        let keep: BTreeSet<String> = ["A".to_string(), "C".to_string(), "Q".to_string()].into();
        let sub = m.restrict(&keep);
        assert_eq!(sub.ids(), &["A", "C"]);
        assert_eq!(sub.distance("A", "C"), Some(3.0));
        assert_eq!(sub.pairs().count(), 1);
    }

    #[test]
    fn test_source_from_json() {
        let json = r#"{"ids": ["A", "B"], "pairs": [{"a": "A", "b": "B", "distance": 4}]}"#;
        let src: DistanceSource = serde_json::from_str(json).unwrap();
        let m = src.into_matrix().unwrap();
        assert_eq!(m.distance("A", "B"), Some(4.0));

        let json = r#"{"sequences": {"x": "AAAA", "y": "AATA"}}"#;
        let src: DistanceSource = serde_json::from_str(json).unwrap();
        assert_eq!(src.into_matrix().unwrap().distance("x", "y"), Some(1.0));
    }
}
