//! Per-(organism, antibiotic, period) surveillance records.

pub mod engine;

pub use engine::{RateTable, RunOutput, SurveillanceEngine};

use crate::cluster::ClusterSummary;
use crate::error::AmrError;
use crate::model::SurveillanceKey;
use crate::stats::{Decomposition, RateEstimate, TrendSummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResistanceEstimate {
    pub key: SurveillanceKey,
    pub estimate: RateEstimate,
    /// Results without a breakpoint, excluded from the estimate.
    pub not_established: u64,
    /// Off-scale results whose call is a worst-case bound.
    pub uncertain: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResult {
    pub key: SurveillanceKey,
    pub decomposition: Decomposition,
    pub summary: TrendSummary,
    /// Dates at which residual variance jumps. Candidates, not verdicts.
    pub change_points: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResult {
    pub key: SurveillanceKey,
    pub threshold: f64,
    /// Isolates that entered clustering.
    pub isolates: usize,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveillanceReport {
    pub key: SurveillanceKey,
    pub resistance: ResistanceEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clusters: Option<ClusterResult>,
}

/// Combine component results for one key. Pure aggregation: fails only if a
/// component was computed for a different key.
pub fn build_report(
    resistance: ResistanceEstimate,
    trend: Option<TrendResult>,
    clusters: Option<ClusterResult>,
) -> Result<SurveillanceReport, AmrError> {
    let key = resistance.key.clone();
    if let Some(t) = &trend {
        check_key("trend", &key, &t.key)?;
    }
    if let Some(c) = &clusters {
        check_key("clusters", &key, &c.key)?;
    }
    Ok(SurveillanceReport {
        key,
        resistance,
        trend,
        clusters,
    })
}

fn check_key(
    component: &str,
    expected: &SurveillanceKey,
    found: &SurveillanceKey,
) -> Result<(), AmrError> {
    if expected != found {
        return Err(AmrError::InconsistentAggregation {
            component: component.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Organism/antibiotic combination with a persistently high resistance rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityThreat {
    pub organism: String,
    pub antibiotic: String,
    pub mean_percent: f64,
    pub max_percent: f64,
    pub data_points: usize,
}

/// Combinations whose mean rate over periods is at least `threshold_pct`,
/// given at least `min_points` periods. Highest mean first.
pub fn priority_threats(
    estimates: &[ResistanceEstimate],
    threshold_pct: f64,
    min_points: usize,
) -> Vec<PriorityThreat> {
    let mut by_combo: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for e in estimates {
        by_combo
            .entry((e.key.organism.as_str(), e.key.antibiotic.as_str()))
            .or_default()
            .push(e.estimate.percent);
    }

    let mut threats: Vec<PriorityThreat> = by_combo
        .into_iter()
        .filter(|(_, rates)| rates.len() >= min_points.max(1))
        .map(|((organism, antibiotic), rates)| PriorityThreat {
            organism: organism.to_string(),
            antibiotic: antibiotic.to_string(),
            mean_percent: rates.iter().sum::<f64>() / rates.len() as f64,
            max_percent: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            data_points: rates.len(),
        })
        .filter(|t| t.mean_percent >= threshold_pct)
        .collect();
    threats.sort_by(|a, b| {
        b.mean_percent
            .total_cmp(&a.mean_percent)
            .then_with(|| (&a.organism, &a.antibiotic).cmp(&(&b.organism, &b.antibiotic)))
    });
    threats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;
    use crate::stats::{estimate_rate, RateOptions};

    fn estimate(org: &str, abx: &str, period: Period, r: i64, n: i64) -> ResistanceEstimate {
        ResistanceEstimate {
            key: SurveillanceKey::new(org, abx, period),
            estimate: estimate_rate(r, n, &RateOptions::default()).unwrap(),
            not_established: 0,
            uncertain: 0,
        }
    }

    fn cluster_result(key: SurveillanceKey) -> ClusterResult {
        ClusterResult {
            key,
            threshold: 10.0,
            isolates: 0,
            clusters: Vec::new(),
        }
    }

    #[test]
    fn test_build_report_matching_keys() {
        let p = Period::year(2023).unwrap();
        let e = estimate("escherichia_coli", "ciprofloxacin", p, 3, 10);
        let c = cluster_result(e.key.clone());
        let report = build_report(e, None, Some(c)).unwrap();
        assert_eq!(report.key.antibiotic, "ciprofloxacin");
        assert!(report.trend.is_none());
        assert!(report.clusters.is_some());
    }

    #[test]
    fn test_build_report_key_mismatch() {
        let e = estimate(
            "escherichia_coli",
            "ciprofloxacin",
            Period::year(2023).unwrap(),
            3,
            10,
        );
        let other = SurveillanceKey::new(
            "escherichia_coli",
            "ciprofloxacin",
            Period::year(2022).unwrap(),
        );
        match build_report(e, None, Some(cluster_result(other))) {
            Err(AmrError::InconsistentAggregation {
                component,
                expected,
                found,
            }) => {
                assert_eq!(component, "clusters");
                assert!(expected.ends_with("2023"));
                assert!(found.ends_with("2022"));
            }
            other => panic!("expected InconsistentAggregation, got {other:?}"),
        }
    }

    #[test]
    fn test_priority_threats() {
        let years = |y| Period::year(y).unwrap();
        let estimates = vec![
            estimate("klebsiella_pneumoniae", "meropenem", years(2020), 5, 20),
            estimate("klebsiella_pneumoniae", "meropenem", years(2021), 7, 20),
            estimate("klebsiella_pneumoniae", "meropenem", years(2022), 9, 20),
            estimate("escherichia_coli", "ciprofloxacin", years(2020), 1, 20),
            estimate("escherichia_coli", "ciprofloxacin", years(2021), 2, 20),
            estimate("escherichia_coli", "ciprofloxacin", years(2022), 3, 20),
            // High but too few points.
            estimate("acinetobacter_baumannii", "meropenem", years(2022), 18, 20),
        ];
        let threats = priority_threats(&estimates, 20.0, 3);
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].organism, "klebsiella_pneumoniae");
        assert!((threats[0].mean_percent - 35.0).abs() < 1e-9);
        assert!((threats[0].max_percent - 45.0).abs() < 1e-9);
        assert_eq!(threats[0].data_points, 3);
    }
}
