//! Property-based tests for rates, interpretation, clustering and forecasts.

use amrwatch_core::breakpoints::builtin::load_preset;
use amrwatch_core::cluster::{detect_clusters, DistanceMatrix, DistancePair};
use amrwatch_core::interpret::interpret_value;
use amrwatch_core::model::{MeasuredValue, SusceptibilityCall};
use amrwatch_core::stats::{estimate_rate, forecast, IntervalMethod, RateOptions};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn counts() -> impl Strategy<Value = (i64, i64)> {
    (1i64..5000).prop_flat_map(|n| (0..=n, Just(n)))
}

fn severity(call: SusceptibilityCall) -> u8 {
    match call {
        SusceptibilityCall::Susceptible => 0,
        SusceptibilityCall::Intermediate => 1,
        SusceptibilityCall::Resistant => 2,
        SusceptibilityCall::NotEstablished => 3,
    }
}

// =============================================================================
// Rate intervals
// =============================================================================

proptest! {
    /// 0 <= lower <= percent <= upper <= 100 for both interval methods
    #[test]
    fn prop_interval_contains_estimate((r, n) in counts(), wilson in any::<bool>()) {
        let options = RateOptions {
            method: if wilson { IntervalMethod::Wilson } else { IntervalMethod::Wald },
            ..RateOptions::default()
        };
        let e = estimate_rate(r, n, &options).unwrap();
        prop_assert!(0.0 <= e.lower);
        prop_assert!(e.lower <= e.percent);
        prop_assert!(e.percent <= e.upper);
        prop_assert!(e.upper <= 100.0);
    }

    /// A wider confidence level never narrows the interval
    #[test]
    fn prop_wider_confidence_wider_interval((r, n) in counts()) {
        let narrow = estimate_rate(r, n, &RateOptions { confidence_level: 0.9, ..RateOptions::default() }).unwrap();
        let wide = estimate_rate(r, n, &RateOptions { confidence_level: 0.99, ..RateOptions::default() }).unwrap();
        prop_assert!(wide.lower <= narrow.lower + 1e-9);
        prop_assert!(wide.upper >= narrow.upper - 1e-9);
    }
}

// =============================================================================
// Interpretation
// =============================================================================

proptest! {
    /// Same input, same call; a higher MIC is never less resistant
    #[test]
    fn prop_interpretation_idempotent_and_monotone(a in 1u32..2048, b in 1u32..2048) {
        let table = load_preset("eucast-14").unwrap();
        let mic = |v: u32| MeasuredValue::Mic(Decimal::new(v as i64, 2));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let first = interpret_value(&table, "escherichia_coli", "ciprofloxacin", &mic(lo));
        let again = interpret_value(&table, "escherichia_coli", "ciprofloxacin", &mic(lo));
        prop_assert_eq!(first.call, again.call);
        prop_assert_eq!(&first.reason, &again.reason);

        let higher = interpret_value(&table, "escherichia_coli", "ciprofloxacin", &mic(hi));
        prop_assert!(severity(first.call) <= severity(higher.call));
    }

    /// Antibiotics without an entry are never guessed
    #[test]
    fn prop_missing_entry_not_established(v in 1u32..100_000) {
        let table = load_preset("eucast-14").unwrap();
        let call = interpret_value(
            &table,
            "escherichia_coli",
            "daptomycin",
            &MeasuredValue::Mic(Decimal::new(v as i64, 3)),
        );
        prop_assert_eq!(call.call, SusceptibilityCall::NotEstablished);
    }
}

// =============================================================================
// Clustering
// =============================================================================

fn distance_pairs() -> impl Strategy<Value = Vec<(usize, usize, u8)>> {
    prop::collection::vec((0usize..8, 0usize..8, 0u8..30), 0..20)
        .prop_map(|v| v.into_iter().filter(|(a, b, _)| a != b).collect::<Vec<_>>())
}

fn to_pairs(raw: &[(usize, usize, u8)], swap: bool) -> Vec<DistancePair> {
    // Keep the first distance per unordered pair so inputs never conflict.
    let mut seen = std::collections::BTreeSet::new();
    raw.iter()
        .filter(|(a, b, _)| seen.insert(((*a).min(*b), (*a).max(*b))))
        .map(|&(a, b, d)| {
            let (a, b) = if swap { (b, a) } else { (a, b) };
            DistancePair {
                a: format!("iso{a}"),
                b: format!("iso{b}"),
                distance: d as f64,
            }
        })
        .collect()
}

fn ids() -> Vec<String> {
    (0..8).map(|i| format!("iso{i}")).collect()
}

proptest! {
    /// Clusters do not depend on pair order or pair orientation
    #[test]
    fn prop_clusters_order_independent(raw in distance_pairs(), threshold in 0u8..30) {
        let forward = to_pairs(&raw, false);
        let mut backward = to_pairs(&raw, true);
        backward.reverse();
        let mut reversed_ids = ids();
        reversed_ids.reverse();

        let m1 = DistanceMatrix::from_pairs(ids(), &forward).unwrap();
        let m2 = DistanceMatrix::from_pairs(reversed_ids, &backward).unwrap();
        let c1 = detect_clusters(&m1, threshold as f64).unwrap();
        let c2 = detect_clusters(&m2, threshold as f64).unwrap();
        prop_assert_eq!(c1, c2);
    }

    /// Every linked pair lands in the same cluster; every isolate in exactly one
    #[test]
    fn prop_linked_pairs_share_cluster(raw in distance_pairs(), threshold in 0u8..30) {
        let pairs = to_pairs(&raw, false);
        let m = DistanceMatrix::from_pairs(ids(), &pairs).unwrap();
        let clusters = detect_clusters(&m, threshold as f64).unwrap();

        let total: usize = clusters.iter().map(|c| c.size()).sum();
        prop_assert_eq!(total, 8);

        let cluster_of = |id: &str| clusters.iter().position(|c| c.members.iter().any(|m| m == id));
        for p in pairs.iter().filter(|p| p.distance <= threshold as f64) {
            prop_assert_eq!(cluster_of(p.a.as_str()), cluster_of(p.b.as_str()));
        }
    }
}

// =============================================================================
// Forecasts
// =============================================================================

proptest! {
    /// Forecast points and bounds stay within [0, 100] percent
    #[test]
    fn prop_forecast_bounded(
        rates in prop::collection::vec(0.0f64..=100.0, 3..12),
        horizon in 1usize..10,
    ) {
        let points: Vec<(f64, f64)> = rates
            .iter()
            .enumerate()
            .map(|(i, r)| (2010.0 + i as f64, *r))
            .collect();
        let f = forecast(&points, horizon, 0.95).unwrap();
        prop_assert_eq!(f.points.len(), horizon);
        for p in &f.points {
            prop_assert!((0.0..=100.0).contains(&p.lower));
            prop_assert!((0.0..=100.0).contains(&p.predicted));
            prop_assert!((0.0..=100.0).contains(&p.upper));
            prop_assert!(p.lower <= p.predicted && p.predicted <= p.upper);
        }
    }
}
