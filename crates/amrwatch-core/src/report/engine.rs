use crate::breakpoints::schema::BreakpointTable;
use crate::cluster::{summarize_clusters, DistanceMatrix};
use crate::config::AnalysisConfig;
use crate::error::AmrError;
use crate::interpret::{interpret_isolate, InterpretedCall, IsolateInterpretation};
use crate::model::{Granularity, Isolate, Period, SurveillanceKey, SusceptibilityCall};
use crate::report::{
    build_report, ClusterResult, ResistanceEstimate, SurveillanceReport, TrendResult,
};
use crate::stats::{
    decompose, detect_change_points, estimate_rate, interpolate_missing, TimeSeriesPoint,
};
use crate::trace::{build_entry_trace, build_report_decisions, TraceBundle, TraceWarning};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Call counts for one surveillance cell. Intermediate counts as
/// non-resistant; NotEstablished is kept out of the denominator.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    resistant: i64,
    tested: i64,
    not_established: u64,
    uncertain: u64,
}

impl Tally {
    fn add(&mut self, call: SusceptibilityCall, uncertain: bool) {
        match call {
            SusceptibilityCall::NotEstablished => {
                self.not_established += 1;
                return;
            }
            SusceptibilityCall::Resistant => self.resistant += 1,
            SusceptibilityCall::Susceptible | SusceptibilityCall::Intermediate => {}
        }
        self.tested += 1;
        if uncertain {
            self.uncertain += 1;
        }
    }
}

/// One interpreted result, flattened for grouping.
#[derive(Debug, Clone)]
struct Observation {
    isolate_id: String,
    collected: NaiveDate,
    call: SusceptibilityCall,
    uncertain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub table: String,
    pub granularity: Granularity,
    pub rows: Vec<ResistanceEstimate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraceWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub table: String,
    pub window: Period,
    pub reports: Vec<SurveillanceReport>,
    pub trace: TraceBundle,
}

/// Runs surveillance analyses against one pinned breakpoint table.
#[derive(Debug, Clone)]
pub struct SurveillanceEngine {
    table: BreakpointTable,
    config: AnalysisConfig,
}

struct KeyOutcome {
    report: Option<SurveillanceReport>,
    warnings: Vec<TraceWarning>,
}

impl SurveillanceEngine {
    pub fn new(table: BreakpointTable, config: AnalysisConfig) -> Result<Self, AmrError> {
        config.validate()?;
        Ok(Self { table, config })
    }

    pub fn table(&self) -> &BreakpointTable {
        &self.table
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn interpret_all(
        &self,
        isolates: &[Isolate],
    ) -> Result<Vec<IsolateInterpretation>, AmrError> {
        isolates
            .par_iter()
            .map(|iso| interpret_isolate(iso, &self.table))
            .collect()
    }

    /// Resistance estimates per (organism, antibiotic, period bucket).
    pub fn rate_table(
        &self,
        isolates: &[Isolate],
        granularity: Granularity,
    ) -> Result<RateTable, AmrError> {
        let interpretations = self.interpret_all(isolates)?;
        let mut cells: BTreeMap<SurveillanceKey, Tally> = BTreeMap::new();
        for (iso, interp) in isolates.iter().zip(&interpretations) {
            let period = granularity.bucket(iso.collected).ok_or_else(|| {
                AmrError::Validation(format!(
                    "isolate '{}': no {granularity} bucket for {}",
                    iso.id, iso.collected
                ))
            })?;
            for call in &interp.calls {
                cells
                    .entry(SurveillanceKey::new(
                        interp.organism.clone(),
                        call.antibiotic.clone(),
                        period,
                    ))
                    .or_default()
                    .add(call.call, call.uncertain);
            }
        }

        let options = self.config.rate_options();
        let mut rows = Vec::new();
        let mut warnings = Vec::new();
        for (key, tally) in cells {
            if tally.tested == 0 {
                warnings.push(not_established_warning(&key, &tally));
                continue;
            }
            rows.push(ResistanceEstimate {
                estimate: estimate_rate(tally.resistant, tally.tested, &options)?,
                key,
                not_established: tally.not_established,
                uncertain: tally.uncertain,
            });
        }

        Ok(RateTable {
            table: self.table.label(),
            granularity,
            rows,
            warnings,
        })
    }

    /// Full surveillance report for every (organism, antibiotic) observed in
    /// `window`. Clusters are computed among resistant isolates when a
    /// distance matrix is supplied.
    pub fn run(
        &self,
        isolates: &[Isolate],
        window: Period,
        distances: Option<&DistanceMatrix>,
    ) -> Result<RunOutput, AmrError> {
        let in_window: Vec<&Isolate> = isolates
            .iter()
            .filter(|iso| window.contains(iso.collected))
            .collect();
        debug!(
            total = isolates.len(),
            in_window = in_window.len(),
            window = %window,
            "starting surveillance run"
        );

        let interpretations: Vec<IsolateInterpretation> = in_window
            .par_iter()
            .map(|iso| interpret_isolate(iso, &self.table))
            .collect::<Result<_, _>>()?;

        let label = self.table.label();
        let mut trace = TraceBundle::default();
        let mut groups: BTreeMap<(String, String), Vec<Observation>> = BTreeMap::new();
        for (iso, interp) in in_window.iter().zip(&interpretations) {
            for (idx, call) in interp.calls.iter().enumerate() {
                trace.entries.push(build_entry_trace(interp, idx, call, &label));
                groups
                    .entry((interp.organism.clone(), call.antibiotic.clone()))
                    .or_default()
                    .push(observation(iso, call));
            }
        }

        let outcomes: Vec<KeyOutcome> = groups
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|((organism, antibiotic), obs)| {
                let key = SurveillanceKey::new(organism, antibiotic, window);
                self.analyze_key(key, &obs, distances)
            })
            .collect::<Result<_, _>>()?;

        let mut reports = Vec::new();
        for outcome in outcomes {
            trace.warnings.extend(outcome.warnings);
            reports.extend(outcome.report);
        }
        reports.sort_by(|a, b| a.key.cmp(&b.key));
        for report in &reports {
            trace.decisions.extend(build_report_decisions(report));
        }

        Ok(RunOutput {
            table: label,
            window,
            reports,
            trace,
        })
    }

    fn analyze_key(
        &self,
        key: SurveillanceKey,
        obs: &[Observation],
        distances: Option<&DistanceMatrix>,
    ) -> Result<KeyOutcome, AmrError> {
        let mut tally = Tally::default();
        for o in obs {
            tally.add(o.call, o.uncertain);
        }
        if tally.tested == 0 {
            return Ok(KeyOutcome {
                report: None,
                warnings: vec![not_established_warning(&key, &tally)],
            });
        }

        debug!(key = %key, resistant = tally.resistant, tested = tally.tested, "estimating rate");
        let resistance = ResistanceEstimate {
            estimate: estimate_rate(tally.resistant, tally.tested, &self.config.rate_options())?,
            key: key.clone(),
            not_established: tally.not_established,
            uncertain: tally.uncertain,
        };

        let mut warnings = Vec::new();
        let trend = self.monthly_trend(&key, obs, &mut warnings);
        let clusters = match distances {
            Some(matrix) => Some(self.resistant_clusters(&key, obs, matrix, &mut warnings)?),
            None => None,
        };

        Ok(KeyOutcome {
            report: Some(build_report(resistance, trend, clusters)?),
            warnings,
        })
    }

    /// Monthly resistance series over the key's period, decomposed when long
    /// enough. Interior months without tested isolates are interpolated.
    fn monthly_trend(
        &self,
        key: &SurveillanceKey,
        obs: &[Observation],
        warnings: &mut Vec<TraceWarning>,
    ) -> Option<TrendResult> {
        let period = self.config.seasonal_period;
        let months = key.period.months();
        if months.len() < 2 * period {
            debug!(key = %key, months = months.len(), "window too short for decomposition");
            warnings.push(TraceWarning::for_key(
                key.to_string(),
                format!(
                    "trend skipped: {} month(s) in window, decomposition needs {}",
                    months.len(),
                    2 * period
                ),
            ));
            return None;
        }

        let points: Vec<TimeSeriesPoint> = months
            .iter()
            .map(|month| {
                let mut tally = Tally::default();
                for o in obs.iter().filter(|o| month.contains(o.collected)) {
                    tally.add(o.call, o.uncertain);
                }
                TimeSeriesPoint {
                    date: month.start,
                    rate: (tally.tested > 0)
                        .then(|| 100.0 * tally.resistant as f64 / tally.tested as f64),
                }
            })
            .collect();

        let missing = points.iter().filter(|p| p.rate.is_none()).count();
        let points = if missing > 0 {
            match interpolate_missing(&points) {
                Ok(filled) => {
                    warnings.push(TraceWarning::for_key(
                        key.to_string(),
                        format!("{missing} month(s) without isolates were interpolated"),
                    ));
                    filled
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "trend skipped");
                    warnings.push(TraceWarning::for_key(
                        key.to_string(),
                        format!("trend skipped: {e}"),
                    ));
                    return None;
                }
            }
        } else {
            points
        };

        let decomposition = match decompose(&points, period) {
            Ok(d) => d,
            Err(e) => {
                warn!(key = %key, error = %e, "trend skipped");
                warnings.push(TraceWarning::for_key(
                    key.to_string(),
                    format!("trend skipped: {e}"),
                ));
                return None;
            }
        };

        let change_points = match detect_change_points(
            &decomposition,
            &self.config.change_point_options(),
        ) {
            Ok(indices) => indices
                .into_iter()
                .map(|i| decomposition.dates[i])
                .collect(),
            Err(e) => {
                warnings.push(TraceWarning::for_key(
                    key.to_string(),
                    format!("change points skipped: {e}"),
                ));
                Vec::new()
            }
        };

        Some(TrendResult {
            key: key.clone(),
            summary: decomposition.summary(),
            decomposition,
            change_points,
        })
    }

    fn resistant_clusters(
        &self,
        key: &SurveillanceKey,
        obs: &[Observation],
        matrix: &DistanceMatrix,
        warnings: &mut Vec<TraceWarning>,
    ) -> Result<ClusterResult, AmrError> {
        let resistant: BTreeSet<String> = obs
            .iter()
            .filter(|o| o.call == SusceptibilityCall::Resistant)
            .map(|o| o.isolate_id.clone())
            .collect();
        let unsequenced = resistant
            .iter()
            .filter(|id| matrix.index_of(id).is_none())
            .count();
        if unsequenced > 0 {
            warnings.push(TraceWarning::for_key(
                key.to_string(),
                format!("{unsequenced} resistant isolate(s) have no genetic distances"),
            ));
        }

        let sub = matrix.restrict(&resistant);
        let clusters = summarize_clusters(
            &sub,
            self.config.cluster_threshold,
            self.config.min_cluster_size,
        )?;
        Ok(ClusterResult {
            key: key.clone(),
            threshold: self.config.cluster_threshold,
            isolates: sub.len(),
            clusters,
        })
    }
}

fn observation(iso: &Isolate, call: &InterpretedCall) -> Observation {
    Observation {
        isolate_id: iso.id.clone(),
        collected: iso.collected,
        call: call.call,
        uncertain: call.uncertain,
    }
}

fn not_established_warning(key: &SurveillanceKey, tally: &Tally) -> TraceWarning {
    warn!(key = %key, count = tally.not_established, "no breakpoint; no estimate");
    TraceWarning::for_key(
        key.to_string(),
        format!(
            "no estimate: all {} result(s) have no established breakpoint",
            tally.not_established
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::builtin::load_preset;
    use crate::cluster::DistancePair;
    use crate::model::MeasuredValue;
    use rust_decimal_macros::dec;

    fn isolate(id: &str, org: &str, date: NaiveDate, abx: &str, value: MeasuredValue) -> Isolate {
        Isolate {
            id: id.into(),
            organism: org.into(),
            specimen: None,
            collected: date,
            ward: None,
            results: [(abx.to_string(), value)].into_iter().collect(),
        }
    }

    fn engine() -> SurveillanceEngine {
        SurveillanceEngine::new(load_preset("eucast-14").unwrap(), AnalysisConfig::default())
            .unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rate_table_counts_intermediate_as_non_resistant() {
        let isolates = vec![
            isolate("1", "E. coli", d(2023, 1, 5), "CIP", MeasuredValue::Mic(dec!(4))),
            isolate("2", "E. coli", d(2023, 2, 5), "CIP", MeasuredValue::Mic(dec!(0.5))),
            isolate("3", "E. coli", d(2023, 3, 5), "CIP", MeasuredValue::Mic(dec!(0.06))),
            isolate("4", "E. coli", d(2022, 3, 5), "CIP", MeasuredValue::Mic(dec!(8))),
        ];
        let table = engine().rate_table(&isolates, Granularity::Year).unwrap();
        assert_eq!(table.rows.len(), 2);
        let row_2023 = &table.rows[1];
        assert_eq!(row_2023.key.period.to_string(), "2023");
        assert_eq!(row_2023.estimate.resistant, 1);
        assert_eq!(row_2023.estimate.total, 3);
    }

    #[test]
    fn test_not_established_excluded() {
        let isolates = vec![
            isolate("1", "E. coli", d(2023, 1, 5), "CIP", MeasuredValue::Mic(dec!(4))),
            isolate("2", "E. coli", d(2023, 1, 6), "Unobtainium", MeasuredValue::Mic(dec!(4))),
        ];
        let table = engine().rate_table(&isolates, Granularity::Year).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.warnings.len(), 1);
    }

    #[test]
    fn test_aliased_results_count_once_per_isolate() {
        let mut iso = isolate("1", "E. coli", d(2023, 1, 5), "CIP", MeasuredValue::Mic(dec!(4)));
        iso.results
            .insert("Ciprofloxacin".into(), MeasuredValue::Above(dec!(2)));
        let table = engine().rate_table(&[iso], Granularity::Year).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].estimate.total, 1);
        assert_eq!(table.rows[0].estimate.resistant, 1);
    }

    #[test]
    fn test_conflicting_aliases_fail_the_run() {
        let mut iso = isolate("1", "E. coli", d(2023, 1, 5), "CIP", MeasuredValue::Mic(dec!(4)));
        iso.results
            .insert("Ciprofloxacin".into(), MeasuredValue::Mic(dec!(0.06)));
        let window = Period::year(2023).unwrap();
        assert!(matches!(
            engine().run(&[iso.clone()], window, None),
            Err(AmrError::Validation(_))
        ));
        assert!(engine().rate_table(&[iso], Granularity::Year).is_err());
    }

    #[test]
    fn test_run_clusters_resistant_only() {
        let window = Period::year(2023).unwrap();
        let isolates = vec![
            isolate("A", "E. coli", d(2023, 1, 5), "CIP", MeasuredValue::Mic(dec!(4))),
            isolate("B", "E. coli", d(2023, 2, 5), "CIP", MeasuredValue::Above(dec!(2))),
            isolate("C", "E. coli", d(2023, 3, 5), "CIP", MeasuredValue::Mic(dec!(0.06))),
            isolate("Z", "E. coli", d(2021, 3, 5), "CIP", MeasuredValue::Mic(dec!(4))),
        ];
        let pairs = [
            DistancePair {
                a: "A".into(),
                b: "B".into(),
                distance: 3.0,
            },
            DistancePair {
                a: "B".into(),
                b: "C".into(),
                distance: 1.0,
            },
        ];
        let matrix = DistanceMatrix::from_pairs(["A", "B", "C"], &pairs).unwrap();
        let out = engine().run(&isolates, window, Some(&matrix)).unwrap();

        assert_eq!(out.reports.len(), 1);
        let report = &out.reports[0];
        assert_eq!(report.key.organism, "escherichia_coli");
        assert_eq!(report.resistance.estimate.total, 3);
        assert_eq!(report.resistance.estimate.resistant, 2);
        let clusters = report.clusters.as_ref().unwrap();
        assert_eq!(clusters.isolates, 2);
        assert_eq!(clusters.clusters[0].members, vec!["A", "B"]);
        // A 12-month window is too short for a period-12 decomposition.
        assert!(report.trend.is_none());
        assert!(!out.trace.warnings.is_empty());
        assert_eq!(out.trace.entries.len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            seasonal_period: 0,
            ..AnalysisConfig::default()
        };
        assert!(SurveillanceEngine::new(load_preset("eucast-14").unwrap(), config).is_err());
    }
}
