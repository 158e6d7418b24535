use amrwatch_core::cluster::{degree_centrality, summarize_clusters, DistanceSource};
use amrwatch_core::error::AmrError;
use amrwatch_core::risk::{score, PatientFactors};
use amrwatch_core::stats::{
    decompose as decompose_series, detect_change_points, forecast as forecast_rates,
    interpolate_missing, ChangePointOptions, TimeSeriesPoint,
};
use amrwatch_core::{load_config, AnalysisConfig};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;

use crate::commands::{is_json, read_json};
use crate::output;

pub fn cluster(
    input_file: &Path,
    threshold: f64,
    min_size: usize,
    output_format: &str,
) -> Result<(), AmrError> {
    let matrix = read_json::<DistanceSource>(input_file)?.into_matrix()?;
    let clusters = summarize_clusters(&matrix, threshold, min_size)?;

    if is_json(output_format) {
        let centrality = degree_centrality(&matrix, threshold)?;
        output::json::print(&json!({
            "threshold": threshold,
            "isolates": matrix.len(),
            "clusters": clusters,
            "degree_centrality": centrality,
        }))?;
    } else {
        output::table::print_clusters(&clusters, threshold);
    }
    Ok(())
}

pub fn decompose(
    input_file: &Path,
    period: usize,
    interpolate: bool,
    multiple: f64,
    output_format: &str,
) -> Result<(), AmrError> {
    let mut points: Vec<TimeSeriesPoint> = read_json(input_file)?;
    if interpolate {
        points = interpolate_missing(&points)?;
    }

    let d = decompose_series(&points, period)?;
    let change_points = detect_change_points(
        &d,
        &ChangePointOptions {
            window: period,
            multiple,
        },
    )?;

    if is_json(output_format) {
        output::json::print(&json!({
            "decomposition": d,
            "summary": d.summary(),
            "change_points": change_points,
        }))?;
    } else {
        output::table::print_decomposition(&d, &change_points);
    }
    Ok(())
}

/// One yearly rate as accepted by `forecast`.
#[derive(Debug, Deserialize)]
struct YearlyRate {
    #[serde(alias = "x")]
    year: f64,
    #[serde(alias = "percent")]
    rate: f64,
}

pub fn forecast(
    input_file: &Path,
    horizon: usize,
    confidence: f64,
    output_format: &str,
) -> Result<(), AmrError> {
    let rates: Vec<YearlyRate> = read_json(input_file)?;
    let points: Vec<(f64, f64)> = rates.iter().map(|r| (r.year, r.rate)).collect();
    let f = forecast_rates(&points, horizon, confidence)?;

    if is_json(output_format) {
        output::json::print(&f)?;
    } else {
        output::table::print_forecast(&f);
    }
    Ok(())
}

pub fn risk(input_file: &Path, config: Option<&Path>, output_format: &str) -> Result<(), AmrError> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    let factors: PatientFactors = read_json(input_file)?;
    let total = score(&factors, &config.risk_weighting)?;
    let tier = config.risk_thresholds.stratify(total);

    if is_json(output_format) {
        output::json::print(&json!({ "score": total, "tier": tier }))?;
    } else {
        output::table::print_risk(total, tier);
    }
    Ok(())
}
