//! Classical additive decomposition: observed = trend + seasonal + residual.

use crate::error::AmrError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of an evenly spaced series. `rate: None` marks a point
/// the caller knows to be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub rate: Option<f64>,
}

/// Trend, seasonal and residual components, each as long as the input.
///
/// `trend` and `residual` are `None` for the first and last `period / 2`
/// points, where the centered moving average is undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub period: usize,
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Least-squares slope of the trend component, per step.
    pub slope: f64,
    /// Half the peak-to-trough range of the seasonal component.
    pub seasonal_amplitude: f64,
}

pub fn decompose(points: &[TimeSeriesPoint], period: usize) -> Result<Decomposition, AmrError> {
    if period < 2 {
        return Err(AmrError::Validation(format!(
            "seasonal period must be at least 2, got {period}"
        )));
    }

    for pair in points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(AmrError::Validation(format!(
                "series is not strictly ordered by date at {}",
                pair[1].date
            )));
        }
    }

    let mut observed = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        match p.rate {
            Some(v) if v.is_finite() => observed.push(v),
            Some(v) => {
                return Err(AmrError::Validation(format!(
                    "non-finite value {v} at index {i} ({})",
                    p.date
                )))
            }
            None => {
                return Err(AmrError::Validation(format!(
                    "missing value at index {i} ({}); interpolate or shorten the series",
                    p.date
                )))
            }
        }
    }

    let n = observed.len();
    if n < 2 * period {
        return Err(AmrError::InsufficientData {
            needed: 2 * period,
            got: n,
        });
    }

    let trend = centered_moving_average(&observed, period);

    // Mean deviation from trend per phase, over points where the trend exists.
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, t) in trend.iter().enumerate() {
        if let Some(t) = t {
            sums[i % period] += observed[i] - t;
            counts[i % period] += 1;
        }
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let mean_index = indices.iter().sum::<f64>() / period as f64;
    for idx in &mut indices {
        *idx -= mean_index;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let residual: Vec<Option<f64>> = trend
        .iter()
        .enumerate()
        .map(|(i, t)| t.map(|t| observed[i] - t - seasonal[i]))
        .collect();

    Ok(Decomposition {
        period,
        dates: points.iter().map(|p| p.date).collect(),
        observed,
        trend,
        seasonal,
        residual,
    })
}

/// 2xP moving average for even P, plain P-point average for odd P.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut out = vec![None; n];
    for i in half..n.saturating_sub(half) {
        let avg = if period % 2 == 0 {
            let inner: f64 = values[i - half + 1..i + half].iter().sum();
            (0.5 * values[i - half] + inner + 0.5 * values[i + half]) / period as f64
        } else {
            values[i - half..=i + half].iter().sum::<f64>() / period as f64
        };
        out[i] = Some(avg);
    }
    out
}

impl Decomposition {
    pub fn summary(&self) -> TrendSummary {
        let defined: Vec<(f64, f64)> = self
            .trend
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|t| (i as f64, t)))
            .collect();
        let slope = least_squares_slope(&defined);

        let period_values = &self.seasonal[..self.period.min(self.seasonal.len())];
        let max = period_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = period_values.iter().copied().fold(f64::INFINITY, f64::min);
        let seasonal_amplitude = if max.is_finite() && min.is_finite() {
            (max - min) / 2.0
        } else {
            0.0
        };

        TrendSummary {
            slope,
            seasonal_amplitude,
        }
    }
}

fn least_squares_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    if points.len() < 2 {
        return 0.0;
    }
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        0.0
    } else {
        sxy / sxx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangePointOptions {
    /// Trailing window length, in points.
    pub window: usize,
    /// A window is flagged when its residual variance exceeds this multiple
    /// of the long-run residual variance.
    pub multiple: f64,
}

impl ChangePointOptions {
    pub fn for_period(period: usize) -> Self {
        Self {
            window: period,
            multiple: 3.0,
        }
    }
}

/// Candidate change points: indices (into the original series) at which the
/// trailing-window residual variance exceeds `multiple` times the long-run
/// variance. Returns every candidate so the caller can judge ambiguity.
pub fn detect_change_points(
    decomposition: &Decomposition,
    options: &ChangePointOptions,
) -> Result<Vec<usize>, AmrError> {
    if options.window < 2 {
        return Err(AmrError::Validation(format!(
            "change-point window must be at least 2, got {}",
            options.window
        )));
    }
    if !options.multiple.is_finite() || options.multiple <= 0.0 {
        return Err(AmrError::Validation(format!(
            "change-point multiple must be positive, got {}",
            options.multiple
        )));
    }

    let residuals: Vec<(usize, f64)> = decomposition
        .residual
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.map(|r| (i, r)))
        .collect();

    if residuals.len() < options.window {
        return Err(AmrError::InsufficientData {
            needed: options.window,
            got: residuals.len(),
        });
    }

    let values: Vec<f64> = residuals.iter().map(|r| r.1).collect();
    let long_run = variance(&values);
    if long_run < 1e-12 {
        return Ok(Vec::new());
    }

    let limit = options.multiple * long_run;
    let candidates = values
        .windows(options.window)
        .enumerate()
        .filter(|(_, w)| variance(w) > limit)
        .map(|(start, _)| residuals[start + options.window - 1].0)
        .collect();
    Ok(candidates)
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Fill interior missing points by linear interpolation between their
/// nearest known neighbours. Leading or trailing gaps cannot be filled.
pub fn interpolate_missing(points: &[TimeSeriesPoint]) -> Result<Vec<TimeSeriesPoint>, AmrError> {
    let known: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.rate.is_some())
        .map(|(i, _)| i)
        .collect();

    let (first, last) = match (known.first(), known.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => {
            return Err(AmrError::InsufficientData {
                needed: 1,
                got: 0,
            })
        }
    };
    if first != 0 || last != points.len() - 1 {
        return Err(AmrError::Validation(
            "cannot interpolate missing points at the start or end of a series".into(),
        ));
    }

    let mut out = points.to_vec();
    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (va, vb) = match (points[a].rate, points[b].rate) {
            (Some(va), Some(vb)) => (va, vb),
            _ => continue,
        };
        for (offset, point) in out[a + 1..b].iter_mut().enumerate() {
            let frac = (offset + 1) as f64 / (b - a) as f64;
            point.rate = Some(va + (vb - va) * frac);
        }
    }
    Ok(out)
}
