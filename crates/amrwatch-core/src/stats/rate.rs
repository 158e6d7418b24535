use crate::error::AmrError;
use serde::{Deserialize, Serialize};

/// How the confidence interval of a proportion is computed.
///
/// Wald is the default and clamps its bounds to [0, 100] %. Near 0 % and
/// 100 % it is a known approximation; Wilson must be requested explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalMethod {
    #[default]
    Wald,
    Wilson,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateOptions {
    pub confidence_level: f64,
    pub method: IntervalMethod,
}

impl Default for RateOptions {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            method: IntervalMethod::Wald,
        }
    }
}

/// Resistance proportion with a two-sided confidence interval, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    pub resistant: u64,
    pub total: u64,
    pub percent: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    pub method: IntervalMethod,
}

/// Estimate the resistance percentage from `resistant` of `total` isolates.
///
/// Negative counts and `resistant > total` are rejected. `total == 0` is
/// mathematically undefined and reported as `AmrError::Undefined`.
pub fn estimate_rate(
    resistant: i64,
    total: i64,
    options: &RateOptions,
) -> Result<RateEstimate, AmrError> {
    if resistant < 0 || total < 0 {
        return Err(AmrError::Validation(format!(
            "counts must be non-negative (resistant={resistant}, total={total})"
        )));
    }
    if resistant > total {
        return Err(AmrError::Validation(format!(
            "resistant count {resistant} exceeds total {total}"
        )));
    }
    let z = z_score(options.confidence_level)?;
    if total == 0 {
        return Err(AmrError::Undefined(
            "resistance rate over zero isolates".into(),
        ));
    }

    let n = total as f64;
    let p = resistant as f64 / n;
    let (lower, upper) = match options.method {
        IntervalMethod::Wald => {
            let se = (p * (1.0 - p) / n).sqrt();
            (p - z * se, p + z * se)
        }
        IntervalMethod::Wilson => {
            let z2 = z * z;
            let denom = 1.0 + z2 / n;
            let center = (p + z2 / (2.0 * n)) / denom;
            let half = z / denom * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
            (center - half, center + half)
        }
    };
    // Rounding must never push a bound past the point estimate.
    let lower = lower.clamp(0.0, 1.0).min(p);
    let upper = upper.clamp(0.0, 1.0).max(p);

    Ok(RateEstimate {
        resistant: resistant as u64,
        total: total as u64,
        percent: p * 100.0,
        lower: lower * 100.0,
        upper: upper * 100.0,
        confidence_level: options.confidence_level,
        method: options.method,
    })
}

/// Pool estimates from several sites by summing their isolate counts.
///
/// This equals the isolate-weighted mean of the site percentages.
pub fn pool_estimates(
    estimates: &[RateEstimate],
    options: &RateOptions,
) -> Result<RateEstimate, AmrError> {
    let resistant: u64 = estimates.iter().map(|e| e.resistant).sum();
    let total: u64 = estimates.iter().map(|e| e.total).sum();
    let resistant = i64::try_from(resistant)
        .map_err(|_| AmrError::Validation("pooled resistant count overflows".into()))?;
    let total = i64::try_from(total)
        .map_err(|_| AmrError::Validation("pooled total count overflows".into()))?;
    estimate_rate(resistant, total, options)
}

/// A site-level rate as published by aggregate surveillance systems, where
/// only the percentage and the number of tested isolates are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRate {
    pub site: String,
    pub percent: f64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledRate {
    pub percent: f64,
    pub lower: f64,
    pub upper: f64,
    pub total: u64,
    pub sites: usize,
}

/// Isolate-weighted mean of site percentages with a Wald interval on the
/// variance of the weighted mean.
pub fn pool_site_rates(sites: &[SiteRate], options: &RateOptions) -> Result<PooledRate, AmrError> {
    let z = z_score(options.confidence_level)?;
    for s in sites {
        if !s.percent.is_finite() || !(0.0..=100.0).contains(&s.percent) {
            return Err(AmrError::Validation(format!(
                "site '{}' has percentage {} outside [0, 100]",
                s.site, s.percent
            )));
        }
    }

    let total: u64 = sites.iter().map(|s| s.total).sum();
    if total == 0 {
        return Err(AmrError::Undefined(
            "pooled rate over zero isolates".into(),
        ));
    }

    let n = total as f64;
    let p = sites
        .iter()
        .map(|s| s.total as f64 * s.percent / 100.0)
        .sum::<f64>()
        / n;
    let variance_sum: f64 = sites
        .iter()
        .map(|s| {
            let pi = s.percent / 100.0;
            s.total as f64 * pi * (1.0 - pi)
        })
        .sum();
    let se = variance_sum.sqrt() / n;

    Ok(PooledRate {
        percent: p * 100.0,
        lower: (p - z * se).clamp(0.0, 1.0).min(p) * 100.0,
        upper: (p + z * se).clamp(0.0, 1.0).max(p) * 100.0,
        total,
        sites: sites.len(),
    })
}

/// Two-sided critical value for a confidence level in (0, 1).
pub fn z_score(confidence_level: f64) -> Result<f64, AmrError> {
    if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
        return Err(AmrError::Validation(format!(
            "confidence level {confidence_level} must be strictly between 0 and 1"
        )));
    }
    Ok(inverse_normal_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}

/// Acklam's rational approximation of the standard normal quantile
/// (relative error below 1.2e-9). `p` must lie in (0, 1).
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
