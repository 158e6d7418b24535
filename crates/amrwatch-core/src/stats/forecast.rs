//! Quadratic trend extrapolation for yearly resistance rates.

use crate::error::AmrError;
use crate::stats::rate::z_score;
use serde::{Deserialize, Serialize};

/// `y = a + b·u + c·u²` with `u = x - x_mean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraticFit {
    pub x_mean: f64,
    pub coefficients: [f64; 3],
    /// Mean squared residual of the fit.
    pub mse: f64,
    /// Sum of squared deviations of x from its mean.
    pub sxx: f64,
    pub n: usize,
}

impl QuadraticFit {
    pub fn eval(&self, x: f64) -> f64 {
        let u = x - self.x_mean;
        let [a, b, c] = self.coefficients;
        a + b * u + c * u * u
    }

    /// Standard error of a new observation at `x`.
    pub fn prediction_se(&self, x: f64) -> f64 {
        let n = self.n as f64;
        let d = x - self.x_mean;
        (self.mse * (1.0 + 1.0 / n + d * d / self.sxx)).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub x: f64,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub fit: QuadraticFit,
    pub confidence_level: f64,
    pub points: Vec<ForecastPoint>,
}

pub fn fit_quadratic(points: &[(f64, f64)]) -> Result<QuadraticFit, AmrError> {
    if let Some((x, y)) = points.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(AmrError::Validation(format!(
            "non-finite point ({x}, {y}) in forecast input"
        )));
    }

    let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    if xs.len() < 3 {
        return Err(AmrError::InsufficientData {
            needed: 3,
            got: xs.len(),
        });
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n;

    // Normal equations over powers of the centered x.
    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    for &(x, y) in points {
        let u = x - x_mean;
        let mut pow = 1.0;
        for k in 0..5 {
            s[k] += pow;
            if k < 3 {
                t[k] += pow * y;
            }
            pow *= u;
        }
    }
    let matrix = [
        [s[0], s[1], s[2]],
        [s[1], s[2], s[3]],
        [s[2], s[3], s[4]],
    ];
    let coefficients = solve3(matrix, t)?;

    let mut fit = QuadraticFit {
        x_mean,
        coefficients,
        mse: 0.0,
        sxx: s[2],
        n: points.len(),
    };
    fit.mse = points
        .iter()
        .map(|&(x, y)| (y - fit.eval(x)).powi(2))
        .sum::<f64>()
        / n;
    Ok(fit)
}

/// Fit `points` (x, rate %) and extrapolate `horizon` unit steps past the
/// largest x. Predictions and bounds are clipped to [0, 100].
pub fn forecast(
    points: &[(f64, f64)],
    horizon: usize,
    confidence_level: f64,
) -> Result<Forecast, AmrError> {
    let z = z_score(confidence_level)?;
    let fit = fit_quadratic(points)?;
    let last = points
        .iter()
        .map(|p| p.0)
        .fold(f64::NEG_INFINITY, f64::max);

    let points = (1..=horizon)
        .map(|step| {
            let x = last + step as f64;
            let raw = fit.eval(x);
            let se = fit.prediction_se(x);
            ForecastPoint {
                x,
                predicted: raw.clamp(0.0, 100.0),
                lower: (raw - z * se).clamp(0.0, 100.0),
                upper: (raw + z * se).clamp(0.0, 100.0),
            }
        })
        .collect();

    Ok(Forecast {
        fit,
        confidence_level,
        points,
    })
}

/// Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Result<[f64; 3], AmrError> {
    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(AmrError::Undefined(
                "quadratic fit is singular for these points".into(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_quadratic() {
        let points: Vec<(f64, f64)> = (0..6)
            .map(|x| {
                let x = x as f64;
                (x, 10.0 + 2.0 * x + 0.5 * x * x)
            })
            .collect();
        let f = forecast(&points, 2, 0.95).unwrap();
        assert!(f.fit.mse < 1e-12);
        assert_eq!(f.points.len(), 2);
        assert_eq!(f.points[0].x, 6.0);
        assert!((f.points[0].predicted - 40.0).abs() < 1e-9);
        assert!((f.points[0].upper - f.points[0].lower).abs() < 1e-6);
    }

    #[test]
    fn test_years_as_x() {
        let points = vec![
            (2018.0, 12.0),
            (2019.0, 14.0),
            (2020.0, 15.5),
            (2021.0, 18.0),
            (2022.0, 19.0),
        ];
        let f = forecast(&points, 3, 0.95).unwrap();
        assert_eq!(f.points[2].x, 2025.0);
        for p in &f.points {
            assert!(p.lower <= p.predicted && p.predicted <= p.upper);
        }
        // Uncertainty grows with distance from the data.
        let w0 = f.points[0].upper - f.points[0].lower;
        let w2 = f.points[2].upper - f.points[2].lower;
        assert!(w2 > w0);
    }

    #[test]
    fn test_clipped_to_percent_range() {
        let points = vec![(0.0, 40.0), (1.0, 20.0), (2.0, 5.0), (3.0, 1.0)];
        let f = forecast(&points, 5, 0.95).unwrap();
        for p in &f.points {
            assert!((0.0..=100.0).contains(&p.lower));
            assert!((0.0..=100.0).contains(&p.predicted));
            assert!((0.0..=100.0).contains(&p.upper));
        }
    }

    #[test]
    fn test_needs_three_distinct_x() {
        let points = vec![(1.0, 10.0), (1.0, 12.0), (2.0, 11.0)];
        assert!(matches!(
            fit_quadratic(&points),
            Err(AmrError::InsufficientData { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_rejects_nan() {
        let points = vec![(1.0, 10.0), (2.0, f64::NAN), (3.0, 11.0)];
        assert!(fit_quadratic(&points).is_err());
    }
}
