//! Box-Cox power transformation with Hinkley's symmetry criterion.
//!
//! Lambda is chosen to make the transformed sample as symmetric as
//! possible, measured by `d = (mean − median) / IQR` (Hinkley, 1977).

use crate::error::{DownscaleError, Result};
use crate::utils::stats::{mean, quantile_sorted};

/// Minimum number of usable values for the lambda search.
pub const MIN_BOXCOX_SAMPLES: usize = 50;

/// Lambda search bounds.
const LAMBDA_MIN: f64 = -2.0;
const LAMBDA_MAX: f64 = 2.0;

/// Smallest value of a shifted sample; keeps `ln` and negative powers finite.
const SHIFT_FLOOR: f64 = 1e-3;

/// Fitted Box-Cox parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoxParams {
    /// Transformation exponent.
    pub lambda: f64,
    /// Shift added before transforming so the minimum is positive.
    pub shift: f64,
}

impl BoxCoxParams {
    pub fn forward(&self, y: f64) -> f64 {
        boxcox_value(y + self.shift, self.lambda)
    }

    pub fn inverse(&self, z: f64) -> f64 {
        inv_boxcox_value(z, self.lambda) - self.shift
    }
}

fn is_log(lambda: f64) -> bool {
    lambda.abs() < 1e-6
}

/// Transform a single shifted value.
///
/// For lambda != 0: y = (x^lambda - 1) / lambda
/// For lambda == 0: y = ln(x)
pub fn boxcox_value(x: f64, lambda: f64) -> f64 {
    if x < 0.0 {
        f64::NAN
    } else if is_log(lambda) {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse of [`boxcox_value`]; NaN outside the transform's range.
pub fn inv_boxcox_value(z: f64, lambda: f64) -> f64 {
    if is_log(lambda) {
        z.exp()
    } else {
        let val = lambda * z + 1.0;
        if val < 0.0 {
            f64::NAN
        } else {
            val.powf(1.0 / lambda)
        }
    }
}

/// Apply Box-Cox transformation with a given lambda.
pub fn boxcox(series: &[f64], lambda: f64) -> Vec<f64> {
    series.iter().map(|&x| boxcox_value(x, lambda)).collect()
}

/// Inverse Box-Cox transformation.
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Vec<f64> {
    transformed
        .iter()
        .map(|&z| inv_boxcox_value(z, lambda))
        .collect()
}

/// Hinkley's symmetry statistic of a sample; NaN when undefined.
pub fn hinkley_d(values: &[f64]) -> f64 {
    if values.iter().any(|v| !v.is_finite()) || values.len() < 2 {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    if iqr <= 0.0 {
        return f64::NAN;
    }
    (mean(values) - quantile_sorted(&sorted, 0.5)) / iqr
}

/// Fit Box-Cox parameters to a sample.
///
/// A sample whose minimum is zero or negative is shifted so its minimum
/// becomes a small positive value, keeping every lambda in the range
/// searchable. Lambda is searched over [-2, 2] with step 0.25, refined with step 0.1
/// and finally 0.01 around the running best.
///
/// # Errors
/// `InsufficientData` with fewer than [`MIN_BOXCOX_SAMPLES`] finite values;
/// `NoSolution` when no candidate lambda gives a finite statistic.
pub fn boxcox_fit(series: &[f64]) -> Result<BoxCoxParams> {
    let finite: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < MIN_BOXCOX_SAMPLES {
        return Err(DownscaleError::insufficient(
            "Box-Cox lambda search",
            MIN_BOXCOX_SAMPLES,
            finite.len(),
        ));
    }

    let min_val = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = if min_val <= 0.0 { SHIFT_FLOOR - min_val } else { 0.0 };
    let shifted: Vec<f64> = finite.iter().map(|&x| x + shift).collect();

    let mut best: Option<(f64, f64)> = None;
    let mut centre = 0.0;
    let mut half_width = LAMBDA_MAX - LAMBDA_MIN;
    for step in [0.25, 0.1, 0.01] {
        let start = (centre - half_width).max(LAMBDA_MIN);
        let end = (centre + half_width).min(LAMBDA_MAX);
        let count = ((end - start) / step).round() as usize;
        for i in 0..=count {
            let lambda = (start + step * i as f64).min(end);
            let d = hinkley_d(&boxcox(&shifted, lambda)).abs();
            if !d.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((lambda, d));
            }
        }
        let (lambda, _) = best.ok_or_else(|| {
            DownscaleError::NoSolution("no lambda in [-2, 2] gives a finite symmetry statistic".into())
        })?;
        centre = lambda;
        half_width = step;
    }

    let lambda = best.map(|(l, _)| l).unwrap_or(1.0);
    Ok(BoxCoxParams { lambda, shift })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn skewed_sample(n: usize) -> Vec<f64> {
        // Exponential-like quantiles, strongly right-skewed.
        (1..=n)
            .map(|i| -(1.0 - i as f64 / (n + 1) as f64).ln() * 4.0)
            .collect()
    }

    // ==================== boxcox ====================

    #[test]
    fn boxcox_lambda_1() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = boxcox(&series, 1.0);
        for (i, &x) in series.iter().enumerate() {
            assert_relative_eq!(result[i], x - 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn boxcox_lambda_0() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = boxcox(&series, 0.0);
        for (i, &x) in series.iter().enumerate() {
            assert_relative_eq!(result[i], x.ln(), epsilon = 1e-10);
        }
    }

    #[test]
    fn boxcox_negative_values() {
        let result = boxcox(&[-1.0, 1.0], 1.0);
        assert!(result[0].is_nan());
        assert!(!result[1].is_nan());
    }

    #[test]
    fn inv_boxcox_roundtrip() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        for lambda in [-1.5, -0.5, 0.0, 0.5, 1.0, 2.0] {
            let recovered = inv_boxcox(&boxcox(&series, lambda), lambda);
            for (orig, rec) in series.iter().zip(recovered.iter()) {
                assert_relative_eq!(orig, rec, epsilon = 1e-9);
            }
        }
    }

    // ==================== hinkley_d ====================

    #[test]
    fn symmetric_sample_has_zero_d() {
        let values: Vec<f64> = (0..21).map(|i| i as f64).collect();
        assert_relative_eq!(hinkley_d(&values), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn right_skew_has_positive_d() {
        assert!(hinkley_d(&skewed_sample(100)) > 0.0);
        assert!(hinkley_d(&[1.0, 1.0, 1.0]).is_nan());
    }

    // ==================== boxcox_fit ====================

    #[test]
    fn fit_reduces_skew() {
        let sample = skewed_sample(200);
        let params = boxcox_fit(&sample).unwrap();
        assert!((-2.0..=2.0).contains(&params.lambda));
        assert!(params.lambda < 1.0, "lambda {}", params.lambda);
        let transformed: Vec<f64> = sample.iter().map(|&y| params.forward(y)).collect();
        assert!(hinkley_d(&transformed).abs() < hinkley_d(&sample).abs());
    }

    #[test]
    fn fit_is_idempotent() {
        let sample = skewed_sample(150);
        let a = boxcox_fit(&sample).unwrap();
        let b = boxcox_fit(&sample).unwrap();
        assert!((a.lambda - b.lambda).abs() <= 0.01);
        assert_eq!(a.shift, b.shift);
    }

    #[test]
    fn fit_shifts_negative_samples() {
        let sample: Vec<f64> = skewed_sample(120).iter().map(|v| v - 3.0).collect();
        let params = boxcox_fit(&sample).unwrap();
        assert!(params.shift > 0.0);
        for &y in &sample {
            let back = params.inverse(params.forward(y));
            if back.is_finite() {
                assert_relative_eq!(back, y, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn zero_minimum_keeps_negative_lambdas_finite() {
        let sample: Vec<f64> = skewed_sample(120).iter().map(|v| v * v).collect();
        let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let sample: Vec<f64> = sample.iter().map(|v| v - min).collect();
        let params = boxcox_fit(&sample).unwrap();
        assert_relative_eq!(params.shift, SHIFT_FLOOR, epsilon = 1e-12);
        let shifted: Vec<f64> = sample.iter().map(|v| v + params.shift).collect();
        for lambda in [-2.0, -1.0, -0.5, 0.0] {
            assert!(hinkley_d(&boxcox(&shifted, lambda)).is_finite(), "lambda {lambda}");
        }
    }

    #[test]
    fn fit_requires_fifty_values() {
        let err = boxcox_fit(&skewed_sample(49)).unwrap_err();
        assert!(matches!(
            err,
            DownscaleError::InsufficientData { needed: 50, got: 49, .. }
        ));
    }

    #[test]
    fn constant_sample_has_no_solution() {
        let err = boxcox_fit(&[3.0; 60]).unwrap_err();
        assert!(matches!(err, DownscaleError::NoSolution(_)));
    }
}
