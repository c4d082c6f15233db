//! Time-trend removal before regression.

use crate::error::{DownscaleError, Result};
use crate::utils::ols::{fit_regression, DesignMatrix, RegressionStrategy};

/// Shape of the trend removed from the predictand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetrendKind {
    /// `c0 + c1·t`
    Linear,
    /// `c0·t^c1 − c2`
    Power,
}

/// Fitted trend of one period, evaluated at 1-based day offsets `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetrendState {
    Linear { intercept: f64, slope: f64 },
    Power { scale: f64, exponent: f64, shift: f64 },
}

impl DetrendState {
    pub fn kind(&self) -> DetrendKind {
        match self {
            DetrendState::Linear { .. } => DetrendKind::Linear,
            DetrendState::Power { .. } => DetrendKind::Power,
        }
    }

    /// Trend value at day offset `t` (offsets below 1 are evaluated at 1
    /// for the power law).
    pub fn trend(&self, t: f64) -> f64 {
        match *self {
            DetrendState::Linear { intercept, slope } => intercept + slope * t,
            DetrendState::Power {
                scale,
                exponent,
                shift,
            } => scale * t.max(1.0).powf(exponent) - shift,
        }
    }

    /// Subtract the trend from `y`.
    pub fn remove(&self, t: &[f64], y: &[f64]) -> Vec<f64> {
        y.iter().zip(t).map(|(v, &ti)| v - self.trend(ti)).collect()
    }
}

/// Fit a trend of the given shape to `y` observed at offsets `t`.
pub fn fit_trend(kind: DetrendKind, t: &[f64], y: &[f64]) -> Result<DetrendState> {
    if t.len() != y.len() {
        return Err(DownscaleError::Validation(format!(
            "{} time offsets for {} values",
            t.len(),
            y.len()
        )));
    }
    match kind {
        DetrendKind::Linear => {
            let design = DesignMatrix::from_columns(vec![t.to_vec()])?;
            let fit = fit_regression(&design, y, RegressionStrategy::NormalEquations)?;
            Ok(DetrendState::Linear {
                intercept: fit.coefficients[0],
                slope: fit.coefficients[1],
            })
        }
        DetrendKind::Power => {
            let min_val = y.iter().copied().fold(f64::INFINITY, f64::min);
            let shift = if min_val < 1.0 { 1.0 - min_val } else { 0.0 };
            let log_t: Vec<f64> = t.iter().map(|v| v.max(1.0).ln()).collect();
            let log_y: Vec<f64> = y.iter().map(|v| (v + shift).ln()).collect();
            let design = DesignMatrix::from_columns(vec![log_t])?;
            let fit = fit_regression(&design, &log_y, RegressionStrategy::NormalEquations)?;
            Ok(DetrendState::Power {
                scale: fit.coefficients[0].exp(),
                exponent: fit.coefficients[1],
                shift,
            })
        }
    }
}
