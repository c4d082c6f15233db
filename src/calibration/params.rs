//! Fitted per-period model parameters.

use crate::utils::ols::RegressionFit;
use crate::utils::stats::{durbin_watson, mean};

/// Goodness-of-fit diagnostic that depends on the sub-model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diagnostic {
    /// Continuous response: residual autocorrelation and mean error.
    Continuous { durbin_watson: f64, bias: f64 },
    /// Wet/dry occurrence: share of days classified correctly.
    Occurrence { proportion_correct: f64 },
    /// Back-transformed amounts compared by rank.
    Ranked { spearman: f64, bias: f64 },
}

/// Chow structural-stability test between the two halves of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChowStatistic {
    pub statistic: f64,
    pub p_value: f64,
}

/// Coefficients and statistics of one period's regression.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    /// Intercept, one coefficient per predictor, then the lag coefficient
    /// when autoregression is enabled.
    pub coefficients: Vec<f64>,
    pub standard_error: f64,
    pub r_squared: f64,
    pub f_ratio: f64,
    pub diagnostic: Diagnostic,
    pub chow: Option<ChowStatistic>,
}

impl ModelParameters {
    /// Parameters of a continuous (unconditional or amount) fit.
    pub fn continuous(fit: &RegressionFit) -> Self {
        Self {
            coefficients: fit.coefficients.clone(),
            standard_error: fit.standard_error,
            r_squared: fit.r_squared,
            f_ratio: fit.f_ratio,
            diagnostic: Diagnostic::Continuous {
                durbin_watson: durbin_watson(&fit.residuals),
                bias: mean(&fit.residuals),
            },
            chow: None,
        }
    }

    /// Parameters of an occurrence fit against a 0/1 response.
    pub fn occurrence(fit: &RegressionFit, observed: &[f64]) -> Self {
        Self {
            coefficients: fit.coefficients.clone(),
            standard_error: fit.standard_error,
            r_squared: fit.r_squared,
            f_ratio: fit.f_ratio,
            diagnostic: Diagnostic::Occurrence {
                proportion_correct: proportion_correct(observed, &fit.predicted),
            },
            chow: None,
        }
    }

    pub fn with_chow(mut self, chow: Option<ChowStatistic>) -> Self {
        self.chow = chow;
        self
    }

    /// Whether every coefficient is a usable number.
    pub fn is_usable(&self) -> bool {
        !self.coefficients.is_empty() && self.coefficients.iter().all(|c| c.is_finite())
    }

    /// `β0 + Σ βk·xk`, plus `βAR·lag` when a lag coefficient is present.
    pub fn response(&self, predictors: &[f64], lag: Option<f64>) -> f64 {
        let mut value = self.coefficients[0];
        for (beta, x) in self.coefficients[1..].iter().zip(predictors) {
            value += beta * x;
        }
        if let (Some(lag), Some(beta)) = (lag, self.lag_coefficient(predictors.len())) {
            value += beta * lag;
        }
        value
    }

    /// Coefficient of the lagged predictand, if the model has one.
    pub fn lag_coefficient(&self, predictor_count: usize) -> Option<f64> {
        self.coefficients.get(predictor_count + 1).copied()
    }
}

/// Share of days where `predicted >= 0.5` agrees with the observed event.
pub fn proportion_correct(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let hits = observed
        .iter()
        .zip(predicted)
        .filter(|(&o, &p)| (o >= 0.5) == (p >= 0.5))
        .count();
    hits as f64 / n as f64
}
