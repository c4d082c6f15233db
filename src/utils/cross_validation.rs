//! Blocked cross-validation of period regressions.
//!
//! The sample is cut into `folds` contiguous blocks of `⌊n/folds⌋` rows
//! (trailing remainder dropped). Each block is predicted from a fit on the
//! other blocks, and the held-out predictions are stitched back together in
//! original order before scoring.

use crate::calibration::params::{proportion_correct, Diagnostic};
use crate::calibration::segment::MIN_PERIOD_SAMPLES;
use crate::core::CancellationToken;
use crate::error::{DownscaleError, Result};
use crate::transform::{fit_transform, TransformKind};
use crate::utils::ols::{fit_regression, DesignMatrix, RegressionStrategy};
use crate::utils::stats::{durbin_watson, mean, pearson, rms, spearman};

/// Which sub-model is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CVModel {
    /// Continuous response scored with Durbin-Watson and bias.
    Continuous,
    /// 0/1 response scored by proportion correct.
    Occurrence,
    /// Raw wet-day amounts, transformed per fold and compared by rank
    /// after back-transformation.
    Amount(TransformKind),
}

/// Configuration for blocked cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CVConfig {
    /// Number of contiguous blocks.
    pub folds: usize,
    /// Solver used for every fold.
    pub strategy: RegressionStrategy,
}

impl Default for CVConfig {
    fn default() -> Self {
        Self {
            folds: 2,
            strategy: RegressionStrategy::NormalEquations,
        }
    }
}

impl CVConfig {
    pub fn new(folds: usize) -> Self {
        Self {
            folds,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: RegressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Results from cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CVResults {
    /// Number of folds evaluated.
    pub n_folds: usize,
    /// Held-out observations, `⌊n/folds⌋·folds` long.
    pub observed: Vec<f64>,
    /// Held-out predictions on the original scale (NaN where the
    /// back-transformation failed).
    pub predicted: Vec<f64>,
    /// RMS of held-out residuals.
    pub standard_error: f64,
    /// Squared correlation of held-out observations and predictions.
    pub r_squared: f64,
    pub diagnostic: Diagnostic,
}

/// Perform blocked cross-validation.
///
/// # Errors
/// `Validation` for fewer than two folds, `InsufficientData` when a block
/// holds fewer than ten samples, and `InverseTransformFailure` when fewer
/// than ten amount predictions survive back-transformation.
pub fn cross_validate(
    config: &CVConfig,
    x: &DesignMatrix,
    y: &[f64],
    model: CVModel,
    cancel: &CancellationToken,
) -> Result<CVResults> {
    if config.folds < 2 {
        return Err(DownscaleError::Validation(format!(
            "cross-validation needs at least 2 folds, got {}",
            config.folds
        )));
    }
    if x.rows() != y.len() {
        return Err(DownscaleError::Validation(format!(
            "design has {} rows but response has {}",
            x.rows(),
            y.len()
        )));
    }
    let block = y.len() / config.folds;
    if block < MIN_PERIOD_SAMPLES {
        return Err(DownscaleError::insufficient(
            "cross-validation fold",
            MIN_PERIOD_SAMPLES,
            block,
        ));
    }
    let used = block * config.folds;

    let mut predicted = Vec::with_capacity(used);
    for fold in 0..config.folds {
        cancel.check()?;
        let held: Vec<usize> = (fold * block..(fold + 1) * block).collect();
        let train: Vec<usize> = (0..used)
            .filter(|i| *i < fold * block || *i >= (fold + 1) * block)
            .collect();
        let x_train = x.select_rows(&train);
        let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();
        let x_held = x.select_rows(&held);

        let fold_predictions = match model {
            CVModel::Continuous | CVModel::Occurrence => {
                let fit = fit_regression(&x_train, &y_train, config.strategy)?;
                x_held.predict(&fit.coefficients)
            }
            CVModel::Amount(kind) => {
                let transformed = fit_transform(kind, &y_train)?;
                let fit = fit_regression(
                    &x_train.select_rows(&transformed.kept),
                    &transformed.values,
                    config.strategy,
                )?;
                transformed
                    .state
                    .inverse_all(&x_held.predict(&fit.coefficients))
            }
        };
        predicted.extend(fold_predictions);
    }

    let observed = y[..used].to_vec();
    score(config.folds, observed, predicted, model)
}

fn score(n_folds: usize, observed: Vec<f64>, predicted: Vec<f64>, model: CVModel) -> Result<CVResults> {
    let pairs: Vec<(f64, f64)> = observed
        .iter()
        .zip(&predicted)
        .filter(|(_, p)| p.is_finite())
        .map(|(&o, &p)| (o, p))
        .collect();
    if pairs.len() < MIN_PERIOD_SAMPLES {
        return Err(DownscaleError::InverseTransformFailure {
            context: "cross-validation".into(),
            survived: pairs.len(),
            needed: MIN_PERIOD_SAMPLES,
        });
    }
    let obs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let pred: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let residuals: Vec<f64> = pairs.iter().map(|(o, p)| o - p).collect();

    let diagnostic = match model {
        CVModel::Continuous => Diagnostic::Continuous {
            durbin_watson: durbin_watson(&residuals),
            bias: mean(&residuals),
        },
        CVModel::Occurrence => Diagnostic::Occurrence {
            proportion_correct: proportion_correct(&obs, &pred),
        },
        CVModel::Amount(_) => Diagnostic::Ranked {
            spearman: spearman(&obs, &pred),
            bias: mean(&residuals),
        },
    };

    Ok(CVResults {
        n_folds,
        standard_error: rms(&residuals),
        r_squared: pearson(&obs, &pred).powi(2),
        diagnostic,
        observed,
        predicted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(i: usize) -> f64 {
        ((i * 7919) % 97) as f64 / 97.0 - 0.5
    }

    fn linear_data(n: usize) -> (DesignMatrix, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.21).sin() * 4.0).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 1.0 + 2.0 * v + noise(i)).collect();
        (DesignMatrix::from_columns(vec![x]).unwrap(), y)
    }

    #[test]
    fn held_out_length_drops_remainder() {
        let (x, y) = linear_data(103);
        let res = cross_validate(&CVConfig::new(5), &x, &y, CVModel::Continuous, &CancellationToken::new())
            .unwrap();
        assert_eq!(res.n_folds, 5);
        assert_eq!(res.predicted.len(), (103 / 5) * 5);
        assert_eq!(res.observed, y[..100].to_vec());
    }

    #[test]
    fn continuous_scores() {
        let (x, y) = linear_data(200);
        let res = cross_validate(&CVConfig::new(4), &x, &y, CVModel::Continuous, &CancellationToken::new())
            .unwrap();
        assert!((0.0..=1.0).contains(&res.r_squared));
        assert!(res.r_squared > 0.9);
        assert!(res.standard_error < 0.5);
        match res.diagnostic {
            Diagnostic::Continuous { durbin_watson, bias } => {
                assert!(durbin_watson > 0.0 && durbin_watson < 4.0);
                assert!(bias.abs() < 0.2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exact_relationship_has_zero_error() {
        let x: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let design = DesignMatrix::from_columns(vec![x.clone()]).unwrap();
        let res = cross_validate(&CVConfig::new(3), &design, &x, CVModel::Continuous, &CancellationToken::new())
            .unwrap();
        assert_relative_eq!(res.standard_error, 0.0, epsilon = 1e-6);
        assert_relative_eq!(res.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn occurrence_scores_proportion_correct() {
        let x: Vec<f64> = (0..80).map(|i| if i % 3 == 0 { 4.0 } else { 0.0 }).collect();
        let y: Vec<f64> = x.iter().map(|&v| if v > 0.0 { 1.0 } else { 0.0 }).collect();
        let design = DesignMatrix::from_columns(vec![x]).unwrap();
        let res = cross_validate(&CVConfig::new(4), &design, &y, CVModel::Occurrence, &CancellationToken::new())
            .unwrap();
        assert_eq!(
            res.diagnostic,
            Diagnostic::Occurrence {
                proportion_correct: 1.0
            }
        );
    }

    #[test]
    fn amount_model_back_transforms() {
        let n = 120;
        let x: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64 * 0.3).sin().abs() * 3.0).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| v * v * (1.0 + 0.05 * noise(i))).collect();
        let design = DesignMatrix::from_columns(vec![x]).unwrap();
        let res = cross_validate(
            &CVConfig::new(3),
            &design,
            &y,
            CVModel::Amount(TransformKind::FourthRoot),
            &CancellationToken::new(),
        )
        .unwrap();
        match res.diagnostic {
            Diagnostic::Ranked { spearman, .. } => assert!(spearman > 0.9),
            other => panic!("unexpected {other:?}"),
        }
        assert!(res.predicted.iter().all(|p| p.is_finite() && *p > 0.0));
    }

    #[test]
    fn small_folds_are_insufficient() {
        let (x, y) = linear_data(39);
        let err = cross_validate(&CVConfig::new(4), &x, &y, CVModel::Continuous, &CancellationToken::new());
        assert!(matches!(
            err,
            Err(DownscaleError::InsufficientData { needed: 10, got: 9, .. })
        ));
    }

    #[test]
    fn needs_two_folds() {
        let (x, y) = linear_data(40);
        let err = cross_validate(&CVConfig::new(1), &x, &y, CVModel::Continuous, &CancellationToken::new());
        assert!(matches!(err, Err(DownscaleError::Validation(_))));
    }
}
