//! Best-subset predictor selection by information criterion.

use crate::core::CancellationToken;
use crate::error::{DownscaleError, Result};
use crate::utils::ols::{fit_regression, DesignMatrix, RegressionFit, RegressionStrategy};

/// Largest number of candidate predictors searched exhaustively.
pub const MAX_STEPWISE_PREDICTORS: usize = 8;

/// Score used to rank predictor subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InformationCriterion {
    /// `n·ln(RMSE) + 2k`
    #[default]
    Aic,
    /// `n·ln(RMSE) + k·ln(n)`
    Bic,
}

impl InformationCriterion {
    /// Score a fit with `k` estimated coefficients.
    pub fn score(&self, fit: &RegressionFit, k: usize) -> f64 {
        let n = fit.n() as f64;
        let base = n * fit.rmse().ln();
        match self {
            InformationCriterion::Aic => base + 2.0 * k as f64,
            InformationCriterion::Bic => base + k as f64 * n.ln(),
        }
    }
}

/// Outcome of a best-subset search.
#[derive(Debug, Clone)]
pub struct StepwiseSelection {
    /// Selected candidate columns, ascending.
    pub selected: Vec<usize>,
    /// Criterion value of the selected subset.
    pub score: f64,
    /// Fit on the full design with unselected candidates zeroed.
    pub fit: RegressionFit,
}

/// Search every non-empty subset of the first `candidates` columns of `x`.
///
/// Columns after the candidates (such as an autoregressive lag) are part of
/// every fit. The returned coefficients cover the full design, with zeros
/// for unselected candidates, so their length never depends on the subset.
pub fn stepwise_select(
    x: &DesignMatrix,
    candidates: usize,
    y: &[f64],
    criterion: InformationCriterion,
    strategy: RegressionStrategy,
    cancel: &CancellationToken,
) -> Result<StepwiseSelection> {
    if candidates == 0 || candidates > MAX_STEPWISE_PREDICTORS || candidates > x.width() {
        return Err(DownscaleError::Validation(format!(
            "stepwise selection needs 1 to {MAX_STEPWISE_PREDICTORS} candidate predictors, got {candidates}"
        )));
    }
    let fixed: Vec<usize> = (candidates..x.width()).collect();

    let mut best: Option<(Vec<usize>, f64, RegressionFit)> = None;
    for mask in 1u32..(1u32 << candidates) {
        cancel.check()?;
        let subset: Vec<usize> = (0..candidates).filter(|j| mask & (1 << j) != 0).collect();
        let mut columns = subset.clone();
        columns.extend(&fixed);

        let fit = match fit_regression(&x.select_columns(&columns), y, strategy) {
            Ok(fit) => fit,
            Err(DownscaleError::Cancelled) => return Err(DownscaleError::Cancelled),
            Err(err) => {
                tracing::debug!(?subset, %err, "subset fit failed");
                continue;
            }
        };
        let score = criterion.score(&fit, subset.len() + 1);
        if !score.is_finite() {
            continue;
        }
        if best.as_ref().map_or(true, |(_, s, _)| score < *s) {
            best = Some((subset, score, fit));
        }
    }

    let (selected, score, mut fit) = best.ok_or_else(|| {
        DownscaleError::NoSolution("every predictor subset failed to fit".into())
    })?;

    let mut coefficients = vec![0.0; x.width() + 1];
    coefficients[0] = fit.coefficients[0];
    for (pos, &j) in selected.iter().chain(&fixed).enumerate() {
        coefficients[j + 1] = fit.coefficients[pos + 1];
    }
    fit.coefficients = coefficients;

    Ok(StepwiseSelection {
        selected,
        score,
        fit,
    })
}
