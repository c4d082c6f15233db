//! Ordinary Least Squares (OLS) regression.
//!
//! Two interchangeable solvers produce the same [`RegressionFit`]: a
//! Cholesky solve of the normal equations and a pivoting (sweep) solver on
//! mean-centred cross-products. Both treat the intercept implicitly, so a
//! [`DesignMatrix`] only holds the predictor columns.

use crate::error::{DownscaleError, Result};
use crate::utils::stats::{mean, pearson};

/// Floor applied to the residual sum of squares.
pub const RSS_FLOOR: f64 = 1e-4;

/// Relative pivot tolerance below which a system is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solver used to fit regression coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegressionStrategy {
    /// `β = (XᵗX)⁻¹XᵗY` via Cholesky factorisation.
    #[default]
    NormalEquations,
    /// Greedy pivoting on the centred cross-product matrix.
    BoundedSimplex,
}

/// Predictor columns of a regression; the intercept column is implicit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesignMatrix {
    rows: usize,
    columns: Vec<Vec<f64>>,
}

impl DesignMatrix {
    /// Empty design (intercept only) with `rows` observations.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    /// Build from column vectors of equal length.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self> {
        let rows = columns.first().map_or(0, Vec::len);
        for column in &columns {
            if column.len() != rows {
                return Err(DownscaleError::Validation(format!(
                    "design column has {} rows, expected {}",
                    column.len(),
                    rows
                )));
            }
        }
        Ok(Self { rows, columns })
    }

    /// Append a predictor column.
    pub fn push_column(&mut self, column: Vec<f64>) -> Result<()> {
        if column.len() != self.rows {
            return Err(DownscaleError::Validation(format!(
                "design column has {} rows, expected {}",
                column.len(),
                self.rows
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of predictor columns (excluding the intercept).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, j: usize) -> &[f64] {
        &self.columns[j]
    }

    /// Keep only the listed columns, in the given order.
    pub fn select_columns(&self, keep: &[usize]) -> Self {
        Self {
            rows: self.rows,
            columns: keep.iter().map(|&j| self.columns[j].clone()).collect(),
        }
    }

    /// Keep only the listed rows, in the given order.
    pub fn select_rows(&self, keep: &[usize]) -> Self {
        Self {
            rows: keep.len(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        }
    }

    /// Evaluate `β0 + Σ βj·xj` for every row.
    pub fn predict(&self, coefficients: &[f64]) -> Vec<f64> {
        let intercept = coefficients.first().copied().unwrap_or(0.0);
        let mut predictions = vec![intercept; self.rows];
        for (j, column) in self.columns.iter().enumerate() {
            let beta = coefficients.get(j + 1).copied().unwrap_or(0.0);
            for (pred, x) in predictions.iter_mut().zip(column) {
                *pred += beta * x;
            }
        }
        predictions
    }
}

/// Result of a regression fit.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    /// Intercept followed by one coefficient per column.
    pub coefficients: Vec<f64>,
    /// Fitted values.
    pub predicted: Vec<f64>,
    /// Observed minus fitted.
    pub residuals: Vec<f64>,
    /// Residual sum of squares, floored at [`RSS_FLOOR`].
    pub rss: f64,
    /// Regression (model) sum of squares.
    pub ssm: f64,
    /// `(SSM/p)/(RSS/(n−p))`; NaN without predictors.
    pub f_ratio: f64,
    /// Squared correlation of observed and fitted.
    pub r_squared: f64,
    /// Standard error of estimate, `sqrt(RSS/(n−p−1))`.
    pub standard_error: f64,
}

impl RegressionFit {
    /// Number of observations.
    pub fn n(&self) -> usize {
        self.predicted.len()
    }

    /// Root mean squared residual.
    pub fn rmse(&self) -> f64 {
        (self.rss / self.n() as f64).sqrt()
    }
}

/// Fit `y = β0 + Xβ` with the chosen strategy.
///
/// # Errors
/// `InsufficientData` when there are fewer rows than coefficients, and
/// `SingularMatrix` when the cross-product matrix cannot be inverted.
///
/// # Example
/// ```
/// use anofox_downscale::utils::{fit_regression, DesignMatrix, RegressionStrategy};
///
/// let x = DesignMatrix::from_columns(vec![vec![1.0, 2.0, 3.0, 4.0]]).unwrap();
/// let fit = fit_regression(&x, &[3.0, 5.0, 7.0, 9.0], RegressionStrategy::NormalEquations).unwrap();
/// assert!((fit.coefficients[1] - 2.0).abs() < 1e-8);
/// ```
pub fn fit_regression(
    x: &DesignMatrix,
    y: &[f64],
    strategy: RegressionStrategy,
) -> Result<RegressionFit> {
    let n = y.len();
    let p = x.width();
    if x.rows() != n {
        return Err(DownscaleError::Validation(format!(
            "design has {} rows but response has {}",
            x.rows(),
            n
        )));
    }
    if n < p + 1 {
        return Err(DownscaleError::insufficient("regression", p + 1, n));
    }

    let coefficients = match strategy {
        RegressionStrategy::NormalEquations => normal_equations(x, y)?,
        RegressionStrategy::BoundedSimplex => sweep_centred(x, y)?,
    };

    Ok(summarise(x, y, coefficients))
}

fn summarise(x: &DesignMatrix, y: &[f64], coefficients: Vec<f64>) -> RegressionFit {
    let n = y.len();
    let p = x.width();
    let predicted = x.predict(&coefficients);
    let residuals: Vec<f64> = y.iter().zip(&predicted).map(|(o, f)| o - f).collect();

    let y_mean = mean(y);
    let rss = residuals.iter().map(|r| r * r).sum::<f64>().max(RSS_FLOOR);
    let ssm: f64 = predicted.iter().map(|f| (f - y_mean).powi(2)).sum();

    let f_ratio = if p > 0 && n > p {
        (ssm / p as f64) / (rss / (n - p) as f64)
    } else {
        f64::NAN
    };
    let standard_error = if n > p + 1 {
        (rss / (n - p - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    let r_squared = pearson(y, &predicted).powi(2);

    RegressionFit {
        coefficients,
        predicted,
        residuals,
        rss,
        ssm,
        f_ratio,
        r_squared,
        standard_error,
    }
}

/// Solve the normal equations with the intercept column made explicit.
fn normal_equations(x: &DesignMatrix, y: &[f64]) -> Result<Vec<f64>> {
    let k = x.width();
    let num_params = k + 1;
    let n = y.len();

    let mut xtx = vec![vec![0.0; num_params]; num_params];
    let mut xty = vec![0.0; num_params];

    for obs in 0..n {
        let y_obs = y[obs];
        xtx[0][0] += 1.0;
        for j in 0..k {
            let xj = x.columns[j][obs];
            xtx[0][j + 1] += xj;
            xtx[j + 1][0] += xj;
        }
        for i in 0..k {
            let xi = x.columns[i][obs];
            for j in 0..k {
                xtx[i + 1][j + 1] += xi * x.columns[j][obs];
            }
        }
        xty[0] += y_obs;
        for i in 0..k {
            xty[i + 1] += x.columns[i][obs] * y_obs;
        }
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| DownscaleError::SingularMatrix {
        context: "normal equations".into(),
    })
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Returns `None` when a pivot is not clearly positive relative to its
/// diagonal entry.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= PIVOT_TOLERANCE * a[i][i].abs() || sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// Pivoting solver on mean-centred columns.
///
/// Columns are swept one at a time, each step pivoting on the unswept
/// column that removes the most residual variance. A column whose
/// remaining variance falls below the pivot tolerance makes the system
/// singular.
fn sweep_centred(x: &DesignMatrix, y: &[f64]) -> Result<Vec<f64>> {
    let k = x.width();
    let y_mean = mean(y);
    if k == 0 {
        return Ok(vec![y_mean]);
    }

    let means: Vec<f64> = x.columns.iter().map(|c| mean(c)).collect();
    let centred: Vec<Vec<f64>> = x
        .columns
        .iter()
        .zip(&means)
        .map(|(c, m)| c.iter().map(|v| v - m).collect())
        .collect();
    let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

    // Augmented cross-product matrix; index k holds the response.
    let dim = k + 1;
    let mut a = vec![vec![0.0; dim]; dim];
    for i in 0..dim {
        for j in i..dim {
            let ci = if i < k { &centred[i] } else { &yc };
            let cj = if j < k { &centred[j] } else { &yc };
            let s: f64 = ci.iter().zip(cj).map(|(u, v)| u * v).sum();
            a[i][j] = s;
            a[j][i] = s;
        }
    }
    let original_diag: Vec<f64> = (0..k).map(|j| a[j][j]).collect();

    let mut swept = vec![false; k];
    for _ in 0..k {
        let mut best: Option<(usize, f64)> = None;
        for j in (0..k).filter(|&j| !swept[j]) {
            let d = a[j][j];
            if d <= PIVOT_TOLERANCE * original_diag[j] || d <= 0.0 {
                continue;
            }
            let reduction = a[j][k] * a[j][k] / d;
            if best.map_or(true, |(_, r)| reduction > r) {
                best = Some((j, reduction));
            }
        }
        let (pivot, _) = best.ok_or_else(|| DownscaleError::SingularMatrix {
            context: "pivoting solver".into(),
        })?;
        sweep(&mut a, pivot);
        swept[pivot] = true;
    }

    let slopes: Vec<f64> = (0..k).map(|j| a[j][k]).collect();
    let intercept = y_mean - slopes.iter().zip(&means).map(|(b, m)| b * m).sum::<f64>();
    let mut coefficients = Vec::with_capacity(dim);
    coefficients.push(intercept);
    coefficients.extend(slopes);
    Ok(coefficients)
}

fn sweep(a: &mut [Vec<f64>], k: usize) {
    let n = a.len();
    let d = a[k][k];
    for j in 0..n {
        a[k][j] /= d;
    }
    for i in 0..n {
        if i == k {
            continue;
        }
        let b = a[i][k];
        for j in 0..n {
            a[i][j] -= b * a[k][j];
        }
        a[i][k] = -b / d;
    }
    a[k][k] = 1.0 / d;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_column_design() -> (DesignMatrix, Vec<f64>) {
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = vec![0.5, 2.5, 1.0, 3.0, 1.5, 3.5, 2.0, 4.0];
        let y: Vec<f64> = x1
            .iter()
            .zip(x2.iter())
            .map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b)
            .collect();
        (DesignMatrix::from_columns(vec![x1, x2]).unwrap(), y)
    }

    // ==================== normal equations ====================

    #[test]
    fn recovers_exact_coefficients() {
        let (x, y) = two_column_design();
        let fit = fit_regression(&x, &y, RegressionStrategy::NormalEquations).unwrap();
        assert_relative_eq!(fit.coefficients[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(fit.coefficients[2], 3.0, epsilon = 1e-6);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert_eq!(fit.rss, RSS_FLOOR);
    }

    #[test]
    fn identity_relationship() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let design = DesignMatrix::from_columns(vec![x.clone()]).unwrap();
        let fit = fit_regression(&design, &x, RegressionStrategy::NormalEquations).unwrap();
        assert_relative_eq!(fit.coefficients[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.coefficients[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert!(fit.standard_error < 0.01);
    }

    #[test]
    fn f_ratio_matches_definition() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.5 + 1.7 * v + (i as f64 * 1.3).sin())
            .collect();
        let design = DesignMatrix::from_columns(vec![x]).unwrap();
        let fit = fit_regression(&design, &y, RegressionStrategy::NormalEquations).unwrap();
        let expected = (fit.ssm / 1.0) / (fit.rss / 29.0);
        assert_relative_eq!(fit.f_ratio, expected, epsilon = 1e-9);
        let residual_sum: f64 = fit.residuals.iter().sum();
        assert!(residual_sum.abs() < 1e-8);
    }

    #[test]
    fn collinear_columns_are_singular() {
        let x1: Vec<f64> = (0..12).map(f64::from).collect();
        let x2: Vec<f64> = x1.iter().map(|v| 2.0 * v).collect();
        let y: Vec<f64> = x1.iter().map(|v| v + 1.0).collect();
        let design = DesignMatrix::from_columns(vec![x1, x2]).unwrap();
        for strategy in [RegressionStrategy::NormalEquations, RegressionStrategy::BoundedSimplex] {
            let err = fit_regression(&design, &y, strategy).unwrap_err();
            assert!(matches!(err, DownscaleError::SingularMatrix { .. }), "{strategy:?}");
        }
    }

    #[test]
    fn intercept_only_returns_mean() {
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let fit = fit_regression(&DesignMatrix::new(5), &y, RegressionStrategy::NormalEquations)
            .unwrap();
        assert_relative_eq!(fit.coefficients[0], 6.0, epsilon = 1e-10);
        assert!(fit.f_ratio.is_nan());
    }

    #[test]
    fn too_few_rows() {
        let design = DesignMatrix::from_columns(vec![vec![1.0], vec![2.0]]).unwrap();
        let err = fit_regression(&design, &[1.0], RegressionStrategy::NormalEquations);
        assert!(matches!(err, Err(DownscaleError::InsufficientData { .. })));
    }

    // ==================== bounded simplex ====================

    #[test]
    fn strategies_agree_on_noisy_data() {
        let n = 60;
        let x1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let x2: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).cos() * 3.0 + 50.0).collect();
        let x3: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| 4.0 - 0.5 * x1[i] + 1.25 * x2[i] + 7.0 * x3[i] + (i as f64 * 2.9).sin())
            .collect();
        let design = DesignMatrix::from_columns(vec![x1, x2, x3]).unwrap();

        let a = fit_regression(&design, &y, RegressionStrategy::NormalEquations).unwrap();
        let b = fit_regression(&design, &y, RegressionStrategy::BoundedSimplex).unwrap();
        for (ca, cb) in a.coefficients.iter().zip(&b.coefficients) {
            assert_relative_eq!(ca, cb, epsilon = 1e-6);
        }
        assert_relative_eq!(a.rss, b.rss, epsilon = 1e-6);
    }

    #[test]
    fn design_row_and_column_selection() {
        let (x, _) = two_column_design();
        let sub = x.select_columns(&[1]);
        assert_eq!(sub.width(), 1);
        assert_eq!(sub.column(0)[1], 2.5);
        let rows = x.select_rows(&[0, 7]);
        assert_eq!(rows.rows(), 2);
        assert_eq!(rows.column(0), &[1.0, 8.0]);
        assert_eq!(x.predict(&[1.0, 0.0, 2.0])[0], 2.0);
    }
}
