//! Chow test for parameter stability across the calibration sample.

use crate::calibration::params::ChowStatistic;
use crate::error::Result;
use crate::utils::ols::{fit_regression, DesignMatrix, RegressionStrategy};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Compare a fit on the whole sample with separate fits on its two halves.
///
/// `F = ((RSS − RSS₁ − RSS₂)/k) / ((RSS₁ + RSS₂)/(n − 2k))` with `k` the
/// number of coefficients. Returns `None` when either half is too short to
/// leave residual degrees of freedom.
pub fn chow_test(
    x: &DesignMatrix,
    y: &[f64],
    strategy: RegressionStrategy,
) -> Result<Option<ChowStatistic>> {
    let n = y.len();
    let k = x.width() + 1;
    let half = n / 2;
    if half <= k || n <= 2 * k {
        return Ok(None);
    }

    let first: Vec<usize> = (0..half).collect();
    let second: Vec<usize> = (half..n).collect();

    let pooled = fit_regression(x, y, strategy)?;
    let fit_a = fit_regression(&x.select_rows(&first), &y[..half], strategy)?;
    let fit_b = fit_regression(&x.select_rows(&second), &y[half..], strategy)?;

    let split_rss = fit_a.rss + fit_b.rss;
    let df1 = k as f64;
    let df2 = (n - 2 * k) as f64;
    let statistic = ((pooled.rss - split_rss).max(0.0) / df1) / (split_rss / df2);

    let p_value = FisherSnedecor::new(df1, df2)
        .map(|dist| 1.0 - dist.cdf(statistic))
        .unwrap_or(f64::NAN);

    Ok(Some(ChowStatistic { statistic, p_value }))
}
