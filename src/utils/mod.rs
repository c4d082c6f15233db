//! Numerical utilities shared by calibration and synthesis.

pub mod cross_validation;
pub mod ols;
pub mod stats;

pub use cross_validation::{cross_validate, CVConfig, CVModel, CVResults};
pub use ols::{fit_regression, DesignMatrix, RegressionFit, RegressionStrategy, RSS_FLOOR};
pub use stats::{durbin_watson, mean, pearson, quantile_normal, spearman, std_dev};
