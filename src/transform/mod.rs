//! Data transformations applied to the conditional amount model.
//!
//! A [`TransformKind`] names the transform requested by the caller; fitting
//! it to a sample yields a [`TransformState`] that carries whatever is needed
//! to invert it later (nothing, a rank table, or Box-Cox parameters).
//!
//! # Example
//!
//! ```
//! use anofox_downscale::transform::{fit_transform, TransformKind};
//!
//! let amounts = vec![0.4, 2.0, 11.5, 0.8, 5.1];
//! let fitted = fit_transform(TransformKind::FourthRoot, &amounts).unwrap();
//! let back = fitted.state.inverse(fitted.values[2]);
//! assert!((back - 11.5).abs() < 1e-9);
//! ```

pub mod boxcox;
pub mod normal_score;

pub use boxcox::{boxcox, boxcox_fit, hinkley_d, inv_boxcox, BoxCoxParams, MIN_BOXCOX_SAMPLES};
pub use normal_score::RankTable;

use crate::error::{DownscaleError, Result};

/// Transform requested for the amount model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformKind {
    #[default]
    None,
    FourthRoot,
    NaturalLog,
    InverseNormal,
    BoxCox,
}

impl TransformKind {
    /// Numeric code used in parameter and manifest files.
    pub fn code(&self) -> u8 {
        match self {
            TransformKind::None => 1,
            TransformKind::FourthRoot => 2,
            TransformKind::NaturalLog => 3,
            TransformKind::InverseNormal => 4,
            TransformKind::BoxCox => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TransformKind::None),
            2 => Some(TransformKind::FourthRoot),
            3 => Some(TransformKind::NaturalLog),
            4 => Some(TransformKind::InverseNormal),
            5 => Some(TransformKind::BoxCox),
            _ => None,
        }
    }

    /// Whether `y` lies in the transform's domain.
    pub fn admits(&self, y: f64) -> bool {
        match self {
            TransformKind::FourthRoot => y >= 0.0,
            TransformKind::NaturalLog => y > 0.0,
            _ => y.is_finite(),
        }
    }

    /// Fit the transform's state to a sample of admissible values.
    pub fn fit(&self, y: &[f64]) -> Result<TransformState> {
        Ok(match self {
            TransformKind::None => TransformState::None,
            TransformKind::FourthRoot => TransformState::FourthRoot,
            TransformKind::NaturalLog => TransformState::NaturalLog,
            TransformKind::InverseNormal => TransformState::InverseNormal(RankTable::from_sample(y)?),
            TransformKind::BoxCox => TransformState::BoxCox(boxcox_fit(y)?),
        })
    }
}

/// Fitted transform, persisted alongside the model coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransformState {
    #[default]
    None,
    FourthRoot,
    NaturalLog,
    InverseNormal(RankTable),
    BoxCox(BoxCoxParams),
}

impl TransformState {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformState::None => TransformKind::None,
            TransformState::FourthRoot => TransformKind::FourthRoot,
            TransformState::NaturalLog => TransformKind::NaturalLog,
            TransformState::InverseNormal(_) => TransformKind::InverseNormal,
            TransformState::BoxCox(_) => TransformKind::BoxCox,
        }
    }

    /// Forward-transform one value.
    pub fn forward(&self, y: f64) -> f64 {
        match self {
            TransformState::None => y,
            TransformState::FourthRoot => {
                if y < 0.0 {
                    f64::NAN
                } else {
                    y.powf(0.25)
                }
            }
            TransformState::NaturalLog => {
                if y <= 0.0 {
                    f64::NAN
                } else {
                    y.ln()
                }
            }
            TransformState::InverseNormal(table) => table.forward(y),
            TransformState::BoxCox(params) => params.forward(y),
        }
    }

    /// Back-transform one value; NaN when the value has no preimage.
    pub fn inverse(&self, z: f64) -> f64 {
        match self {
            TransformState::None => z,
            TransformState::FourthRoot => z.powi(4),
            TransformState::NaturalLog => z.exp(),
            TransformState::InverseNormal(table) => table.inverse(z),
            TransformState::BoxCox(params) => params.inverse(z),
        }
    }

    /// Back-transform a slice.
    pub fn inverse_all(&self, z: &[f64]) -> Vec<f64> {
        z.iter().map(|&v| self.inverse(v)).collect()
    }
}

/// Output of [`fit_transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Fitted state.
    pub state: TransformState,
    /// Transformed values of the kept rows, in input order.
    pub values: Vec<f64>,
    /// Input indices that were inside the transform's domain.
    pub kept: Vec<usize>,
}

/// Drop values outside the domain, fit the transform and apply it.
///
/// The inverse-normal transform scores the kept values by rank; the other
/// transforms are applied element-wise.
pub fn fit_transform(kind: TransformKind, y: &[f64]) -> Result<Transformed> {
    let kept: Vec<usize> = (0..y.len()).filter(|&i| kind.admits(y[i])).collect();
    if kept.is_empty() {
        return Err(DownscaleError::insufficient(
            format!("{kind:?} transform"),
            1,
            0,
        ));
    }
    let sample: Vec<f64> = kept.iter().map(|&i| y[i]).collect();
    let state = kind.fit(&sample)?;
    let values = match &state {
        TransformState::InverseNormal(table) => table.scores(&sample),
        other => sample.iter().map(|&v| other.forward(v)).collect(),
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DownscaleError::Transform(format!(
            "{kind:?} transform produced non-finite values"
        )));
    }
    Ok(Transformed { state, values, kept })
}
