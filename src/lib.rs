//! # anofox-downscale
//!
//! Regression-based statistical downscaling of daily weather series.
//!
//! Calibration fits per-period (annual, seasonal or monthly) regressions of a
//! local predictand on large-scale predictors, optionally as a two-stage
//! occurrence/amount model with transformed amounts, detrending and an
//! autoregressive term. The fitted parameters are persisted to a parameter
//! file, from which a stochastic weather generator synthesizes ensembles of
//! daily series.
//!
//! # Example
//!
//! ```
//! use anofox_downscale::prelude::*;
//!
//! let start = SimDate::new(1961, 1, 1, Calendar::Gregorian).unwrap();
//! let x: Vec<f64> = (0..400).map(|i| (i as f64 * 0.3).sin()).collect();
//! let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();
//! let series = AlignedSeries::new(start, y, vec![x.clone()]).unwrap();
//!
//! let config = CalibrationConfig::new().with_granularity(Granularity::Annual);
//! let report = Calibrator::new(Settings::default())
//!     .calibrate_series(&config, &series)
//!     .unwrap();
//! assert!((report.periods[0].unconditional.coefficients[1] - 3.0).abs() < 1e-6);
//!
//! let params = report.to_parameter_file("y.dat", vec!["x.dat".into()], 2);
//! let generator = WeatherGenerator::new(Settings::default().with_seed(7), params).unwrap();
//! let mut source = InMemoryPredictors::new(vec![x]).unwrap();
//! let ensemble = generator.simulate_to_vec(start, 10, 2, &mut source).unwrap();
//! assert_eq!(ensemble.len(), 10);
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod calibration;
pub mod core;
pub mod error;
pub mod io;
pub mod synthesis;
pub mod transform;
pub mod utils;

pub use error::{DownscaleError, Result};

pub mod prelude {
    pub use crate::calibration::{
        CalibrationConfig, CalibrationReport, Calibrator, DetrendKind, InformationCriterion,
        ModelParameters,
    };
    pub use crate::core::{
        AlignedSeries, Calendar, CancellationToken, Granularity, OccurrenceMode, Period, SeedMode,
        Settings, SimDate,
    };
    pub use crate::error::{DownscaleError, Result};
    pub use crate::io::{ParameterFile, SynthesisManifest};
    pub use crate::synthesis::{
        InMemoryPredictors, PredictorSource, SynthesisConfig, WeatherGenerator,
    };
    pub use crate::transform::TransformKind;
    pub use crate::utils::RegressionStrategy;
}
