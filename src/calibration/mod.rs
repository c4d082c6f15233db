//! Calibration: segmentation, transforms, regression fitting and
//! diagnostics for each period of the calibration window.

pub mod calibrator;
pub mod chow;
pub mod detrend;
pub mod params;
pub mod screening;
pub mod segment;
pub mod stepwise;

pub use calibrator::{CalibrationConfig, CalibrationReport, Calibrator, PeriodReport, MAX_PREDICTORS};
pub use chow::chow_test;
pub use detrend::{fit_trend, DetrendKind, DetrendState};
pub use params::{proportion_correct, ChowStatistic, Diagnostic, ModelParameters};
pub use screening::{correlation_p_value, screen_predictors, PeriodScreening, PredictorScore};
pub use segment::{segment, PeriodCounts, PeriodSample, SegmentOptions, MIN_PERIOD_SAMPLES};
pub use stepwise::{stepwise_select, InformationCriterion, StepwiseSelection, MAX_STEPWISE_PREDICTORS};
