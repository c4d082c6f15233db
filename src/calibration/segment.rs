//! Period segmentation of aligned daily series.
//!
//! Every day inside the calibration window is assigned to exactly one
//! period. Days with a missing predictand, predictor or (with
//! autoregression) previous-day predictand are counted and skipped.

use crate::core::{AlignedSeries, Granularity, Period, Settings, SimDate};
use crate::error::{DownscaleError, Result};

/// Minimum number of valid samples for a period regression.
pub const MIN_PERIOD_SAMPLES: usize = 10;

/// What to segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    pub calibration_start: SimDate,
    /// Days in the calibration window.
    pub calibration_length: usize,
    pub granularity: Granularity,
    /// Two-stage occurrence/amount model.
    pub conditional: bool,
    /// Attach the previous day's predictand to every sample.
    pub autoregression: bool,
}

/// Sample accounting for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodCounts {
    /// Days of the calibration window falling in the period.
    pub total: usize,
    /// Days skipped because a value was missing.
    pub missing: usize,
    /// Valid days at or below the event threshold (conditional only).
    pub below_threshold: usize,
    /// Days kept for regression.
    pub valid: usize,
}

impl PeriodCounts {
    /// Valid days above the threshold.
    pub fn wet(&self) -> usize {
        self.valid - self.below_threshold
    }
}

/// Valid samples of one period in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSample {
    pub period: Period,
    pub counts: PeriodCounts,
    /// Raw predictand.
    pub predictand: Vec<f64>,
    /// `predictors[variable][sample]`.
    pub predictors: Vec<Vec<f64>>,
    /// Previous day's raw predictand, when autoregression is enabled.
    pub lag: Option<Vec<f64>>,
    /// 1-based day offset from the calibration start.
    pub day_offset: Vec<f64>,
}

impl PeriodSample {
    fn empty(period: Period, predictor_count: usize, autoregression: bool) -> Self {
        Self {
            period,
            counts: PeriodCounts::default(),
            predictand: Vec::new(),
            predictors: vec![Vec::new(); predictor_count],
            lag: autoregression.then(Vec::new),
            day_offset: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.predictand.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictand.is_empty()
    }

    /// Keep only the listed sample indices.
    pub fn select(&self, keep: &[usize]) -> Self {
        let pick = |v: &Vec<f64>| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
        Self {
            period: self.period,
            counts: self.counts,
            predictand: pick(&self.predictand),
            predictors: self.predictors.iter().map(pick).collect(),
            lag: self.lag.as_ref().map(pick),
            day_offset: pick(&self.day_offset),
        }
    }
}

/// Split the calibration window into per-period samples.
///
/// # Errors
/// `Validation` when the window does not lie inside the series, and
/// `InsufficientData` naming the first period left with fewer than
/// [`MIN_PERIOD_SAMPLES`] valid samples (or wet samples in conditional
/// mode).
pub fn segment(
    series: &AlignedSeries,
    settings: &Settings,
    options: &SegmentOptions,
) -> Result<Vec<PeriodSample>> {
    let calendar = settings.calendar;
    let first = series
        .index_of(options.calibration_start, calendar)
        .ok_or_else(|| {
            DownscaleError::Validation(format!(
                "calibration start {} is outside the record starting {}",
                options.calibration_start,
                series.start()
            ))
        })?;
    if options.calibration_length == 0 || first + options.calibration_length > series.len() {
        return Err(DownscaleError::Validation(format!(
            "calibration window of {} days from {} exceeds the record of {} days",
            options.calibration_length,
            options.calibration_start,
            series.len()
        )));
    }

    let k = series.predictor_count();
    let mut samples: Vec<PeriodSample> = options
        .granularity
        .periods()
        .into_iter()
        .map(|p| PeriodSample::empty(p, k, options.autoregression))
        .collect();

    let y = series.predictand();
    let mut date = options.calibration_start;
    for offset in 0..options.calibration_length {
        let day = first + offset;
        let sample = &mut samples[options.granularity.period_of(date).index()];
        sample.counts.total += 1;

        let lag = if options.autoregression {
            match day.checked_sub(1).map(|d| y[d]) {
                Some(v) if !settings.is_missing(v) => Some(v),
                _ => None,
            }
        } else {
            None
        };
        let any_missing = settings.is_missing(y[day])
            || (0..k).any(|j| settings.is_missing(series.predictor(j)[day]))
            || (options.autoregression && lag.is_none());

        if any_missing {
            sample.counts.missing += 1;
        } else {
            sample.counts.valid += 1;
            if options.conditional && y[day] <= settings.threshold {
                sample.counts.below_threshold += 1;
            }
            sample.predictand.push(y[day]);
            for j in 0..k {
                sample.predictors[j].push(series.predictor(j)[day]);
            }
            if let (Some(lags), Some(v)) = (sample.lag.as_mut(), lag) {
                lags.push(v);
            }
            sample.day_offset.push((offset + 1) as f64);
        }
        date = date.succ(calendar);
    }

    for sample in &samples {
        let usable = if options.conditional {
            sample.counts.valid.min(sample.counts.wet())
        } else {
            sample.counts.valid
        };
        if usable < MIN_PERIOD_SAMPLES {
            return Err(DownscaleError::insufficient(
                format!("period {}", sample.period),
                MIN_PERIOD_SAMPLES,
                usable,
            ));
        }
    }

    Ok(samples)
}
