//! Calibration orchestrator.
//!
//! Validates the requested options, segments the calibration window into
//! periods and fits each period's models. In conditional mode every period
//! gets an occurrence model on the 0/1 event series and an amount model on
//! the (optionally transformed and detrended) wet-day values.

use crate::calibration::chow::chow_test;
use crate::calibration::detrend::{fit_trend, DetrendKind, DetrendState};
use crate::calibration::params::{ChowStatistic, ModelParameters};
use crate::calibration::screening::{screen_predictors, PeriodScreening};
use crate::calibration::segment::{segment, PeriodCounts, PeriodSample, SegmentOptions, MIN_PERIOD_SAMPLES};
use crate::calibration::stepwise::{stepwise_select, InformationCriterion, MAX_STEPWISE_PREDICTORS};
use crate::core::{AlignedSeries, Calendar, CancellationToken, Granularity, Period, Settings, SimDate};
use crate::error::{DownscaleError, Result};
use crate::io::ParameterFile;
use crate::transform::{fit_transform, TransformKind, TransformState};
use crate::utils::cross_validation::{cross_validate, CVConfig, CVModel, CVResults};
use crate::utils::ols::{fit_regression, DesignMatrix, RegressionFit, RegressionStrategy};
use std::path::{Path, PathBuf};

/// Largest number of predictors a calibration accepts.
pub const MAX_PREDICTORS: usize = 12;

/// What to calibrate and how.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Predictand file (file-based runs only).
    pub predictand: PathBuf,
    /// Predictor files (file-based runs only).
    pub predictors: Vec<PathBuf>,
    /// Date of the first line of every input file.
    pub record_start: Option<SimDate>,
    /// First calibration day; defaults to the record start.
    pub calibration_start: Option<SimDate>,
    /// Calibration days; defaults to the rest of the record.
    pub calibration_length: Option<usize>,
    pub granularity: Granularity,
    /// Two-stage occurrence/amount model.
    pub conditional: bool,
    /// Transform of the conditional amount model.
    pub transform: TransformKind,
    /// Add the previous day's predictand as a regressor.
    pub autoregression: bool,
    pub detrend: Option<DetrendKind>,
    pub strategy: RegressionStrategy,
    /// Best-subset predictor selection.
    pub stepwise: Option<InformationCriterion>,
    /// Blocked cross-validation with this many folds.
    pub cross_validation_folds: Option<usize>,
    /// Compute the Chow stability statistic for every model.
    pub chow_test: bool,
    /// Ensemble size suggested to synthesis.
    pub ensemble_size: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            predictand: PathBuf::new(),
            predictors: Vec::new(),
            record_start: None,
            calibration_start: None,
            calibration_length: None,
            granularity: Granularity::Monthly,
            conditional: false,
            transform: TransformKind::None,
            autoregression: false,
            detrend: None,
            strategy: RegressionStrategy::NormalEquations,
            stepwise: None,
            cross_validation_folds: None,
            chow_test: false,
            ensemble_size: 20,
        }
    }
}

impl CalibrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input files and the date of their first line.
    pub fn with_files(
        mut self,
        predictand: impl Into<PathBuf>,
        predictors: Vec<PathBuf>,
        record_start: SimDate,
    ) -> Self {
        self.predictand = predictand.into();
        self.predictors = predictors;
        self.record_start = Some(record_start);
        self
    }

    pub fn with_window(mut self, start: SimDate, length: usize) -> Self {
        self.calibration_start = Some(start);
        self.calibration_length = Some(length);
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_conditional(mut self, conditional: bool) -> Self {
        self.conditional = conditional;
        self
    }

    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_autoregression(mut self, autoregression: bool) -> Self {
        self.autoregression = autoregression;
        self
    }

    pub fn with_detrend(mut self, detrend: DetrendKind) -> Self {
        self.detrend = Some(detrend);
        self
    }

    pub fn with_strategy(mut self, strategy: RegressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_stepwise(mut self, criterion: InformationCriterion) -> Self {
        self.stepwise = Some(criterion);
        self
    }

    pub fn with_cross_validation(mut self, folds: usize) -> Self {
        self.cross_validation_folds = Some(folds);
        self
    }

    pub fn with_chow_test(mut self, chow_test: bool) -> Self {
        self.chow_test = chow_test;
        self
    }

    pub fn with_ensemble_size(mut self, ensemble_size: usize) -> Self {
        self.ensemble_size = ensemble_size;
        self
    }

    /// Reject option combinations before any data is read.
    pub fn validate(&self, predictor_count: usize) -> Result<()> {
        if !(1..=MAX_PREDICTORS).contains(&predictor_count) {
            return Err(DownscaleError::Validation(format!(
                "between 1 and {MAX_PREDICTORS} predictors are required, got {predictor_count}"
            )));
        }
        if self.stepwise.is_some() {
            if self.conditional {
                return Err(DownscaleError::Validation(
                    "stepwise selection cannot be combined with a conditional model".into(),
                ));
            }
            if self.cross_validation_folds.is_some() {
                return Err(DownscaleError::Validation(
                    "stepwise selection cannot be combined with cross-validation".into(),
                ));
            }
            if self.granularity != Granularity::Annual {
                return Err(DownscaleError::Validation(
                    "stepwise selection requires an annual model".into(),
                ));
            }
            if predictor_count > MAX_STEPWISE_PREDICTORS {
                return Err(DownscaleError::Validation(format!(
                    "stepwise selection supports at most {MAX_STEPWISE_PREDICTORS} predictors, got {predictor_count}"
                )));
            }
        }
        if self.transform != TransformKind::None && !self.conditional {
            return Err(DownscaleError::Validation(format!(
                "{:?} transform applies only to conditional models",
                self.transform
            )));
        }
        if let Some(folds) = self.cross_validation_folds {
            if folds < 2 {
                return Err(DownscaleError::Validation(format!(
                    "cross-validation needs at least 2 folds, got {folds}"
                )));
            }
        }
        if self.ensemble_size == 0 {
            return Err(DownscaleError::Validation("ensemble size must be positive".into()));
        }
        Ok(())
    }
}

/// Everything fitted for one period.
#[derive(Debug, Clone)]
pub struct PeriodReport {
    pub period: Period,
    pub counts: PeriodCounts,
    /// Unconditional model, or the occurrence model in conditional mode.
    pub unconditional: ModelParameters,
    /// Amount model, conditional mode only.
    pub conditional: Option<ModelParameters>,
    /// Transform fitted to the amount sample (`None` state otherwise).
    pub transform: TransformState,
    pub detrend: Option<DetrendState>,
    /// Predictors kept by stepwise selection (0-based).
    pub selected_predictors: Option<Vec<usize>>,
    pub cv_unconditional: Option<CVResults>,
    pub cv_conditional: Option<CVResults>,
}

/// In-memory result of a calibration, equivalent to the parameter file.
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub granularity: Granularity,
    pub calendar: Calendar,
    pub record_start: SimDate,
    pub record_length: usize,
    pub calibration_start: SimDate,
    pub calibration_length: usize,
    pub conditional: bool,
    pub transform: TransformKind,
    pub autoregression: bool,
    pub predictor_count: usize,
    pub periods: Vec<PeriodReport>,
}

impl CalibrationReport {
    pub fn period(&self, period: Period) -> Option<&PeriodReport> {
        self.periods.iter().find(|p| p.period == period)
    }

    /// Parameter file for this report.
    pub fn to_parameter_file(
        &self,
        predictand_file: &str,
        predictor_files: Vec<String>,
        ensemble_size: usize,
    ) -> ParameterFile {
        let detrend: Option<Vec<DetrendState>> = self.periods.iter().map(|p| p.detrend).collect();
        ParameterFile {
            granularity: self.granularity,
            calendar: self.calendar,
            record_start: self.record_start,
            record_length: self.record_length,
            calibration_start: self.calibration_start,
            calibration_length: self.calibration_length,
            conditional: self.conditional,
            transform: self.transform,
            ensemble_size,
            autoregression: self.autoregression,
            predictand_file: predictand_file.to_string(),
            predictor_files,
            unconditional_rows: self.periods.iter().map(|p| Some(p.unconditional.clone())).collect(),
            conditional_rows: self
                .conditional
                .then(|| self.periods.iter().map(|p| p.conditional.clone()).collect()),
            predictand_reference: predictand_file.to_string(),
            transform_states: Some(self.periods.iter().map(|p| p.transform.clone()).collect()),
            detrend,
        }
    }
}

/// Fits per-period regression models.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    settings: Settings,
    cancel: CancellationToken,
}

impl Calibrator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `cancel` between periods, folds and subsets.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Calibrate from files and write the parameter file to `output`.
    #[tracing::instrument(skip_all, fields(output = %output.display()))]
    pub fn calibrate_files(&self, config: &CalibrationConfig, output: &Path) -> Result<CalibrationReport> {
        if config.predictand.as_os_str().is_empty() {
            return Err(DownscaleError::Validation("no predictand file selected".into()));
        }
        config.validate(config.predictors.len())?;
        let record_start = config.record_start.ok_or_else(|| {
            DownscaleError::Validation("file-based calibration needs a record start date".into())
        })?;
        let series = AlignedSeries::from_files(record_start, &config.predictand, &config.predictors)?;
        let report = self.calibrate_series(config, &series)?;
        let file = report.to_parameter_file(
            &ParameterFile::portable_name(&config.predictand, output),
            config
                .predictors
                .iter()
                .map(|p| ParameterFile::portable_name(p, output))
                .collect(),
            config.ensemble_size,
        );
        file.save(output)?;
        tracing::info!(periods = report.periods.len(), "parameter file written");
        Ok(report)
    }

    /// Calibrate against in-memory series.
    #[tracing::instrument(skip_all, fields(granularity = ?config.granularity, conditional = config.conditional))]
    pub fn calibrate_series(&self, config: &CalibrationConfig, series: &AlignedSeries) -> Result<CalibrationReport> {
        self.settings.validate()?;
        config.validate(series.predictor_count())?;
        let samples = self.segment(config, series)?;
        let options_start = config.calibration_start.unwrap_or_else(|| series.start());
        let calibration_length = samples.iter().map(|s| s.counts.total).sum();

        let mut periods = Vec::with_capacity(samples.len());
        for sample in &samples {
            self.cancel.check()?;
            let report = self
                .calibrate_period(config, sample)
                .map_err(|e| e.in_context(format!("period {}", sample.period)))?;
            tracing::debug!(
                period = %sample.period,
                valid = sample.counts.valid,
                missing = sample.counts.missing,
                r_squared = report.unconditional.r_squared,
                "period calibrated"
            );
            periods.push(report);
        }
        tracing::info!(periods = periods.len(), "calibration complete");

        Ok(CalibrationReport {
            granularity: config.granularity,
            calendar: self.settings.calendar,
            record_start: series.start(),
            record_length: series.len(),
            calibration_start: options_start,
            calibration_length,
            conditional: config.conditional,
            transform: config.transform,
            autoregression: config.autoregression,
            predictor_count: series.predictor_count(),
            periods,
        })
    }

    /// Per-period correlation of the predictand with each predictor.
    pub fn screen(&self, config: &CalibrationConfig, series: &AlignedSeries) -> Result<Vec<PeriodScreening>> {
        self.settings.validate()?;
        Ok(screen_predictors(&self.segment(config, series)?))
    }

    fn segment(&self, config: &CalibrationConfig, series: &AlignedSeries) -> Result<Vec<PeriodSample>> {
        let calendar = self.settings.calendar;
        let start = config.calibration_start.unwrap_or_else(|| series.start());
        let length = match config.calibration_length {
            Some(length) => length,
            None => {
                let offset = series.start().days_until(start, calendar).max(0) as usize;
                series.len().saturating_sub(offset)
            }
        };
        segment(
            series,
            &self.settings,
            &SegmentOptions {
                calibration_start: start,
                calibration_length: length,
                granularity: config.granularity,
                conditional: config.conditional,
                autoregression: config.autoregression,
            },
        )
    }

    fn calibrate_period(&self, config: &CalibrationConfig, sample: &PeriodSample) -> Result<PeriodReport> {
        if config.conditional {
            self.calibrate_conditional(config, sample)
        } else {
            self.calibrate_unconditional(config, sample)
        }
    }

    fn calibrate_unconditional(&self, config: &CalibrationConfig, sample: &PeriodSample) -> Result<PeriodReport> {
        let design = design_matrix(sample, sample.lag.clone())?;
        let (y, detrend) = match config.detrend {
            Some(kind) => {
                let state = fit_trend(kind, &sample.day_offset, &sample.predictand)?;
                (state.remove(&sample.day_offset, &sample.predictand), Some(state))
            }
            None => (sample.predictand.clone(), None),
        };

        let (fit, selected) = match config.stepwise {
            Some(criterion) => {
                let selection = stepwise_select(
                    &design,
                    sample.predictors.len(),
                    &y,
                    criterion,
                    config.strategy,
                    &self.cancel,
                )?;
                (selection.fit, Some(selection.selected))
            }
            None => (fit_regression(&design, &y, config.strategy)?, None),
        };

        let chow = self.chow(config, &design, &y)?;
        let cv_unconditional = self.cross_validate(config, &design, &y, CVModel::Continuous)?;

        Ok(PeriodReport {
            period: sample.period,
            counts: sample.counts,
            unconditional: ModelParameters::continuous(&fit).with_chow(chow),
            conditional: None,
            transform: TransformState::None,
            detrend,
            selected_predictors: selected,
            cv_unconditional,
            cv_conditional: None,
        })
    }

    fn calibrate_conditional(&self, config: &CalibrationConfig, sample: &PeriodSample) -> Result<PeriodReport> {
        let threshold = self.settings.threshold;
        let (occurrence_design, events) = self.occurrence_design(sample)?;
        let occurrence = occurrence_parameters(&occurrence_design, &events, config.strategy)?;
        let occurrence_chow = self.chow(config, &occurrence_design, &events)?;
        let cv_unconditional = self.cross_validate(config, &occurrence_design, &events, CVModel::Occurrence)?;

        let wet: Vec<usize> = (0..sample.len())
            .filter(|&i| sample.predictand[i] > threshold)
            .collect();
        let wet_sample = sample.select(&wet);
        let amount_lag = wet_sample
            .lag
            .as_ref()
            .map(|l| l.iter().map(|&v| if v > threshold { v } else { 0.0 }).collect());
        let amount_design = design_matrix(&wet_sample, amount_lag)?;

        let transformed = fit_transform(config.transform, &wet_sample.predictand)?;
        if transformed.kept.len() < MIN_PERIOD_SAMPLES {
            return Err(DownscaleError::insufficient(
                "amount model",
                MIN_PERIOD_SAMPLES,
                transformed.kept.len(),
            ));
        }
        let design = amount_design.select_rows(&transformed.kept);
        let offsets: Vec<f64> = transformed.kept.iter().map(|&i| wet_sample.day_offset[i]).collect();
        let (z, detrend) = match config.detrend {
            Some(kind) => {
                let state = fit_trend(kind, &offsets, &transformed.values)?;
                (state.remove(&offsets, &transformed.values), Some(state))
            }
            None => (transformed.values.clone(), None),
        };
        let fit = fit_regression(&design, &z, config.strategy)?;
        let amount_chow = self.chow(config, &design, &z)?;
        let cv_conditional = self.cross_validate(
            config,
            &amount_design,
            &wet_sample.predictand,
            CVModel::Amount(config.transform),
        )?;

        Ok(PeriodReport {
            period: sample.period,
            counts: sample.counts,
            unconditional: occurrence.with_chow(occurrence_chow),
            conditional: Some(ModelParameters::continuous(&fit).with_chow(amount_chow)),
            transform: transformed.state,
            detrend,
            selected_predictors: None,
            cv_unconditional,
            cv_conditional,
        })
    }

    /// Fit the occurrence model of one period: a linear probability model
    /// of the 0/1 event series (predictand above the event threshold).
    pub fn fit_occurrence(&self, sample: &PeriodSample, strategy: RegressionStrategy) -> Result<ModelParameters> {
        let (design, events) = self.occurrence_design(sample)?;
        occurrence_parameters(&design, &events, strategy)
    }

    /// Occurrence design matrix (lag as 0/1 events) and the event series.
    fn occurrence_design(&self, sample: &PeriodSample) -> Result<(DesignMatrix, Vec<f64>)> {
        let threshold = self.settings.threshold;
        let events = event_series(&sample.predictand, threshold);
        let design = design_matrix(sample, sample.lag.as_ref().map(|l| event_series(l, threshold)))?;
        Ok((design, events))
    }

    fn chow(
        &self,
        config: &CalibrationConfig,
        design: &DesignMatrix,
        y: &[f64],
    ) -> Result<Option<ChowStatistic>> {
        if config.chow_test {
            chow_test(design, y, config.strategy)
        } else {
            Ok(None)
        }
    }

    fn cross_validate(
        &self,
        config: &CalibrationConfig,
        design: &DesignMatrix,
        y: &[f64],
        model: CVModel,
    ) -> Result<Option<CVResults>> {
        match config.cross_validation_folds {
            Some(folds) => {
                let cv = CVConfig::new(folds).with_strategy(config.strategy);
                cross_validate(&cv, design, y, model, &self.cancel).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Predictor columns, followed by the lag column when given.
fn design_matrix(sample: &PeriodSample, lag: Option<Vec<f64>>) -> Result<DesignMatrix> {
    let mut design = DesignMatrix::from_columns(sample.predictors.clone())?;
    if let Some(lag) = lag {
        design.push_column(lag)?;
    }
    Ok(design)
}

fn occurrence_parameters(
    design: &DesignMatrix,
    events: &[f64],
    strategy: RegressionStrategy,
) -> Result<ModelParameters> {
    let fit: RegressionFit = fit_regression(design, events, strategy)?;
    Ok(ModelParameters::occurrence(&fit, events))
}

/// 1 where the value exceeds the threshold, else 0.
fn event_series(values: &[f64], threshold: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect()
}
