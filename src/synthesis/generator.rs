//! Stochastic weather generator.
//!
//! Each ensemble member runs a small per-day state machine driven by the
//! calibrated period models:
//!
//! - unconditional: `value = β0 + Σβk·Xk [+ βAR·seed] + trend + residual`
//! - conditional: an occurrence probability decides wet or dry, and wet
//!   days draw an amount on the transformed scale before back-transforming.
//!
//! Residuals are sums of `N` uniform draws (see [`MemberRng::residual`]).
//! Days with a missing predictor, or without usable parameters for their
//! period, are written as the missing sentinel for every member.

use crate::calibration::params::ModelParameters;
use crate::core::{CancellationToken, OccurrenceMode, Period, Settings, SimDate};
use crate::error::{DownscaleError, Result};
use crate::io::{EnsembleWriter, ParameterFile, SynthesisManifest};
use crate::synthesis::random::MemberRng;
use crate::synthesis::source::{PredictorSource, PredictorStreams};
use crate::transform::{TransformKind, TransformState};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Added to amounts that fall on or below the event threshold.
const AMOUNT_EPSILON: f64 = 0.001;

/// What to synthesize from a parameter file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SynthesisConfig {
    pub parameter_file: PathBuf,
    /// Predictor files to read instead of those named in the parameter file.
    pub predictors: Option<Vec<PathBuf>>,
    /// Date of the first line of the predictor files; defaults to the
    /// record start of the parameter file.
    pub stream_start: Option<SimDate>,
    /// First synthesized day; defaults to the calibration start.
    pub start: Option<SimDate>,
    /// Days to synthesize; defaults to the calibration length.
    pub length: Option<usize>,
    /// Members; defaults to the parameter file's hint.
    pub ensemble_size: Option<usize>,
    pub output: PathBuf,
    /// Where to write the run manifest, if anywhere.
    pub manifest: Option<PathBuf>,
}

impl SynthesisConfig {
    pub fn new(parameter_file: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            parameter_file: parameter_file.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn with_predictors(mut self, predictors: Vec<PathBuf>) -> Self {
        self.predictors = Some(predictors);
        self
    }

    pub fn with_stream_start(mut self, start: SimDate) -> Self {
        self.stream_start = Some(start);
        self
    }

    pub fn with_window(mut self, start: SimDate, length: usize) -> Self {
        self.start = Some(start);
        self.length = Some(length);
        self
    }

    pub fn with_ensemble_size(mut self, ensemble_size: usize) -> Self {
        self.ensemble_size = Some(ensemble_size);
        self
    }

    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }
}

/// Outcome of a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SynthesisSummary {
    pub days: usize,
    pub ensemble_size: usize,
    /// Days written as missing because a predictor was missing.
    pub missing_predictor_days: usize,
    /// Days written as missing because their period had no usable model.
    pub missing_parameter_days: usize,
}

#[derive(Debug, Clone)]
struct MemberState {
    rng: MemberRng,
    /// Previous unconditional value; `None` before the first simulated day.
    seed: Option<f64>,
    occurrence_seed: f64,
    amount_seed: f64,
}

/// The models used on one day.
struct DayModels<'a> {
    primary: &'a ModelParameters,
    amount: Option<(&'a ModelParameters, &'a TransformState)>,
}

/// Generates ensembles from a calibrated parameter file.
#[derive(Debug, Clone)]
pub struct WeatherGenerator {
    settings: Settings,
    params: ParameterFile,
    cancel: CancellationToken,
}

impl WeatherGenerator {
    /// Create a generator; stateless transforms without stored state are
    /// filled in, rank tables must already be present.
    pub fn new(settings: Settings, mut params: ParameterFile) -> Result<Self> {
        settings.validate()?;
        params.validate()?;
        if params.transform_states.is_none() {
            match params.transform {
                TransformKind::InverseNormal | TransformKind::BoxCox => {
                    return Err(DownscaleError::Validation(format!(
                        "parameter file has no stored {:?} transform state",
                        params.transform
                    )))
                }
                _ => params.rebuild_rank_tables(&settings, None)?,
            }
        }
        Ok(Self {
            settings,
            params,
            cancel: CancellationToken::new(),
        })
    }

    /// Load a parameter file, rebuilding rank tables from its predictand
    /// reference when the file predates stored transform states.
    pub fn from_file(settings: Settings, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut params = ParameterFile::load(path)?;
        params.rebuild_rank_tables(&settings, path.parent())?;
        Self::new(settings, params)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn parameters(&self) -> &ParameterFile {
        &self.params
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run a file-based synthesis described by `config`.
    #[tracing::instrument(skip_all, fields(output = %config.output.display()))]
    pub fn run(&self, config: &SynthesisConfig) -> Result<SynthesisSummary> {
        let calendar = self.params.calendar;
        let base = config.parameter_file.parent();
        let predictors: Vec<PathBuf> = match &config.predictors {
            Some(paths) => paths.clone(),
            None => self
                .params
                .predictor_files
                .iter()
                .map(|name| ParameterFile::resolve(base, name))
                .collect(),
        };
        let stream_start = config.stream_start.unwrap_or(self.params.record_start);
        let start = config.start.unwrap_or(self.params.calibration_start);
        let length = config.length.unwrap_or(self.params.calibration_length);
        let ensemble_size = config.ensemble_size.unwrap_or(self.params.ensemble_size);

        let skip = usize::try_from(stream_start.days_until(start, calendar)).map_err(|_| {
            DownscaleError::Validation(format!(
                "synthesis start {start} precedes the predictor stream start {stream_start}"
            ))
        })?;
        let mut source = PredictorStreams::open(&predictors, skip)?;
        let mut writer = EnsembleWriter::create(&config.output, self.settings.missing_value)?;
        let summary = self.simulate(start, length, ensemble_size, &mut source, &mut writer)?;
        writer.finish()?;

        if let Some(manifest_path) = &config.manifest {
            self.manifest(config, &predictors, start, length, ensemble_size)
                .save(manifest_path)?;
        }
        tracing::info!(
            days = summary.days,
            members = summary.ensemble_size,
            missing_predictor_days = summary.missing_predictor_days,
            missing_parameter_days = summary.missing_parameter_days,
            "synthesis complete"
        );
        Ok(summary)
    }

    fn manifest(
        &self,
        config: &SynthesisConfig,
        predictors: &[PathBuf],
        start: SimDate,
        length: usize,
        ensemble_size: usize,
    ) -> SynthesisManifest {
        SynthesisManifest {
            granularity: self.params.granularity,
            calendar: self.params.calendar,
            start,
            length,
            conditional: self.params.conditional,
            ensemble_size,
            variance_inflation: self.settings.variance_inflation,
            transform: self.params.transform,
            bias_correction: self.settings.bias_correction,
            parameter_file: config.parameter_file.display().to_string(),
            output_file: config.output.display().to_string(),
            predictor_files: predictors.iter().map(|p| p.display().to_string()).collect(),
            monthly_profile: self.settings.monthly_profile,
        }
    }

    /// Synthesize `length` days from `start`, writing one row per day.
    pub fn simulate<S, W>(
        &self,
        start: SimDate,
        length: usize,
        ensemble_size: usize,
        source: &mut S,
        writer: &mut EnsembleWriter<W>,
    ) -> Result<SynthesisSummary>
    where
        S: PredictorSource + ?Sized,
        W: Write,
    {
        self.simulate_with(start, length, ensemble_size, source, |row| writer.write_day(row))
    }

    /// Synthesize into memory: `result[day][member]`.
    pub fn simulate_to_vec<S>(
        &self,
        start: SimDate,
        length: usize,
        ensemble_size: usize,
        source: &mut S,
    ) -> Result<Vec<Vec<f64>>>
    where
        S: PredictorSource + ?Sized,
    {
        let mut rows = Vec::with_capacity(length);
        self.simulate_with(start, length, ensemble_size, source, |row| {
            rows.push(row.to_vec());
            Ok(())
        })?;
        Ok(rows)
    }

    fn simulate_with<S, F>(
        &self,
        start: SimDate,
        length: usize,
        ensemble_size: usize,
        source: &mut S,
        mut emit: F,
    ) -> Result<SynthesisSummary>
    where
        S: PredictorSource + ?Sized,
        F: FnMut(&[f64]) -> Result<()>,
    {
        if ensemble_size == 0 {
            return Err(DownscaleError::Validation("ensemble size must be positive".into()));
        }
        let k = self.params.predictor_count();
        if source.predictor_count() != k {
            return Err(DownscaleError::Validation(format!(
                "parameter file expects {k} predictors, source provides {}",
                source.predictor_count()
            )));
        }
        let calendar = self.params.calendar;
        let first_offset = self.params.calibration_start.days_until(start, calendar);

        let mut members: Vec<MemberState> = (0..ensemble_size)
            .map(|m| MemberState {
                rng: MemberRng::new(self.settings.seed, m),
                seed: None,
                occurrence_seed: 0.0,
                amount_seed: 0.0,
            })
            .collect();
        let mut summary = SynthesisSummary {
            ensemble_size,
            ..Default::default()
        };
        let mut x = vec![0.0; k];
        let mut row = vec![0.0; ensemble_size];
        let missing = self.settings.missing_value;

        let mut date = start;
        for day in 0..length {
            self.cancel.check()?;
            source.next_day(day, &mut x)?;
            let period = self.params.granularity.period_of(date);

            if x.iter().any(|&v| self.settings.is_missing(v)) {
                row.fill(missing);
                summary.missing_predictor_days += 1;
            } else if let Some(models) = self.models(period) {
                let t = (first_offset + day as i64 + 1) as f64;
                let trend = self
                    .params
                    .detrend
                    .as_ref()
                    .map_or(0.0, |trends| trends[period.index()].trend(t));
                for (member, value) in members.iter_mut().zip(row.iter_mut()) {
                    *value = match models.amount {
                        None => self.unconditional_step(member, models.primary, &x, trend),
                        Some((amount, transform)) => {
                            self.conditional_step(member, models.primary, amount, transform, &x, trend)
                        }
                    };
                }
            } else {
                tracing::warn!(%date, %period, "no usable parameters, writing missing values");
                row.fill(missing);
                summary.missing_parameter_days += 1;
            }

            emit(&row)?;
            summary.days += 1;
            date = date.succ(calendar);
        }
        Ok(summary)
    }

    fn models(&self, period: Period) -> Option<DayModels<'_>> {
        let idx = period.index();
        let primary = self.params.unconditional_rows.get(idx)?.as_ref()?;
        if !primary.is_usable() {
            return None;
        }
        let amount = match &self.params.conditional_rows {
            Some(rows) => {
                let params = rows.get(idx)?.as_ref()?;
                if !params.is_usable() {
                    return None;
                }
                let transform = self.params.transform_states.as_ref()?.get(idx)?;
                Some((params, transform))
            }
            None => None,
        };
        Some(DayModels { primary, amount })
    }

    fn unconditional_step(
        &self,
        member: &mut MemberState,
        params: &ModelParameters,
        x: &[f64],
        trend: f64,
    ) -> f64 {
        let lag = self.lag(params, x, || {
            let ar = params.lag_coefficient(x.len()).unwrap_or(0.0);
            let base = params.response(x, None);
            *member.seed.get_or_insert(if ar.abs() < 1.0 {
                base / (1.0 - ar)
            } else {
                0.0
            })
        });
        let base = params.response(x, lag);
        let residual = member
            .rng
            .residual(self.settings.variance_inflation, params.standard_error);
        let mut value = base + trend + residual;
        if !self.settings.allow_negative && value < 0.0 {
            value = 0.0;
        }
        member.seed = Some(value);
        value
    }

    fn conditional_step(
        &self,
        member: &mut MemberState,
        occurrence: &ModelParameters,
        amount: &ModelParameters,
        transform: &TransformState,
        x: &[f64],
        trend: f64,
    ) -> f64 {
        let probability = occurrence.response(x, self.lag(occurrence, x, || member.occurrence_seed));
        let wet = match self.settings.occurrence_mode {
            OccurrenceMode::Stochastic => member.rng.uniform() <= probability,
            OccurrenceMode::Fixed => probability >= self.settings.conditional_threshold,
        };
        member.occurrence_seed = if wet { 1.0 } else { 0.0 };
        if !wet {
            member.amount_seed = 0.0;
            return 0.0;
        }

        let base = amount.response(x, self.lag(amount, x, || member.amount_seed)) + trend;
        let residual = member
            .rng
            .residual(self.settings.variance_inflation, amount.standard_error);
        let bias = self.settings.bias_correction;
        let value = match transform {
            TransformState::BoxCox(_) => transform.inverse(base + residual * bias),
            TransformState::InverseNormal(_) => transform.inverse(base + residual) * bias,
            _ => transform.inverse((base + residual) * bias),
        };
        let threshold = self.settings.threshold;
        let value = if value.is_finite() && value > threshold {
            value
        } else {
            threshold + AMOUNT_EPSILON
        };
        member.amount_seed = value;
        value
    }

    /// Lag value for models that carry an autoregressive coefficient.
    fn lag(&self, params: &ModelParameters, x: &[f64], seed: impl FnOnce() -> f64) -> Option<f64> {
        (self.params.autoregression && params.lag_coefficient(x.len()).is_some()).then(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::params::Diagnostic;
    use crate::core::{Calendar, Granularity, SeedMode};
    use crate::synthesis::source::InMemoryPredictors;
    use crate::transform::RankTable;
    use approx::assert_relative_eq;

    fn date(d: u32, m: u32, y: i32) -> SimDate {
        SimDate::new(y, m, d, Calendar::Gregorian).unwrap()
    }

    fn params(coefficients: Vec<f64>, se: f64) -> Option<ModelParameters> {
        Some(ModelParameters {
            coefficients,
            standard_error: se,
            r_squared: 0.5,
            f_ratio: 10.0,
            diagnostic: Diagnostic::Continuous {
                durbin_watson: 2.0,
                bias: 0.0,
            },
            chow: None,
        })
    }

    fn unconditional(rows: Vec<Option<ModelParameters>>, granularity: Granularity) -> ParameterFile {
        ParameterFile {
            granularity,
            calendar: Calendar::Gregorian,
            record_start: date(1, 1, 2000),
            record_length: 366,
            calibration_start: date(1, 1, 2000),
            calibration_length: 366,
            conditional: false,
            transform: TransformKind::None,
            ensemble_size: 3,
            autoregression: false,
            predictand_file: "y.dat".into(),
            predictor_files: vec!["x.dat".into()],
            unconditional_rows: rows,
            conditional_rows: None,
            predictand_reference: "y.dat".into(),
            transform_states: None,
            detrend: None,
        }
    }

    fn conditional(transform: TransformState) -> ParameterFile {
        ParameterFile {
            conditional: true,
            transform: transform.kind(),
            unconditional_rows: vec![params(vec![0.5, 0.5], 0.1)],
            conditional_rows: Some(vec![params(vec![1.0, 0.5], 0.2)]),
            transform_states: Some(vec![transform]),
            ..unconditional(vec![None], Granularity::Annual)
        }
    }

    fn source(values: Vec<f64>) -> InMemoryPredictors {
        InMemoryPredictors::new(vec![values]).unwrap()
    }

    // ==================== unconditional ====================

    #[test]
    fn zero_inflation_reproduces_the_response() {
        let settings = Settings::default()
            .with_variance_inflation(0)
            .with_seed(1);
        let gen = WeatherGenerator::new(
            settings,
            unconditional(vec![params(vec![1.0, 2.0], 3.0)], Granularity::Annual),
        )
        .unwrap();
        let rows = gen
            .simulate_to_vec(date(1, 1, 2000), 3, 2, &mut source(vec![0.0, 1.0, -4.0]))
            .unwrap();
        assert_eq!(rows, vec![vec![1.0, 1.0], vec![3.0, 3.0], vec![-7.0, -7.0]]);
    }

    #[test]
    fn negative_values_are_clamped_when_disallowed() {
        let settings = Settings::default()
            .with_variance_inflation(0)
            .with_allow_negative(false)
            .with_seed(1);
        let gen = WeatherGenerator::new(
            settings,
            unconditional(vec![params(vec![1.0, 2.0], 3.0)], Granularity::Annual),
        )
        .unwrap();
        let rows = gen
            .simulate_to_vec(date(1, 1, 2000), 1, 1, &mut source(vec![-4.0]))
            .unwrap();
        assert_eq!(rows[0][0], 0.0);
    }

    #[test]
    fn autoregression_starts_at_stationary_mean() {
        let mut file = unconditional(vec![params(vec![2.0, 1.0, 0.5], 1.0)], Granularity::Annual);
        file.autoregression = true;
        let settings = Settings::default().with_variance_inflation(0).with_seed(1);
        let gen = WeatherGenerator::new(settings, file).unwrap();
        let rows = gen
            .simulate_to_vec(date(1, 1, 2000), 2, 1, &mut source(vec![0.0, 0.0]))
            .unwrap();
        // base 2, βAR 0.5: seed 4, value 2 + 0.5·4 = 4, then 2 + 0.5·4 = 4.
        assert_relative_eq!(rows[0][0], 4.0);
        assert_relative_eq!(rows[1][0], 4.0);
    }

    #[test]
    fn missing_predictor_writes_sentinel_without_consuming_randomness() {
        let settings = Settings::default().with_seed(11);
        let file = unconditional(vec![params(vec![0.0, 1.0], 1.0)], Granularity::Annual);
        let gen = WeatherGenerator::new(settings, file).unwrap();
        let with_gap = gen
            .simulate_to_vec(date(1, 1, 2000), 3, 2, &mut source(vec![1.0, -999.0, 1.0]))
            .unwrap();
        let without_gap = gen
            .simulate_to_vec(date(1, 1, 2000), 2, 2, &mut source(vec![1.0, 1.0]))
            .unwrap();
        assert_eq!(with_gap[1], vec![-999.0, -999.0]);
        assert_eq!(with_gap[0], without_gap[0]);
        assert_eq!(with_gap[2], without_gap[1]);
    }

    #[test]
    fn missing_period_parameters_degrade_only_that_period() {
        let mut rows = vec![params(vec![1.0, 0.0], 0.0); 12];
        rows[1] = None;
        let settings = Settings::default().with_seed(2);
        let gen = WeatherGenerator::new(settings, unconditional(rows, Granularity::Monthly)).unwrap();
        let mut src = source(vec![0.0; 61]);
        let mut writer = EnsembleWriter::new(Vec::new(), "out", -999.0);
        let summary = gen
            .simulate(date(1, 1, 2000), 61, 1, &mut src, &mut writer)
            .unwrap();
        assert_eq!(summary.days, 61);
        assert_eq!(summary.missing_parameter_days, 29);
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1.000");
        assert_eq!(lines[31], "-999");
        assert_eq!(lines[59], "-999");
        assert_eq!(lines[60], "1.000");
    }

    #[test]
    fn exhausted_source_aborts() {
        let gen = WeatherGenerator::new(
            Settings::default().with_seed(1),
            unconditional(vec![params(vec![0.0, 1.0], 1.0)], Granularity::Annual),
        )
        .unwrap();
        assert!(matches!(
            gen.simulate_to_vec(date(1, 1, 2000), 5, 1, &mut source(vec![1.0, 2.0])),
            Err(DownscaleError::EndOfPredictors { day: 2, .. })
        ));
    }

    #[test]
    fn linear_trend_is_added_at_the_day_offset() {
        let mut file = unconditional(vec![params(vec![0.0, 0.0], 0.0)], Granularity::Annual);
        file.detrend = Some(vec![crate::calibration::detrend::DetrendState::Linear {
            intercept: 1.0,
            slope: 0.5,
        }]);
        let gen = WeatherGenerator::new(Settings::default().with_seed(1), file).unwrap();
        let rows = gen
            .simulate_to_vec(date(3, 1, 2000), 2, 1, &mut source(vec![0.0, 0.0]))
            .unwrap();
        assert_relative_eq!(rows[0][0], 2.5);
        assert_relative_eq!(rows[1][0], 3.0);
    }

    // ==================== conditional ====================

    #[test]
    fn fixed_occurrence_threshold_decides_wet_days() {
        let settings = Settings::default()
            .with_occurrence_mode(OccurrenceMode::Fixed)
            .with_variance_inflation(0)
            .with_seed(5);
        let gen = WeatherGenerator::new(settings, conditional(TransformState::None)).unwrap();
        // p = 0.5 + 0.5x: x = -0.5 -> 0.25 dry, x = 1 -> 1.0 wet with amount 1.5.
        let rows = gen
            .simulate_to_vec(date(1, 1, 2000), 2, 1, &mut source(vec![-0.5, 1.0]))
            .unwrap();
        assert_eq!(rows[0][0], 0.0);
        assert_relative_eq!(rows[1][0], 1.5);
    }

    #[test]
    fn bias_correction_order_depends_on_transform() {
        let settings = Settings::default()
            .with_occurrence_mode(OccurrenceMode::Fixed)
            .with_variance_inflation(0)
            .with_bias_correction(2.0)
            .with_seed(5);
        let wet_day = |transform: TransformState| {
            WeatherGenerator::new(settings.clone(), conditional(transform))
                .unwrap()
                .simulate_to_vec(date(1, 1, 2000), 1, 1, &mut source(vec![2.0]))
                .unwrap()[0][0]
        };
        // amount base = 1 + 0.5·2 = 2
        assert_relative_eq!(wet_day(TransformState::FourthRoot), 256.0, epsilon = 1e-9);
        assert_relative_eq!(wet_day(TransformState::NaturalLog), 4f64.exp(), epsilon = 1e-9);
        let table = RankTable::new((1..=9).map(f64::from).collect(), -5.0, 1e-3).unwrap();
        let plain = TransformState::InverseNormal(table.clone()).inverse(2.0);
        assert_relative_eq!(
            wet_day(TransformState::InverseNormal(table)),
            plain * 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn amounts_never_fall_to_the_threshold() {
        let settings = Settings::default()
            .with_occurrence_mode(OccurrenceMode::Fixed)
            .with_variance_inflation(0)
            .with_threshold(0.3)
            .with_seed(5);
        let mut file = conditional(TransformState::None);
        file.conditional_rows = Some(vec![params(vec![-5.0, 0.0], 0.2)]);
        let gen = WeatherGenerator::new(settings, file).unwrap();
        let rows = gen
            .simulate_to_vec(date(1, 1, 2000), 1, 1, &mut source(vec![1.0]))
            .unwrap();
        assert_relative_eq!(rows[0][0], 0.301);
    }

    #[test]
    fn stored_rank_tables_are_required() {
        let mut file = conditional(TransformState::None);
        file.transform = TransformKind::InverseNormal;
        file.transform_states = None;
        assert!(matches!(
            WeatherGenerator::new(Settings::default(), file),
            Err(DownscaleError::Validation(_))
        ));
    }

    #[test]
    fn fixed_seed_runs_are_identical_and_members_differ() {
        let settings = Settings::default().with_seed_mode(SeedMode::Fixed(99));
        let gen = WeatherGenerator::new(settings, conditional(TransformState::FourthRoot)).unwrap();
        let xs: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).sin()).collect();
        let a = gen
            .simulate_to_vec(date(1, 1, 2000), 50, 4, &mut source(xs.clone()))
            .unwrap();
        let b = gen
            .simulate_to_vec(date(1, 1, 2000), 50, 4, &mut source(xs))
            .unwrap();
        assert_eq!(a, b);
        assert!(a.iter().any(|row| row[0] != row[1]));
    }

    #[test]
    fn cancellation_stops_the_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let gen = WeatherGenerator::new(
            Settings::default().with_seed(1),
            unconditional(vec![params(vec![0.0, 1.0], 1.0)], Granularity::Annual),
        )
        .unwrap()
        .with_cancellation(cancel);
        assert_eq!(
            gen.simulate_to_vec(date(1, 1, 2000), 3, 1, &mut source(vec![1.0; 3]))
                .unwrap_err(),
            DownscaleError::Cancelled
        );
    }
}
