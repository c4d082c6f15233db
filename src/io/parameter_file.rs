//! Parameter file codec.
//!
//! The parameter file records everything synthesis needs from a
//! calibration run: the layout of the predictors, the calendar, the fitted
//! per-period models and, when used, their transforms and trends. Rows are
//! plain tab-separated text so files can be inspected and edited by hand.

use crate::calibration::detrend::DetrendState;
use crate::calibration::params::{ChowStatistic, Diagnostic, ModelParameters};
use crate::core::{Calendar, Granularity, SimDate, Settings};
use crate::error::{DownscaleError, Result};
use crate::io::series_file::read_series;
use crate::io::text::{format_bool, parse_bool, parse_floats, LineCursor};
use crate::transform::{BoxCoxParams, RankTable, TransformKind, TransformState};
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

const MISSING_ROW: &str = "MISSING";

/// Fitted calibration, as persisted between calibration and synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterFile {
    pub granularity: Granularity,
    pub calendar: Calendar,
    pub record_start: SimDate,
    pub record_length: usize,
    pub calibration_start: SimDate,
    pub calibration_length: usize,
    pub conditional: bool,
    pub transform: TransformKind,
    pub ensemble_size: usize,
    pub autoregression: bool,
    pub predictand_file: String,
    pub predictor_files: Vec<String>,
    /// One row per period: the unconditional model, or the occurrence model
    /// in conditional mode. `None` is written as `MISSING`.
    pub unconditional_rows: Vec<Option<ModelParameters>>,
    /// Amount model rows, conditional mode only.
    pub conditional_rows: Option<Vec<Option<ModelParameters>>>,
    /// Predictand file used to rebuild rank tables for older files.
    pub predictand_reference: String,
    /// Per-period transform state; absent in older files.
    pub transform_states: Option<Vec<TransformState>>,
    /// Per-period trend, present when the predictand was detrended.
    pub detrend: Option<Vec<DetrendState>>,
}

impl ParameterFile {
    pub fn predictor_count(&self) -> usize {
        self.predictor_files.len()
    }

    /// Coefficients every row must carry: intercept, predictors and lag.
    pub fn coefficient_count(&self) -> usize {
        self.predictor_count() + 1 + usize::from(self.autoregression)
    }

    /// Check the structural invariants tying the sections together.
    pub fn validate(&self) -> Result<()> {
        let k = self.predictor_count();
        if !(1..=12).contains(&k) {
            return Err(DownscaleError::Validation(format!(
                "parameter file lists {k} predictors, expected 1 to 12"
            )));
        }
        let periods = self.granularity.period_count();
        let coefs = self.coefficient_count();
        let check_rows = |rows: &[Option<ModelParameters>], name: &str| -> Result<()> {
            if rows.len() != periods {
                return Err(DownscaleError::Validation(format!(
                    "{} {name} rows for {periods} periods",
                    rows.len()
                )));
            }
            for params in rows.iter().flatten() {
                if params.coefficients.len() != coefs {
                    return Err(DownscaleError::Validation(format!(
                        "{name} row has {} coefficients, expected {coefs}",
                        params.coefficients.len()
                    )));
                }
            }
            Ok(())
        };
        check_rows(&self.unconditional_rows, "unconditional")?;
        match (&self.conditional_rows, self.conditional) {
            (Some(rows), true) => check_rows(rows, "conditional")?,
            (None, false) => {}
            _ => {
                return Err(DownscaleError::Validation(
                    "conditional rows must be present exactly when the model is conditional".into(),
                ))
            }
        }
        if let Some(states) = &self.transform_states {
            if states.len() != periods {
                return Err(DownscaleError::Validation(format!(
                    "{} transform states for {periods} periods",
                    states.len()
                )));
            }
            if let Some(state) = states.iter().find(|s| s.kind() != self.transform) {
                return Err(DownscaleError::Validation(format!(
                    "transform state {:?} does not match transform {:?}",
                    state.kind(),
                    self.transform
                )));
            }
        }
        if let Some(trends) = &self.detrend {
            if trends.len() != periods {
                return Err(DownscaleError::Validation(format!(
                    "{} detrend rows for {periods} periods",
                    trends.len()
                )));
            }
        }
        Ok(())
    }

    /// Render the file contents.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let k = self.predictor_count() as i64;
        let signed = if self.detrend.is_some() { -k } else { k };
        let _ = writeln!(out, "{signed}");
        let _ = writeln!(out, "{}", self.granularity.period_count());
        let _ = writeln!(out, "{}", self.calendar.year_length());
        let _ = writeln!(out, "{}", self.record_start);
        let _ = writeln!(out, "{}", self.record_length);
        let _ = writeln!(out, "{}", self.calibration_start);
        let _ = writeln!(out, "{}", self.calibration_length);
        let _ = writeln!(out, "{}", format_bool(self.conditional));
        let _ = writeln!(out, "{}", self.transform.code());
        let _ = writeln!(out, "{}", self.ensemble_size);
        let _ = writeln!(out, "{}", format_bool(self.autoregression));
        let _ = writeln!(out, "{}", self.predictand_file);
        for name in &self.predictor_files {
            let _ = writeln!(out, "{name}");
        }
        for row in &self.unconditional_rows {
            let _ = writeln!(out, "{}", format_params(row.as_ref()));
        }
        if let Some(rows) = &self.conditional_rows {
            for row in rows {
                let _ = writeln!(out, "{}", format_params(row.as_ref()));
            }
        }
        let _ = writeln!(out, "{}", self.predictand_reference);
        if let Some(states) = &self.transform_states {
            for state in states {
                let _ = writeln!(out, "{}", format_transform(state));
            }
        }
        if let Some(trends) = &self.detrend {
            for trend in trends {
                let _ = writeln!(out, "{}", format_trend(trend));
            }
        }
        out
    }

    /// Validate and write the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        let path = path.as_ref();
        fs::write(path, self.to_text()).map_err(|e| DownscaleError::io(path, e))
    }

    /// Read and parse a parameter file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DownscaleError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Parse file contents; `path` is only used in error messages.
    ///
    /// Files written before the autoregression flag existed go straight
    /// from the ensemble size to the predictand filename; the flag then
    /// defaults to false.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut lines = LineCursor::new(text, path);

        let (count_line, count_text) = lines.next("predictor count")?;
        let signed: i64 = count_text.parse().map_err(|_| {
            lines.error(count_line, format!("expected predictor count, found '{count_text}'"))
        })?;
        let detrended = signed < 0;
        let k = signed.unsigned_abs() as usize;
        if !(1..=12).contains(&k) {
            return Err(lines.error(count_line, format!("predictor count {k} outside 1 to 12")));
        }

        let granularity = lines.granularity()?;
        let calendar = lines.calendar()?;
        let record_start = lines.date("record start", calendar)?;
        let record_length = lines.parse::<usize>("record length")?;
        let calibration_start = lines.date("calibration start", calendar)?;
        let calibration_length = lines.parse::<usize>("calibration length")?;
        let conditional = lines.boolean("conditional")?;
        let transform = lines.transform()?;
        let ensemble_size = lines.parse::<usize>("ensemble size")?;
        let autoregression = match lines.peek().and_then(parse_bool) {
            Some(flag) => {
                lines.next("autoregression")?;
                flag
            }
            None => false,
        };
        let predictand_file = lines.next("predictand filename")?.1.to_string();
        let mut predictor_files = Vec::with_capacity(k);
        for j in 0..k {
            predictor_files.push(lines.next(&format!("predictor filename {}", j + 1))?.1.to_string());
        }

        let periods = granularity.period_count();
        let coefs = k + 1 + usize::from(autoregression);
        let mut read_rows = |section: RowSection| -> Result<Vec<Option<ModelParameters>>> {
            (0..periods)
                .map(|_| parse_params(&mut lines, coefs, section))
                .collect()
        };
        let unconditional_rows = read_rows(if conditional {
            RowSection::Occurrence
        } else {
            RowSection::Continuous
        })?;
        let conditional_rows = if conditional {
            Some(read_rows(RowSection::Continuous)?)
        } else {
            None
        };

        let predictand_reference = lines.next("predictand file reference")?.1.to_string();

        let transform_states = match lines.peek() {
            Some(line) if is_transform_row(line) => Some(
                (0..periods)
                    .map(|_| parse_transform(&mut lines))
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => None,
        };
        let detrend = if detrended {
            Some(
                (0..periods)
                    .map(|_| parse_trend(&mut lines))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };
        if let Some(line) = lines.peek() {
            let (n, _) = lines.next("end of file")?;
            return Err(lines.error(n, format!("unexpected trailing content '{line}'")));
        }

        let file = Self {
            granularity,
            calendar,
            record_start,
            record_length,
            calibration_start,
            calibration_length,
            conditional,
            transform,
            ensemble_size,
            autoregression,
            predictand_file,
            predictor_files,
            unconditional_rows,
            conditional_rows,
            predictand_reference,
            transform_states,
            detrend,
        };
        file.validate()
            .map_err(|e| DownscaleError::format(path, 0, e.to_string()))?;
        Ok(file)
    }

    /// Resolve a filename stored in the file against the directory holding
    /// the parameter file.
    pub fn resolve(base: Option<&Path>, name: &str) -> PathBuf {
        let candidate = PathBuf::from(name);
        match base {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate,
        }
    }

    /// Name to store for `path` so that [`resolve`](Self::resolve) finds it
    /// again from the directory of `parameter_file`.
    ///
    /// Relative paths are taken relative to the working directory and
    /// rewritten relative to the parameter file; absolute paths are kept.
    pub fn portable_name(path: &Path, parameter_file: &Path) -> String {
        let dir = match parameter_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => return path.display().to_string(),
        };
        if path.is_absolute() {
            return path.display().to_string();
        }
        match (absolute(path), absolute(dir)) {
            (Some(target), Some(base)) => relative_path(&target, &base)
                .unwrap_or(target)
                .display()
                .to_string(),
            _ => path.display().to_string(),
        }
    }

    /// Fill in missing transform states.
    ///
    /// Stateless transforms are filled directly. Rank tables are rebuilt
    /// from the referenced predictand file over the calibration window:
    /// per period, the non-missing values above the event threshold. Box-Cox
    /// parameters cannot be recovered this way.
    pub fn rebuild_rank_tables(&mut self, settings: &Settings, base: Option<&Path>) -> Result<()> {
        if self.transform_states.is_some() {
            return Ok(());
        }
        let periods = self.granularity.period_count();
        let states = match self.transform {
            TransformKind::None => vec![TransformState::None; periods],
            TransformKind::FourthRoot => vec![TransformState::FourthRoot; periods],
            TransformKind::NaturalLog => vec![TransformState::NaturalLog; periods],
            TransformKind::BoxCox => {
                return Err(DownscaleError::Transform(
                    "Box-Cox parameters are not stored in this parameter file".into(),
                ))
            }
            TransformKind::InverseNormal => {
                let path = Self::resolve(base, &self.predictand_reference);
                let values = read_series(&path)?;
                let offset = self.record_start.days_until(self.calibration_start, self.calendar);
                let first = usize::try_from(offset).map_err(|_| {
                    DownscaleError::Validation(format!(
                        "calibration start {} precedes record start {}",
                        self.calibration_start, self.record_start
                    ))
                })?;
                let mut samples = vec![Vec::new(); periods];
                let mut date = self.calibration_start;
                for day in first..(first + self.calibration_length).min(values.len()) {
                    let v = values[day];
                    if !settings.is_missing(v) && v > settings.threshold {
                        samples[self.granularity.period_of(date).index()].push(v);
                    }
                    date = date.succ(self.calendar);
                }
                let periods_list = self.granularity.periods();
                samples
                    .iter()
                    .zip(periods_list)
                    .map(|(sample, period)| {
                        RankTable::from_sample(sample)
                            .map(TransformState::InverseNormal)
                            .map_err(|e| e.in_context(format!("period {period}")))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };
        tracing::debug!(periods, transform = ?self.transform, "rebuilt transform states");
        self.transform_states = Some(states);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum RowSection {
    Continuous,
    Occurrence,
}

fn format_params(params: Option<&ModelParameters>) -> String {
    let Some(p) = params else {
        return MISSING_ROW.to_string();
    };
    let (d1, d2) = match p.diagnostic {
        Diagnostic::Continuous {
            durbin_watson,
            bias,
        } => (durbin_watson, bias),
        Diagnostic::Occurrence { proportion_correct } => (proportion_correct, 0.0),
        Diagnostic::Ranked { spearman, bias } => (spearman, bias),
    };
    let (chow, chow_p) = p
        .chow
        .map(|c| (c.statistic, c.p_value))
        .unwrap_or((f64::NAN, f64::NAN));
    let mut fields: Vec<String> = p.coefficients.iter().map(|c| c.to_string()).collect();
    fields.extend(
        [p.standard_error, p.r_squared, p.f_ratio, d1, d2, chow, chow_p]
            .iter()
            .map(|v| v.to_string()),
    );
    fields.join("\t")
}

fn parse_params(
    lines: &mut LineCursor<'_>,
    coefs: usize,
    section: RowSection,
) -> Result<Option<ModelParameters>> {
    let (n, line) = lines.next("parameter row")?;
    if line.eq_ignore_ascii_case(MISSING_ROW) {
        return Ok(None);
    }
    let values = parse_floats(line)
        .map_err(|field| lines.error(n, format!("parameter row: '{field}' is not a number")))?;
    if values.len() != coefs + 7 {
        return Err(lines.error(
            n,
            format!("parameter row has {} fields, expected {}", values.len(), coefs + 7),
        ));
    }
    let stats = &values[coefs..];
    let diagnostic = match section {
        RowSection::Continuous => Diagnostic::Continuous {
            durbin_watson: stats[3],
            bias: stats[4],
        },
        RowSection::Occurrence => Diagnostic::Occurrence {
            proportion_correct: stats[3],
        },
    };
    let chow = (!stats[5].is_nan()).then_some(ChowStatistic {
        statistic: stats[5],
        p_value: stats[6],
    });
    Ok(Some(ModelParameters {
        coefficients: values[..coefs].to_vec(),
        standard_error: stats[0],
        r_squared: stats[1],
        f_ratio: stats[2],
        diagnostic,
        chow,
    }))
}

fn is_transform_row(line: &str) -> bool {
    matches!(
        line.split_whitespace().next(),
        Some("NONE" | "FOURTH_ROOT" | "LOG" | "BOXCOX" | "RANKS")
    )
}

fn format_transform(state: &TransformState) -> String {
    match state {
        TransformState::None => "NONE".into(),
        TransformState::FourthRoot => "FOURTH_ROOT".into(),
        TransformState::NaturalLog => "LOG".into(),
        TransformState::BoxCox(p) => format!("BOXCOX\t{}\t{}", p.lambda, p.shift),
        TransformState::InverseNormal(table) => {
            let mut row = format!("RANKS\t{}\t{}", table.lower(), table.step());
            for v in table.sorted() {
                let _ = write!(row, "\t{v}");
            }
            row
        }
    }
}

fn parse_transform(lines: &mut LineCursor<'_>) -> Result<TransformState> {
    let (n, line) = lines.next("transform state row")?;
    let mut fields = line.split_whitespace();
    let tag = fields.next().unwrap_or_default();
    let rest: Vec<&str> = fields.collect();
    let numbers = parse_floats(&rest.join(" "))
        .map_err(|field| lines.error(n, format!("transform row: '{field}' is not a number")))?;
    match (tag, numbers.as_slice()) {
        ("NONE", []) => Ok(TransformState::None),
        ("FOURTH_ROOT", []) => Ok(TransformState::FourthRoot),
        ("LOG", []) => Ok(TransformState::NaturalLog),
        ("BOXCOX", [lambda, shift]) => Ok(TransformState::BoxCox(BoxCoxParams {
            lambda: *lambda,
            shift: *shift,
        })),
        ("RANKS", [lower, step, values @ ..]) if !values.is_empty() => {
            RankTable::new(values.to_vec(), *lower, *step)
                .map(TransformState::InverseNormal)
                .map_err(|e| lines.error(n, e.to_string()))
        }
        _ => Err(lines.error(n, format!("malformed transform row '{line}'"))),
    }
}

fn format_trend(trend: &DetrendState) -> String {
    match *trend {
        DetrendState::Linear { intercept, slope } => format!("LINEAR\t{intercept}\t{slope}"),
        DetrendState::Power {
            scale,
            exponent,
            shift,
        } => format!("POWER\t{scale}\t{exponent}\t{shift}"),
    }
}

fn parse_trend(lines: &mut LineCursor<'_>) -> Result<DetrendState> {
    let (n, line) = lines.next("detrend row")?;
    let mut fields = line.split_whitespace();
    let tag = fields.next().unwrap_or_default();
    let rest: Vec<&str> = fields.collect();
    let numbers = parse_floats(&rest.join(" "))
        .map_err(|field| lines.error(n, format!("detrend row: '{field}' is not a number")))?;
    match (tag, numbers.as_slice()) {
        ("LINEAR", [intercept, slope]) => Ok(DetrendState::Linear {
            intercept: *intercept,
            slope: *slope,
        }),
        ("POWER", [scale, exponent, shift]) => Ok(DetrendState::Power {
            scale: *scale,
            exponent: *exponent,
            shift: *shift,
        }),
        _ => Err(lines.error(n, format!("malformed detrend row '{line}'"))),
    }
}

fn absolute(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path)
        .ok()
        .or_else(|| std::env::current_dir().ok().map(|cwd| cwd.join(path)))
}

/// `target` expressed relative to `base`; both must be absolute.
fn relative_path(target: &Path, base: &Path) -> Option<PathBuf> {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target.iter().zip(&base).take_while(|(a, b)| a == b).count();
    if common == 0 {
        return None;
    }
    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for part in &target[common..] {
        out.push(part.as_os_str());
    }
    Some(out)
}
