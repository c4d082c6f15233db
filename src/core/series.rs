//! Aligned daily series: one predictand and its predictors.

use crate::core::calendar::{Calendar, SimDate};
use crate::error::{DownscaleError, Result};
use crate::io::read_series;
use std::path::Path;

/// Same-length daily arrays sharing a start date.
///
/// Values are stored column-major: `predictors[variable][day]`.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    start: SimDate,
    predictand: Vec<f64>,
    predictors: Vec<Vec<f64>>,
    labels: Vec<String>,
}

impl AlignedSeries {
    /// Create aligned series, checking that all lengths agree.
    pub fn new(start: SimDate, predictand: Vec<f64>, predictors: Vec<Vec<f64>>) -> Result<Self> {
        let n = predictand.len();
        for (k, column) in predictors.iter().enumerate() {
            if column.len() != n {
                return Err(DownscaleError::Validation(format!(
                    "predictor {} has {} values, predictand has {}",
                    k + 1,
                    column.len(),
                    n
                )));
            }
        }
        let labels = (1..=predictors.len()).map(|k| format!("predictor {k}")).collect();
        Ok(Self {
            start,
            predictand,
            predictors,
            labels,
        })
    }

    /// Load a predictand file and predictor files, one value per line.
    ///
    /// Every predictor file must hold exactly as many days as the
    /// predictand file.
    pub fn from_files(
        start: SimDate,
        predictand: &Path,
        predictors: &[impl AsRef<Path>],
    ) -> Result<Self> {
        let y = read_series(predictand)?;
        let mut columns = Vec::with_capacity(predictors.len());
        let mut labels = Vec::with_capacity(predictors.len());
        for path in predictors {
            let path = path.as_ref();
            let column = read_series(path)?;
            if column.len() != y.len() {
                let (short, line) = if column.len() < y.len() {
                    (path, column.len() + 1)
                } else {
                    (predictand, y.len() + 1)
                };
                return Err(DownscaleError::format(
                    short,
                    line,
                    format!(
                        "{} has {} values but {} has {}",
                        path.display(),
                        column.len(),
                        predictand.display(),
                        y.len()
                    ),
                ));
            }
            columns.push(column);
            labels.push(path.display().to_string());
        }
        let mut series = Self::new(start, y, columns)?;
        series.labels = labels;
        Ok(series)
    }

    /// Replace the predictor labels.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.predictors.len() {
            return Err(DownscaleError::Validation(format!(
                "{} labels for {} predictors",
                labels.len(),
                self.predictors.len()
            )));
        }
        self.labels = labels;
        Ok(self)
    }

    pub fn start(&self) -> SimDate {
        self.start
    }

    pub fn len(&self) -> usize {
        self.predictand.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictand.is_empty()
    }

    pub fn predictand(&self) -> &[f64] {
        &self.predictand
    }

    pub fn predictor(&self, k: usize) -> &[f64] {
        &self.predictors[k]
    }

    pub fn predictor_count(&self) -> usize {
        self.predictors.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of `date` within the series, if it falls inside it.
    pub fn index_of(&self, date: SimDate, calendar: Calendar) -> Option<usize> {
        let offset = self.start.days_until(date, calendar);
        if offset >= 0 && (offset as usize) < self.len() {
            Some(offset as usize)
        } else {
            None
        }
    }
}
