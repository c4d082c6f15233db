//! Daily predictor values fed to the weather generator.

use crate::error::{DownscaleError, Result};
use crate::io::SeriesReader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A source yielding one value per predictor for each synthesized day.
pub trait PredictorSource {
    /// Number of predictors produced per day.
    fn predictor_count(&self) -> usize;

    /// Fill `out` with the values for synthesis day `day` (0-based).
    ///
    /// # Errors
    /// `EndOfPredictors` when the source is exhausted.
    fn next_day(&mut self, day: usize, out: &mut [f64]) -> Result<()>;
}

/// Predictor files streamed line by line.
#[derive(Debug)]
pub struct PredictorStreams {
    readers: Vec<SeriesReader<BufReader<File>>>,
}

impl PredictorStreams {
    /// Open the files and skip the first `skip` lines of each.
    pub fn open(paths: &[impl AsRef<Path>], skip: usize) -> Result<Self> {
        let mut readers = Vec::with_capacity(paths.len());
        for path in paths {
            let mut reader = SeriesReader::open(path)?;
            for _ in 0..skip {
                if reader.next_value()?.is_none() {
                    return Err(DownscaleError::EndOfPredictors {
                        path: path.as_ref().display().to_string(),
                        day: 0,
                    });
                }
            }
            readers.push(reader);
        }
        Ok(Self { readers })
    }
}

impl PredictorSource for PredictorStreams {
    fn predictor_count(&self) -> usize {
        self.readers.len()
    }

    fn next_day(&mut self, day: usize, out: &mut [f64]) -> Result<()> {
        for (reader, slot) in self.readers.iter_mut().zip(out.iter_mut()) {
            *slot = reader
                .next_value()?
                .ok_or_else(|| DownscaleError::EndOfPredictors {
                    path: reader.path().display().to_string(),
                    day,
                })?;
        }
        Ok(())
    }
}

/// Predictor columns held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryPredictors {
    columns: Vec<Vec<f64>>,
    position: usize,
}

impl InMemoryPredictors {
    /// `columns[variable][day]`; all columns must have the same length.
    pub fn new(columns: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(k) = columns.iter().position(|c| c.len() != first.len()) {
                return Err(DownscaleError::Validation(format!(
                    "predictor {} has {} values, predictor 1 has {}",
                    k + 1,
                    columns[k].len(),
                    first.len()
                )));
            }
        }
        Ok(Self {
            columns,
            position: 0,
        })
    }

    /// Start reading at day `offset` of the columns.
    pub fn starting_at(mut self, offset: usize) -> Self {
        self.position = offset;
        self
    }

    fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }
}

impl PredictorSource for InMemoryPredictors {
    fn predictor_count(&self) -> usize {
        self.columns.len()
    }

    fn next_day(&mut self, day: usize, out: &mut [f64]) -> Result<()> {
        if self.position >= self.len() {
            return Err(DownscaleError::EndOfPredictors {
                path: "<memory>".into(),
                day,
            });
        }
        for (column, slot) in self.columns.iter().zip(out.iter_mut()) {
            *slot = column[self.position];
        }
        self.position += 1;
        Ok(())
    }
}
