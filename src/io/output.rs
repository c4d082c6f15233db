//! Tab-separated ensemble output.

use crate::error::{DownscaleError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one row per day with one column per ensemble member.
///
/// Values are written with three decimals; values equal to the missing
/// sentinel (or NaN) are written as the sentinel itself.
#[derive(Debug)]
pub struct EnsembleWriter<W: Write> {
    inner: W,
    path: PathBuf,
    missing_value: f64,
    rows: usize,
    line: String,
}

impl EnsembleWriter<BufWriter<File>> {
    /// Create (or truncate) an output file.
    pub fn create(path: impl AsRef<Path>, missing_value: f64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| DownscaleError::io(path, e))?;
        Ok(Self::new(BufWriter::new(file), path, missing_value))
    }
}

impl<W: Write> EnsembleWriter<W> {
    pub fn new(inner: W, path: impl AsRef<Path>, missing_value: f64) -> Self {
        Self {
            inner,
            path: path.as_ref().to_path_buf(),
            missing_value,
            rows: 0,
            line: String::new(),
        }
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_day(&mut self, values: &[f64]) -> Result<()> {
        use std::fmt::Write as _;
        self.line.clear();
        for (i, &v) in values.iter().enumerate() {
            if i > 0 {
                self.line.push('\t');
            }
            if v.is_nan() || v == self.missing_value {
                let _ = write!(self.line, "{}", self.missing_value);
            } else {
                let _ = write!(self.line, "{v:.3}");
            }
        }
        self.line.push('\n');
        self.inner
            .write_all(self.line.as_bytes())
            .map_err(|e| DownscaleError::io(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner
            .flush()
            .map_err(|e| DownscaleError::io(&self.path, e))?;
        Ok(self.inner)
    }
}
