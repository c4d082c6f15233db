//! Daily series files: one floating-point value per line.

use crate::error::{DownscaleError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Streaming reader over a single-column series file.
///
/// Blank lines are tolerated only at the end of the file; a blank line
/// followed by more data would shift every later day and is rejected.
#[derive(Debug)]
pub struct SeriesReader<R> {
    reader: R,
    path: PathBuf,
    line: usize,
    pending_blank: Option<usize>,
    buf: String,
}

impl SeriesReader<BufReader<File>> {
    /// Open a series file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DownscaleError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> SeriesReader<R> {
    /// Wrap any buffered reader; `path` is only used in error messages.
    pub fn new(reader: R, path: impl AsRef<Path>) -> Self {
        Self {
            reader,
            path: path.as_ref().to_path_buf(),
            line: 0,
            pending_blank: None,
            buf: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next value, or `None` at end of file.
    pub fn next_value(&mut self) -> Result<Option<f64>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| DownscaleError::io(&self.path, e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                self.pending_blank.get_or_insert(self.line);
                continue;
            }
            if let Some(blank) = self.pending_blank {
                return Err(DownscaleError::format(&self.path, blank, "blank line inside series"));
            }
            let value = text.parse::<f64>().map_err(|_| {
                DownscaleError::format(&self.path, self.line, format!("'{text}' is not a number"))
            })?;
            return Ok(Some(value));
        }
    }

    /// Skip `count` values, failing if the file ends first.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        for skipped in 0..count {
            if self.next_value()?.is_none() {
                return Err(DownscaleError::format(
                    &self.path,
                    self.line,
                    format!("file ended after {skipped} of {count} skipped values"),
                ));
            }
        }
        Ok(())
    }
}

/// Read a whole series file into memory.
pub fn read_series(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let mut reader = SeriesReader::open(path)?;
    let mut values = Vec::new();
    while let Some(v) = reader.next_value()? {
        values.push(v);
    }
    Ok(values)
}
