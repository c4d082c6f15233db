//! Line-oriented parsing helpers shared by the parameter and manifest codecs.

use crate::core::{Calendar, Granularity, SimDate};
use crate::error::{DownscaleError, Result};
use crate::transform::TransformKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Boolean literal as written to files.
pub(crate) fn format_bool(value: bool) -> &'static str {
    if value {
        "#TRUE#"
    } else {
        "#FALSE#"
    }
}

/// Accepts `#TRUE#`, `#FALSE#`, `true` and `false` in any case.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "#true#" | "true" => Some(true),
        "#false#" | "false" => Some(false),
        _ => None,
    }
}

/// Cursor over the non-empty lines of a file, keeping 1-based line numbers
/// for error messages.
pub(crate) struct LineCursor<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
    path: PathBuf,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(text: &'a str, path: &Path) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();
        Self {
            lines,
            pos: 0,
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn error(&self, line: usize, message: impl Into<String>) -> DownscaleError {
        DownscaleError::format(&self.path, line, message)
    }

    fn last_line(&self) -> usize {
        self.lines.last().map(|(n, _)| *n).unwrap_or(0)
    }

    pub(crate) fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).map(|(_, l)| l.trim())
    }

    /// Next line with its number; `what` names the expected item.
    pub(crate) fn next(&mut self, what: &str) -> Result<(usize, &'a str)> {
        match self.lines.get(self.pos) {
            Some(&(n, l)) => {
                self.pos += 1;
                Ok((n, l.trim()))
            }
            None => Err(self.error(self.last_line(), format!("file ended before {what}"))),
        }
    }

    pub(crate) fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let (n, line) = self.next(what)?;
        line.parse::<T>()
            .map_err(|_| self.error(n, format!("expected {what}, found '{line}'")))
    }

    pub(crate) fn boolean(&mut self, what: &str) -> Result<bool> {
        let (n, line) = self.next(what)?;
        parse_bool(line).ok_or_else(|| self.error(n, format!("expected {what} flag, found '{line}'")))
    }

    pub(crate) fn date(&mut self, what: &str, calendar: Calendar) -> Result<SimDate> {
        let (n, line) = self.next(what)?;
        SimDate::parse(line, calendar).map_err(|e| self.error(n, format!("{what}: {e}")))
    }

    pub(crate) fn granularity(&mut self) -> Result<Granularity> {
        let (n, line) = self.next("period granularity")?;
        line.parse::<usize>()
            .ok()
            .and_then(Granularity::from_period_count)
            .ok_or_else(|| self.error(n, format!("granularity must be 1, 4 or 12, found '{line}'")))
    }

    pub(crate) fn calendar(&mut self) -> Result<Calendar> {
        let (n, line) = self.next("year length")?;
        line.parse::<u32>()
            .ok()
            .and_then(Calendar::from_year_length)
            .ok_or_else(|| self.error(n, format!("year length must be 366, 365 or 360, found '{line}'")))
    }

    pub(crate) fn transform(&mut self) -> Result<TransformKind> {
        let (n, line) = self.next("transform code")?;
        line.parse::<u8>()
            .ok()
            .and_then(TransformKind::from_code)
            .ok_or_else(|| self.error(n, format!("unknown transform code '{line}'")))
    }

    /// Split the next line on tabs (or runs of whitespace) into floats.
    pub(crate) fn floats(&mut self, what: &str) -> Result<(usize, Vec<f64>)> {
        let (n, line) = self.next(what)?;
        let values = parse_floats(line).map_err(|field| {
            self.error(n, format!("{what}: '{field}' is not a number"))
        })?;
        Ok((n, values))
    }
}

/// Parse whitespace-separated floats, returning the offending field on error.
pub(crate) fn parse_floats(line: &str) -> std::result::Result<Vec<f64>, String> {
    line.split_whitespace()
        .map(|f| f.parse::<f64>().map_err(|_| f.to_string()))
        .collect()
}
