//! Synthesis manifest: the settings actually used for one synthesis run.

use crate::core::{Calendar, Granularity, SimDate};
use crate::error::{DownscaleError, Result};
use crate::io::text::{format_bool, LineCursor};
use crate::transform::TransformKind;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Companion record written next to a synthesis output file.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisManifest {
    pub granularity: Granularity,
    pub calendar: Calendar,
    pub start: SimDate,
    pub length: usize,
    pub conditional: bool,
    pub ensemble_size: usize,
    pub variance_inflation: u32,
    pub transform: TransformKind,
    pub bias_correction: f64,
    pub parameter_file: String,
    pub output_file: String,
    pub predictor_files: Vec<String>,
    pub monthly_profile: [f64; 12],
}

impl SynthesisManifest {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.predictor_files.len());
        let _ = writeln!(out, "{}", self.granularity.period_count());
        let _ = writeln!(out, "{}", self.calendar.year_length());
        let _ = writeln!(out, "{}", self.start);
        let _ = writeln!(out, "{}", self.length);
        let _ = writeln!(out, "{}", format_bool(self.conditional));
        let _ = writeln!(out, "{}", self.ensemble_size);
        let _ = writeln!(out, "{}", self.variance_inflation);
        let _ = writeln!(out, "{}", self.transform.code());
        let _ = writeln!(out, "{}", self.bias_correction);
        let _ = writeln!(out, "{}", self.parameter_file);
        let _ = writeln!(out, "{}", self.output_file);
        for name in &self.predictor_files {
            let _ = writeln!(out, "{name}");
        }
        let profile: Vec<String> = self.monthly_profile.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "{}", profile.join("\t"));
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_text()).map_err(|e| DownscaleError::io(path, e))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DownscaleError::io(path, e))?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut lines = LineCursor::new(text, path);
        let k = lines.parse::<usize>("predictor count")?;
        let granularity = lines.granularity()?;
        let calendar = lines.calendar()?;
        let start = lines.date("synthesis start", calendar)?;
        let length = lines.parse::<usize>("synthesis length")?;
        let conditional = lines.boolean("conditional")?;
        let ensemble_size = lines.parse::<usize>("ensemble size")?;
        let variance_inflation = lines.parse::<u32>("variance inflation")?;
        let transform = lines.transform()?;
        let bias_correction = lines.parse::<f64>("bias correction")?;
        let parameter_file = lines.next("parameter filename")?.1.to_string();
        let output_file = lines.next("output filename")?.1.to_string();
        let predictor_files = (0..k)
            .map(|j| {
                lines
                    .next(&format!("predictor filename {}", j + 1))
                    .map(|(_, l)| l.to_string())
            })
            .collect::<Result<Vec<_>>>()?;
        let (n, values) = lines.floats("monthly profile")?;
        let monthly_profile: [f64; 12] = values.try_into().map_err(|v: Vec<f64>| {
            lines.error(n, format!("monthly profile has {} values, expected 12", v.len()))
        })?;
        Ok(Self {
            granularity,
            calendar,
            start,
            length,
            conditional,
            ensemble_size,
            variance_inflation,
            transform,
            bias_correction,
            parameter_file,
            output_file,
            predictor_files,
            monthly_profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> SynthesisManifest {
        let mut profile = [1.0; 12];
        profile[6] = 1.25;
        SynthesisManifest {
            granularity: Granularity::Monthly,
            calendar: Calendar::NoLeap,
            start: SimDate::new(2041, 1, 1, Calendar::NoLeap).unwrap(),
            length: 365,
            conditional: true,
            ensemble_size: 10,
            variance_inflation: 12,
            transform: TransformKind::FourthRoot,
            bias_correction: 0.95,
            parameter_file: "rain.par".into(),
            output_file: "rain.out".into(),
            predictor_files: vec!["a.dat".into(), "b.dat".into()],
            monthly_profile: profile,
        }
    }

    #[test]
    fn layout_and_parse() {
        let text = manifest().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "12");
        assert_eq!(lines[2], "365");
        assert_eq!(lines[3], "01/01/2041");
        assert_eq!(lines[8], "2");
        assert_eq!(lines[9], "0.95");
        assert_eq!(lines[13], "b.dat");
        assert_eq!(lines[14].split('\t').count(), 12);
        assert_eq!(
            SynthesisManifest::parse(&text, Path::new("m.sim")).unwrap(),
            manifest()
        );
    }

    #[test]
    fn short_profile_is_rejected() {
        let text = manifest().to_text().replace("1\t1.25\t", "1.25\t");
        assert!(matches!(
            SynthesisManifest::parse(&text, Path::new("m.sim")),
            Err(DownscaleError::FileFormat { line: 15, .. })
        ));
    }
}
