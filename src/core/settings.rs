//! Run-wide settings supplied by the caller.

use crate::core::calendar::Calendar;
use crate::error::{DownscaleError, Result};

/// Source of randomness for the weather generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Reproducible output from a fixed seed.
    Fixed(u64),
    /// Seeded from the operating system; output differs between runs.
    #[default]
    Entropy,
}

/// How the occurrence model turns a probability into a wet/dry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccurrenceMode {
    /// Wet when a uniform draw is at or below the probability.
    #[default]
    Stochastic,
    /// Wet when the probability reaches the fixed conditional threshold.
    Fixed,
}

/// Immutable settings shared by calibration and synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Sentinel marking missing values in every series.
    pub missing_value: f64,
    /// Event threshold separating dry from wet days.
    pub threshold: f64,
    /// Calendar convention of all series.
    pub calendar: Calendar,
    /// Whether unconditional output may go below zero.
    pub allow_negative: bool,
    /// Random seed policy.
    pub seed: SeedMode,
    /// Number of uniform draws summed per residual.
    pub variance_inflation: u32,
    /// Multiplicative bias correction for conditional amounts.
    pub bias_correction: f64,
    /// Probability threshold used by [`OccurrenceMode::Fixed`].
    pub conditional_threshold: f64,
    /// Occurrence decision rule.
    pub occurrence_mode: OccurrenceMode,
    /// Per-month profile values; persisted in manifests only.
    pub monthly_profile: [f64; 12],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missing_value: -999.0,
            threshold: 0.0,
            calendar: Calendar::Gregorian,
            allow_negative: true,
            seed: SeedMode::Entropy,
            variance_inflation: 12,
            bias_correction: 1.0,
            conditional_threshold: 0.5,
            occurrence_mode: OccurrenceMode::Stochastic,
            monthly_profile: [1.0; 12],
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = missing_value;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_allow_negative(mut self, allow_negative: bool) -> Self {
        self.allow_negative = allow_negative;
        self
    }

    /// Use a fixed seed for reproducible synthesis.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = SeedMode::Fixed(seed);
        self
    }

    pub fn with_seed_mode(mut self, seed: SeedMode) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_variance_inflation(mut self, n: u32) -> Self {
        self.variance_inflation = n;
        self
    }

    pub fn with_bias_correction(mut self, bias: f64) -> Self {
        self.bias_correction = bias;
        self
    }

    pub fn with_conditional_threshold(mut self, threshold: f64) -> Self {
        self.conditional_threshold = threshold;
        self
    }

    pub fn with_occurrence_mode(mut self, mode: OccurrenceMode) -> Self {
        self.occurrence_mode = mode;
        self
    }

    pub fn with_monthly_profile(mut self, profile: [f64; 12]) -> Self {
        self.monthly_profile = profile;
        self
    }

    /// True if `value` is the missing sentinel (or not a number).
    pub fn is_missing(&self, value: f64) -> bool {
        value.is_nan() || value == self.missing_value
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.missing_value.is_finite() {
            return Err(DownscaleError::Validation(
                "missing-value sentinel must be finite".into(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(DownscaleError::Validation("event threshold must be finite".into()));
        }
        if !self.bias_correction.is_finite() || self.bias_correction <= 0.0 {
            return Err(DownscaleError::Validation(
                "bias correction must be a positive number".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.conditional_threshold) {
            return Err(DownscaleError::Validation(
                "conditional threshold must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.missing_value, -999.0);
        assert_eq!(s.variance_inflation, 12);
        assert_eq!(s.seed, SeedMode::Entropy);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn builders() {
        let s = Settings::new()
            .with_missing_value(-99.0)
            .with_threshold(0.3)
            .with_calendar(Calendar::Days360)
            .with_seed(7)
            .with_occurrence_mode(OccurrenceMode::Fixed);
        assert_eq!(s.missing_value, -99.0);
        assert_eq!(s.threshold, 0.3);
        assert_eq!(s.calendar, Calendar::Days360);
        assert_eq!(s.seed, SeedMode::Fixed(7));
        assert_eq!(s.occurrence_mode, OccurrenceMode::Fixed);
    }

    #[test]
    fn missing_detection() {
        let s = Settings::default();
        assert!(s.is_missing(-999.0));
        assert!(s.is_missing(f64::NAN));
        assert!(!s.is_missing(0.0));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::new().with_bias_correction(0.0).validate().is_err());
        assert!(Settings::new().with_conditional_threshold(1.5).validate().is_err());
        assert!(Settings::new().with_threshold(f64::NAN).validate().is_err());
    }
}
