//! Predictor screening: correlation of the predictand with each predictor.

use crate::calibration::segment::PeriodSample;
use crate::core::Period;
use crate::utils::stats::pearson;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Correlation of one predictor with the predictand in one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorScore {
    /// Predictor index.
    pub predictor: usize,
    /// Pearson correlation.
    pub correlation: f64,
    /// Two-sided p-value of the correlation.
    pub p_value: f64,
}

/// Screening results for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodScreening {
    pub period: Period,
    pub samples: usize,
    pub scores: Vec<PredictorScore>,
}

impl PeriodScreening {
    /// Predictors ordered by decreasing absolute correlation.
    pub fn ranked(&self) -> Vec<PredictorScore> {
        let mut ranked = self.scores.clone();
        ranked.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

/// Two-sided p-value of a Pearson correlation over `n` samples.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if !r.is_finite() || n < 3 {
        return f64::NAN;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}

/// Correlate the predictand with every predictor in every period.
pub fn screen_predictors(samples: &[PeriodSample]) -> Vec<PeriodScreening> {
    samples
        .iter()
        .map(|sample| {
            let n = sample.len();
            let scores = sample
                .predictors
                .iter()
                .enumerate()
                .map(|(predictor, column)| {
                    let correlation = pearson(&sample.predictand, column);
                    PredictorScore {
                        predictor,
                        correlation,
                        p_value: correlation_p_value(correlation, n),
                    }
                })
                .collect();
            PeriodScreening {
                period: sample.period,
                samples: n,
                scores,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::segment::PeriodCounts;

    #[test]
    fn p_values() {
        assert_eq!(correlation_p_value(1.0, 20), 0.0);
        assert!(correlation_p_value(0.0, 20) > 0.99);
        assert!(correlation_p_value(0.8, 50) < 1e-6);
        assert!(correlation_p_value(0.5, 2).is_nan());
    }

    #[test]
    fn screening_ranks_by_strength() {
        let y: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let strong: Vec<f64> = y.iter().map(|v| -2.0 * v).collect();
        let weak: Vec<f64> = (0..50).map(|i| ((i * 13) % 7) as f64 + i as f64 * 0.05).collect();
        let sample = PeriodSample {
            period: Period::Annual,
            counts: PeriodCounts::default(),
            predictand: y,
            predictors: vec![weak, strong],
            lag: None,
            day_offset: (1..=50).map(f64::from).collect(),
        };
        let screening = screen_predictors(&[sample]);
        assert_eq!(screening[0].samples, 50);
        let ranked = screening[0].ranked();
        assert_eq!(ranked[0].predictor, 1);
        assert!((ranked[0].correlation + 1.0).abs() < 1e-12);
    }
}
