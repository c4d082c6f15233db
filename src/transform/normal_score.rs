//! Rank-based inverse-normal (normal score) transform.
//!
//! Each value is replaced by the standard-normal z-score of its plotting
//! position `i/(n+1)`. The z-scores come from a cumulative integration of
//! the normal density on a fixed grid, and the sorted sample is kept so
//! z-scores can be mapped back to the original scale.

use crate::error::{DownscaleError, Result};
use crate::utils::stats::{normal_pdf, quantile_normal};

/// Integration step of the normal grid.
pub const GRID_STEP: f64 = 1e-3;

/// Grid bounds never start above this z-score.
const MIN_LOWER_BOUND: f64 = -5.0;

/// Cumulative normal probabilities on an evenly spaced z grid.
#[derive(Debug, Clone, PartialEq)]
struct NormalGrid {
    lower: f64,
    step: f64,
    cdf: Vec<f64>,
}

impl NormalGrid {
    /// Integrate the density from `lower` to `-lower` with the trapezoid rule.
    ///
    /// The mass below `lower` is seeded with the Mills-ratio tail estimate.
    fn new(lower: f64, step: f64) -> Self {
        let points = ((-2.0 * lower) / step).round() as usize + 1;
        let mut cdf = Vec::with_capacity(points);
        let mut acc = normal_pdf(lower) / lower.abs();
        let mut prev = normal_pdf(lower);
        cdf.push(acc);
        for i in 1..points {
            let z = lower + step * i as f64;
            let density = normal_pdf(z);
            acc += 0.5 * (prev + density) * step;
            prev = density;
            cdf.push(acc);
        }
        Self { lower, step, cdf }
    }

    fn upper(&self) -> f64 {
        self.lower + self.step * (self.cdf.len() - 1) as f64
    }

    /// z-score whose cumulative probability is `q`.
    fn z_for(&self, q: f64) -> f64 {
        let last = self.cdf.len() - 1;
        if q <= self.cdf[0] {
            return self.lower;
        }
        if q >= self.cdf[last] {
            return self.upper();
        }
        let hi = self.cdf.partition_point(|&c| c < q);
        let lo = hi - 1;
        let frac = (q - self.cdf[lo]) / (self.cdf[hi] - self.cdf[lo]);
        self.lower + self.step * (lo as f64 + frac)
    }

    /// Cumulative probability at `z`.
    fn q_for(&self, z: f64) -> f64 {
        let last = self.cdf.len() - 1;
        let pos = (z - self.lower) / self.step;
        if pos.is_nan() || pos <= 0.0 {
            return self.cdf[0];
        }
        if pos >= last as f64 {
            return self.cdf[last];
        }
        let lo = pos.floor() as usize;
        let frac = pos - lo as f64;
        self.cdf[lo] + (self.cdf[lo + 1] - self.cdf[lo]) * frac
    }
}

/// Sorted sample plus the integration bounds used to produce its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTable {
    sorted: Vec<f64>,
    grid: NormalGrid,
}

impl RankTable {
    /// Rebuild a table from persisted parts.
    pub fn new(mut sorted: Vec<f64>, lower: f64, step: f64) -> Result<Self> {
        if sorted.is_empty() {
            return Err(DownscaleError::Transform("rank table is empty".into()));
        }
        if !lower.is_finite() || lower >= 0.0 || !step.is_finite() || step <= 0.0 {
            return Err(DownscaleError::Transform(format!(
                "invalid integration bounds: lower {lower}, step {step}"
            )));
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        Ok(Self {
            sorted,
            grid: NormalGrid::new(lower, step),
        })
    }

    /// Build the table for a sample, choosing the lower bound from the
    /// smallest plotting position.
    pub fn from_sample(values: &[f64]) -> Result<Self> {
        let sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Err(DownscaleError::insufficient("inverse-normal transform", 1, 0));
        }
        let q_min = 1.0 / (sorted.len() + 1) as f64;
        let lower = (quantile_normal(q_min) - 1.0).min(MIN_LOWER_BOUND);
        Self::new(sorted, lower, GRID_STEP)
    }

    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }

    pub fn lower(&self) -> f64 {
        self.grid.lower
    }

    pub fn step(&self) -> f64 {
        self.grid.step
    }

    fn n(&self) -> usize {
        self.sorted.len()
    }

    /// Scores for the sample the table was built from, in input order.
    ///
    /// Rank `i` (1-based, ties broken by position) maps to `i/(n+1)`.
    pub fn scores(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let mut z = vec![0.0; n];
        for (rank0, &idx) in order.iter().enumerate() {
            let q = (rank0 + 1) as f64 / (n + 1) as f64;
            z[idx] = self.grid.z_for(q);
        }
        z
    }

    /// Score of an arbitrary value via its interpolated rank.
    pub fn forward(&self, y: f64) -> f64 {
        let n = self.n();
        let s = &self.sorted;
        let pos = if y <= s[0] {
            1.0
        } else if y >= s[n - 1] {
            n as f64
        } else {
            let hi = s.partition_point(|&v| v < y);
            let lo = hi - 1;
            let span = s[hi] - s[lo];
            let frac = if span > 0.0 { (y - s[lo]) / span } else { 0.0 };
            (lo + 1) as f64 + frac
        };
        self.grid.z_for(pos / (n + 1) as f64)
    }

    /// Map a z-score back to the original scale.
    ///
    /// Positions outside the table are clamped to its smallest and largest
    /// values.
    pub fn inverse(&self, z: f64) -> f64 {
        if !z.is_finite() {
            return f64::NAN;
        }
        let n = self.n();
        let q = self.grid.q_for(z);
        let pos = (q * (n + 1) as f64).clamp(1.0, n as f64) - 1.0;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = pos - lo as f64;
        self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_matches_known_probabilities() {
        let grid = NormalGrid::new(-6.0, GRID_STEP);
        assert_relative_eq!(grid.q_for(0.0), 0.5, epsilon = 1e-6);
        assert_relative_eq!(grid.q_for(1.96), 0.975, epsilon = 1e-4);
        assert_relative_eq!(grid.z_for(0.025), -1.96, epsilon = 1e-3);
        assert_relative_eq!(grid.z_for(grid.q_for(0.731)), 0.731, epsilon = 1e-9);
    }

    #[test]
    fn scores_are_symmetric_and_ordered() {
        let values = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        let table = RankTable::from_sample(&values).unwrap();
        let z = table.scores(&values);
        assert!(z[1] < z[3] && z[3] < z[4] && z[4] < z[2] && z[2] < z[0]);
        assert_relative_eq!(z[4], 0.0, epsilon = 1e-6);
        assert_relative_eq!(z[1], -z[0], epsilon = 1e-6);
    }

    #[test]
    fn inverse_recovers_sample() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 * 0.7 + 0.2).collect();
        let table = RankTable::from_sample(&values).unwrap();
        for (&z, &y) in table.scores(&values).iter().zip(&values) {
            assert_relative_eq!(table.inverse(z), y, epsilon = 1e-6);
        }
    }

    #[test]
    fn forward_of_table_values_matches_scores() {
        let values = vec![0.5, 1.5, 2.5, 10.0];
        let table = RankTable::from_sample(&values).unwrap();
        let z = table.scores(&values);
        for (&y, &zy) in values.iter().zip(&z) {
            assert_relative_eq!(table.forward(y), zy, epsilon = 1e-9);
        }
    }

    #[test]
    fn inverse_clamps_to_table_ends() {
        let table = RankTable::from_sample(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(table.inverse(-20.0), 1.0);
        assert_eq!(table.inverse(20.0), 3.0);
        assert!(table.inverse(f64::NAN).is_nan());
    }

    #[test]
    fn rebuilt_table_is_identical() {
        let table = RankTable::from_sample(&[4.0, 8.0, 1.0]).unwrap();
        let rebuilt =
            RankTable::new(table.sorted().to_vec(), table.lower(), table.step()).unwrap();
        assert_eq!(table, rebuilt);
    }

    #[test]
    fn empty_sample_is_rejected() {
        assert!(RankTable::from_sample(&[]).is_err());
        assert!(RankTable::new(vec![1.0], 1.0, GRID_STEP).is_err());
    }
}
