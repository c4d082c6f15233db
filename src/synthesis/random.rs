//! Per-member random streams.

use crate::core::SeedMode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random stream owned by one ensemble member.
#[derive(Debug, Clone)]
pub struct MemberRng {
    rng: StdRng,
}

impl MemberRng {
    /// Stream for `member`; fixed seeds are offset by the member index so
    /// members are independent but reproducible.
    pub fn new(seed: SeedMode, member: usize) -> Self {
        let rng = match seed {
            SeedMode::Fixed(seed) => StdRng::seed_from_u64(seed.wrapping_add(member as u64)),
            SeedMode::Entropy => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Uniform draw on `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// `(Σ_{i=1..n} Uᵢ − n/2)·scale`.
    ///
    /// The sum of `n` uniforms has variance `n/12`, so `n = 12` gives a
    /// residual with standard deviation `scale`.
    pub fn residual(&mut self, n: u32, scale: f64) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = (0..n).map(|_| self.uniform()).sum();
        (sum - f64::from(n) / 2.0) * scale
    }
}
