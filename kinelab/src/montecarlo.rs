//! Monte Carlo estimation of π.

use alloc::vec::Vec;

use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Estimates π by sampling `samples` points uniformly in the unit square and counting the
/// fraction that fall inside the quarter unit circle.
///
/// The same `seed` always produces the same estimate. Returns NaN if `samples` is zero.
pub fn estimate_pi(samples: u64, seed: u64) -> f64 {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut inside: u64 = 0;
    for _ in 0..samples {
        let x: f64 = rng.random();
        let y: f64 = rng.random();
        if x * x + y * y <= 1.0 {
            inside += 1;
        }
    }
    4.0 * inside as f64 / samples as f64
}

/// One row of [`pi_table()`].
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Debug, PartialEq)]
pub struct PiRow {
    /// Number of samples per run.
    pub samples: u64,
    /// Estimate from each run; run `i` uses seed `i`.
    pub estimates: Vec<f64>,
}

impl PiRow {
    /// Mean of the estimates.
    pub fn mean(&self) -> f64 {
        self.estimates.iter().sum::<f64>() / self.estimates.len() as f64
    }

    /// Absolute difference between the mean and π.
    pub fn error(&self) -> f64 {
        (self.mean() - core::f64::consts::PI).abs()
    }
}

/// Estimates π with `10^e` samples for each `e` in `exponents`, repeated `runs` times.
///
/// Sample counts saturate at [`u64::MAX`]; callers taking exponents from users should
/// reject those above 19.
pub fn pi_table(exponents: impl IntoIterator<Item = u32>, runs: u64) -> Vec<PiRow> {
    exponents
        .into_iter()
        .map(|exponent| {
            let samples = 10u64.saturating_pow(exponent);
            PiRow {
                samples,
                estimates: (0..runs).map(|seed| estimate_pi(samples, seed)).collect(),
            }
        })
        .collect()
}
