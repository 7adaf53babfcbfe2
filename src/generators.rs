//! Seeded synthetic data generators.
//!
//! Used by the test suites to produce reproducible GARCH-type return
//! paths and GPD samples. All generators take an explicit seed and use
//! ChaCha8 so that a failing case can be replayed exactly.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Parameters of a first-order GJR-GARCH data generating process.
/// `gamma = 0` reduces it to plain GARCH(1,1).
#[derive(Debug, Clone, Copy)]
pub struct GarchProcess {
    /// Constant mean
    pub mu: f64,
    /// Variance intercept, > 0
    pub omega: f64,
    /// Squared-shock coefficient
    pub alpha: f64,
    /// Extra coefficient on squared negative shocks
    pub gamma: f64,
    /// Lagged-variance coefficient
    pub beta: f64,
}

impl GarchProcess {
    /// Unconditional variance of the process, used to seed the
    /// recursion at its stationary level.
    fn unconditional_variance(&self) -> f64 {
        let persistence = self.alpha + 0.5 * self.gamma + self.beta;
        if persistence < 1.0 {
            self.omega / (1.0 - persistence)
        } else {
            self.omega
        }
    }
}

/// Simulate `n` returns from the process with Gaussian innovations.
/// A burn-in of 200 steps is discarded so the path starts from the
/// stationary distribution rather than the initial variance.
pub fn simulate_garch(process: &GarchProcess, n: usize, seed: u64) -> Vec<f64> {
    const BURN_IN: usize = 200;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut variance = process.unconditional_variance().max(1e-12);
    let mut prev_eps = 0.0;
    let mut prev_var = variance;
    let mut out = Vec::with_capacity(n);

    for step in 0..n + BURN_IN {
        if step > 0 {
            let indicator = if prev_eps < 0.0 { 1.0 } else { 0.0 };
            variance = process.omega
                + (process.alpha + process.gamma * indicator) * prev_eps * prev_eps
                + process.beta * prev_var;
            variance = variance.max(1e-12);
        }
        let z: f64 = StandardNormal.sample(&mut rng);
        let eps = variance.sqrt() * z;
        if step >= BURN_IN {
            out.push(process.mu + eps);
        }
        prev_eps = eps;
        prev_var = variance;
    }
    out
}

/// Draw `n` GPD(ξ, β) samples by inverse transform:
/// x = (β/ξ) * ((1 - U)^(-ξ) - 1), with the exponential limit at ξ = 0.
pub fn sample_gpd(xi: f64, beta: f64, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u: f64 = rand::Rng::gen_range(&mut rng, 0.0..1.0);
            if xi.abs() < 1e-12 {
                -beta * (1.0 - u).ln()
            } else {
                (beta / xi) * ((1.0 - u).powf(-xi) - 1.0)
            }
        })
        .collect()
}

/// Draw `n` standard normal samples.
pub fn sample_standard_normal(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| StandardNormal.sample(&mut rng)).collect()
}
