//! # Monte Carlo Portfolios
//!
//! $$
//! w_i = \frac{u_i}{\sum_j u_j},\quad u_i \sim \mathcal U[0,1)
//! $$
//!
//! Random long-only fully-invested portfolios scattered over the risk/return plane.

use impl_new_derive::ImplNew;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::info;

use super::types::SimulatedPortfolio;
use super::types::WeightVector;
use crate::traits::MomentsExt;

/// Mixes the trial index into the run seed.
const TRIAL_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Draw a uniform weight vector on the simplex by sum-normalization.
pub fn random_weights<R: Rng + ?Sized>(rng: &mut R, n: usize) -> WeightVector {
  loop {
    let raw: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
    if let Ok(w) = WeightVector::normalized(raw) {
      return w;
    }
  }
}

/// Monte Carlo sampler of random portfolios.
#[derive(ImplNew, Clone, Debug)]
pub struct MonteCarloSimulator {
  /// Number of portfolios to draw.
  pub n_trials: usize,
  /// Run seed; a fresh one is drawn when `None`.
  pub seed: Option<u64>,
  /// Evaluate trials on the rayon pool.
  pub parallel: bool,
}

impl Default for MonteCarloSimulator {
  fn default() -> Self {
    Self {
      n_trials: 2000,
      seed: None,
      parallel: false,
    }
  }
}

impl MonteCarloSimulator {
  /// Draw `n_trials` portfolios and evaluate their annualized return and volatility.
  ///
  /// Each trial owns a generator derived from the run seed, so the output is
  /// the same whether trials run sequentially or in parallel.
  pub fn simulate<M: MomentsExt>(&self, stats: &M) -> Vec<SimulatedPortfolio> {
    let n = stats.n_assets();
    if n == 0 {
      return Vec::new();
    }

    let seed = self.seed.unwrap_or_else(|| rand::rng().random());
    info!(trials = self.n_trials, assets = n, seed, "simulating random portfolios");

    let trial = |i: usize| {
      let mut rng = StdRng::seed_from_u64(seed ^ (i as u64).wrapping_mul(TRIAL_SEED_MIX));
      let w = random_weights(&mut rng, n);
      SimulatedPortfolio {
        expected_return: stats.portfolio_return(&w),
        volatility: stats.portfolio_volatility(&w),
      }
    };

    if self.parallel {
      (0..self.n_trials).into_par_iter().map(trial).collect()
    } else {
      (0..self.n_trials).map(trial).collect()
    }
  }
}
