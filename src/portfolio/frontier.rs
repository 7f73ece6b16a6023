//! # Efficient Frontier
//!
//! $$
//! \sigma^\*(r) = \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1,\ \mu^\top\mathbf{w}=r}
//! \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}
//! $$
//!
//! Minimum-volatility portfolios for a grid of target returns.

use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;
use rayon::prelude::*;
use tracing::debug;
use tracing::info;

use super::optimizers::solve_long_only;
use super::optimizers::target_in_range;
use super::optimizers::SolverConfig;
use super::types::AllocationRecord;
use super::types::FrontierPoint;
use super::types::OptimizedPortfolio;
use super::types::SimulatedPortfolio;
use super::types::SolveFailure;
use super::types::WeightVector;
use crate::traits::MomentsExt;

/// `n` evenly spaced values over `[min, max]`; both ends are exact.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![min],
    _ => {
      let step = (max - min) / (n - 1) as f64;
      (0..n)
        .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
        .collect()
    }
  }
}

/// Targets spanning the simulated return range.
pub fn target_returns(simulated: &[SimulatedPortfolio], n_points: usize) -> Vec<f64> {
  let (min, max) = simulated
    .iter()
    .map(|p| p.expected_return)
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
      (lo.min(r), hi.max(r))
    });

  if !min.is_finite() || !max.is_finite() {
    return Vec::new();
  }
  linspace(min, max, n_points)
}

/// `efficient_frontier` and `optimal_weights` tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontier {
  pub points: Vec<FrontierPoint>,
  pub allocations: Vec<AllocationRecord>,
}

/// Per-target minimum-volatility solver.
#[derive(Clone, Debug, Default)]
pub struct FrontierOptimizer {
  pub solver: SolverConfig,
  /// Solve targets on the rayon pool.
  pub parallel: bool,
}

impl FrontierOptimizer {
  pub fn new(solver: SolverConfig, parallel: bool) -> Self {
    Self { solver, parallel }
  }

  /// Lowest-volatility long-only portfolio whose expected return equals `target`.
  ///
  /// A target at the edge of the return range can only be met by the assets
  /// earning that extreme return, so it reduces to a budget-only solve over them.
  pub fn min_volatility_for_target<M: MomentsExt>(
    &self,
    stats: &M,
    target: f64,
  ) -> Result<OptimizedPortfolio, SolveFailure> {
    let mean = stats.mean_returns();
    let n = mean.len();
    let tolerance = self.solver.tolerance;

    if !target_in_range(mean, target, tolerance) {
      return Err(SolveFailure::TargetOutOfRange);
    }

    let slack = tolerance * (1.0 + target.abs());
    let (lo, hi) = mean
      .iter()
      .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| (lo.min(m), hi.max(m)));
    let edge = [hi, lo].into_iter().find(|e| (target - e).abs() <= slack);

    let (w, iterations) = match edge {
      Some(extreme) => {
        let held: Vec<usize> = (0..n).filter(|&i| (mean[i] - extreme).abs() <= slack).collect();
        self.min_variance_over(stats.covariance(), &held)?
      }
      None => {
        let a = Array2::from_shape_fn((2, n), |(r, c)| if r == 0 { 1.0 } else { mean[c] });
        solve_long_only(stats.covariance(), a.view(), &[1.0, target], &self.solver)?
      }
    };
    evaluate(stats, w, iterations)
  }

  /// Global minimum-volatility long-only portfolio.
  pub fn global_min_volatility<M: MomentsExt>(
    &self,
    stats: &M,
  ) -> Result<OptimizedPortfolio, SolveFailure> {
    let n = stats.n_assets();
    if n == 0 {
      return Err(SolveFailure::Numerical);
    }

    let all: Vec<usize> = (0..n).collect();
    let (w, iterations) = self.min_variance_over(stats.covariance(), &all)?;
    evaluate(stats, w, iterations)
  }

  /// Fully-invested minimum variance restricted to the `held` assets.
  fn min_variance_over(
    &self,
    cov: ArrayView2<f64>,
    held: &[usize],
  ) -> Result<(Vec<f64>, usize), SolveFailure> {
    let mut w = vec![0.0; cov.nrows()];
    match held {
      [] => return Err(SolveFailure::Numerical),
      [only] => {
        w[*only] = 1.0;
        return Ok((w, 0));
      }
      _ => {}
    }

    let sub = cov.select(Axis(0), held).select(Axis(1), held);
    let budget = Array2::from_elem((1, held.len()), 1.0);
    let (sub_w, iterations) = solve_long_only(sub.view(), budget.view(), &[1.0], &self.solver)?;
    for (&i, wi) in held.iter().zip(sub_w) {
      w[i] = wi;
    }
    Ok((w, iterations))
  }

  /// Solve every target independently and assemble the frontier tables.
  ///
  /// Points follow `targets` order. Failed targets keep their row with an
  /// absent volatility and contribute no allocations.
  pub fn frontier<M: MomentsExt>(&self, stats: &M, targets: &[f64]) -> Frontier {
    let solve = |&target: &f64| (target, self.min_volatility_for_target(stats, target));

    let results: Vec<_> = if self.parallel {
      targets.par_iter().map(solve).collect()
    } else {
      targets.iter().map(solve).collect()
    };

    let assets = stats.assets();
    let mut frontier = Frontier {
      points: Vec::with_capacity(results.len()),
      allocations: Vec::new(),
    };

    for (target, result) in results {
      match result {
        Ok(portfolio) => {
          frontier.points.push(FrontierPoint {
            target_return: target,
            efficient_volatility: Some(portfolio.volatility),
            failure: None,
          });
          frontier
            .allocations
            .extend(assets.iter().zip(portfolio.weights.iter()).map(|(asset, &weight)| {
              AllocationRecord {
                target_return: target,
                asset: asset.clone(),
                weight,
              }
            }));
        }
        Err(failure) => {
          debug!(target_return = target, %failure, "frontier target did not converge");
          frontier.points.push(FrontierPoint {
            target_return: target,
            efficient_volatility: None,
            failure: Some(failure),
          });
        }
      }
    }

    info!(
      targets = targets.len(),
      converged = frontier.points.iter().filter(|p| p.efficient_volatility.is_some()).count(),
      "efficient frontier solved"
    );

    frontier
  }
}

/// Recompute return and volatility from the solved weights.
fn evaluate<M: MomentsExt>(
  stats: &M,
  w: Vec<f64>,
  iterations: usize,
) -> Result<OptimizedPortfolio, SolveFailure> {
  let weights = WeightVector::new(w).map_err(|_| SolveFailure::Numerical)?;
  Ok(OptimizedPortfolio {
    expected_return: stats.portfolio_return(&weights),
    volatility: stats.portfolio_volatility(&weights),
    weights,
    iterations,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use ndarray::Array2;

  use super::*;
  use crate::portfolio::types::WEIGHT_TOLERANCE;
  use crate::portfolio::MarketStats;
  use crate::portfolio::MonteCarloSimulator;

  fn diagonal_stats() -> MarketStats {
    MarketStats::new(
      vec!["A".into(), "B".into(), "C".into()],
      array![0.10, 0.08, 0.12],
      Array2::from_diag(&array![0.04, 0.04, 0.04]),
    )
    .unwrap()
  }

  fn correlated_stats() -> MarketStats {
    MarketStats::new(
      vec!["A".into(), "B".into(), "C".into(), "D".into()],
      array![0.12, 0.10, 0.07, 0.05],
      array![
        [0.04, 0.01, 0.0, -0.01],
        [0.01, 0.03, 0.0, 0.0],
        [0.0, 0.0, 0.02, 0.0],
        [-0.01, 0.0, 0.0, 0.01]
      ],
    )
    .unwrap()
  }

  #[test]
  fn linspace_hits_both_ends() {
    let xs = linspace(0.013, 0.291, 50);
    assert_eq!(xs.len(), 50);
    assert_eq!(xs[0], 0.013);
    assert_eq!(xs[49], 0.291);
    assert!(xs.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
    assert!(linspace(1.0, 2.0, 0).is_empty());
  }

  #[test]
  fn dominated_asset_gets_zero_weight_when_bound_binds() {
    let opt = FrontierOptimizer::default();
    let p = opt.min_volatility_for_target(&diagonal_stats(), 0.115).unwrap();

    assert_abs_diff_eq!(p.weights[0], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(p.weights[1], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(p.weights[2], 0.75, epsilon = 1e-6);
    assert_abs_diff_eq!(p.volatility, 0.025f64.sqrt(), epsilon = 1e-6);
    assert_abs_diff_eq!(p.expected_return, 0.115, epsilon = 1e-6);
  }

  #[test]
  fn equal_weight_return_converges() {
    let stats = correlated_stats();
    let target = stats.portfolio_return(&[0.25; 4]);
    let p = FrontierOptimizer::default()
      .min_volatility_for_target(&stats, target)
      .unwrap();

    assert_abs_diff_eq!(p.expected_return, target, epsilon = 1e-6);
    assert!(p.volatility <= stats.portfolio_volatility(&[0.25; 4]) + 1e-7);
  }

  #[test]
  fn global_min_volatility_converges_and_bounds_frontier() {
    let stats = correlated_stats();
    let opt = FrontierOptimizer::default();
    let gmv = opt.global_min_volatility(&stats).unwrap();

    assert_abs_diff_eq!(gmv.weights.iter().sum::<f64>(), 1.0, epsilon = WEIGHT_TOLERANCE);

    let at_gmv = opt.min_volatility_for_target(&stats, gmv.expected_return).unwrap();
    assert_abs_diff_eq!(at_gmv.volatility, gmv.volatility, epsilon = 1e-6);

    for target in linspace(0.05, 0.12, 15) {
      if let Ok(p) = opt.min_volatility_for_target(&stats, target) {
        assert!(p.volatility >= gmv.volatility - 1e-7);
      }
    }
  }

  #[test]
  fn single_asset_frontier() {
    let stats = MarketStats::new(vec!["A".into()], array![0.07], array![[0.0225]]).unwrap();
    let frontier = FrontierOptimizer::default().frontier(&stats, &[0.05, 0.07, 0.09]);

    assert_eq!(frontier.points.len(), 3);
    assert_eq!(frontier.points[0].efficient_volatility, None);
    assert_eq!(frontier.points[0].failure, Some(SolveFailure::TargetOutOfRange));
    assert_abs_diff_eq!(frontier.points[1].efficient_volatility.unwrap(), 0.15, epsilon = 1e-12);
    assert_eq!(frontier.points[2].efficient_volatility, None);

    assert_eq!(frontier.allocations.len(), 1);
    assert_eq!(frontier.allocations[0].asset, "A");
    assert_eq!(frontier.allocations[0].weight, 1.0);
    assert_eq!(frontier.allocations[0].target_return, 0.07);
  }

  #[test]
  fn frontier_over_simulated_range() {
    let stats = correlated_stats();
    let simulated = MonteCarloSimulator::new(2000, Some(3), false).simulate(&stats);
    let targets = target_returns(&simulated, 50);
    let frontier = FrontierOptimizer::default().frontier(&stats, &targets);

    assert_eq!(frontier.points.len(), 50);
    assert!(frontier
      .points
      .windows(2)
      .all(|w| w[0].target_return < w[1].target_return));

    let converged = frontier
      .points
      .iter()
      .filter(|p| p.efficient_volatility.is_some())
      .count();
    assert_eq!(converged, 50);
    assert_eq!(frontier.allocations.len(), 50 * 4);

    for chunk in frontier.allocations.chunks(4) {
      let sum: f64 = chunk.iter().map(|a| a.weight).sum();
      assert_abs_diff_eq!(sum, 1.0, epsilon = WEIGHT_TOLERANCE);
      assert!(chunk.iter().all(|a| (0.0..=1.0).contains(&a.weight)));
      assert!(chunk.iter().all(|a| a.target_return == chunk[0].target_return));

      // Volatility recomputed outside the solver matches the reported point.
      let weights: Vec<f64> = chunk.iter().map(|a| a.weight).collect();
      let point = frontier
        .points
        .iter()
        .find(|p| p.target_return == chunk[0].target_return)
        .unwrap();
      assert_abs_diff_eq!(
        stats.portfolio_volatility(&weights),
        point.efficient_volatility.unwrap(),
        epsilon = 1e-10
      );
    }

    // Frontier volatility never exceeds any simulated portfolio with the same return.
    for p in &frontier.points {
      let vol = p.efficient_volatility.unwrap();
      for s in &simulated {
        if (s.expected_return - p.target_return).abs() < 1e-12 {
          assert!(vol <= s.volatility + 1e-7);
        }
      }
    }
  }

  #[test]
  fn frontier_is_reproducible_and_mode_independent() {
    let stats = correlated_stats();
    let targets = linspace(0.04, 0.13, 20);

    let first = FrontierOptimizer::default().frontier(&stats, &targets);
    let second = FrontierOptimizer::default().frontier(&stats, &targets);
    let parallel = FrontierOptimizer::new(SolverConfig::default(), true).frontier(&stats, &targets);

    assert_eq!(first, second);
    assert_eq!(first, parallel);

    // Out-of-range ends keep their rows.
    assert_eq!(first.points.len(), 20);
    assert_eq!(first.points[0].efficient_volatility, None);
    assert_eq!(first.points[19].efficient_volatility, None);
  }

  #[test]
  fn edge_targets_hold_only_extreme_assets() {
    let stats = diagonal_stats();
    let opt = FrontierOptimizer::default();

    let top = opt.min_volatility_for_target(&stats, 0.12).unwrap();
    assert_eq!(top.weights.to_vec(), vec![0.0, 0.0, 1.0]);
    assert_eq!(top.iterations, 0);

    let tied = MarketStats::new(
      vec!["A".into(), "B".into(), "C".into()],
      array![0.10, 0.10, 0.05],
      array![[0.04, 0.0, 0.0], [0.0, 0.01, 0.0], [0.0, 0.0, 0.01]],
    )
    .unwrap();
    let p = opt.min_volatility_for_target(&tied, 0.10).unwrap();
    assert_abs_diff_eq!(p.weights[0], 0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(p.weights[1], 0.8, epsilon = 1e-6);
    assert_eq!(p.weights[2], 0.0);
  }

  #[test]
  fn uncorrelated_scenario_never_panics() {
    let stats = diagonal_stats();
    let frontier = FrontierOptimizer::default().frontier(&stats, &linspace(0.07, 0.13, 25));
    assert_eq!(frontier.points.len(), 25);
    assert!(frontier
      .points
      .iter()
      .filter(|p| p.target_return >= 0.08 && p.target_return <= 0.12)
      .all(|p| p.efficient_volatility.is_some()));
  }
}
