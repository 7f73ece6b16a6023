//! # Portfolio Engine
//!
//! $$
//! P \to r \to (\mu, \Sigma) \to \{\text{scatter},\ \sigma^\*(r)\}
//! $$
//!
//! High-level orchestration from price series to the result tables.

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;

use super::data::ReturnMatrix;
use super::frontier::target_returns;
use super::frontier::FrontierOptimizer;
use super::monte_carlo::MonteCarloSimulator;
use super::optimizers::SolverConfig;
use super::stats::StatisticsEngine;
use super::stats::TRADING_DAYS_PER_YEAR;
use super::types::FrontierReport;
use super::types::PriceSeries;
use crate::error::PortfolioResult;
use crate::traits::MomentsExt;
use crate::traits::PriceSourceExt;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioEngineConfig {
  /// Annualization factor for daily statistics.
  pub trading_days: f64,
  /// Number of Monte Carlo portfolios.
  pub n_trials: usize,
  /// Number of frontier targets.
  pub n_frontier_points: usize,
  /// Seed for the Monte Carlo draws.
  pub seed: Option<u64>,
  /// Run trials and frontier targets on the rayon pool.
  pub parallel: bool,
  /// Active-set limits.
  pub solver: SolverConfig,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      trading_days: TRADING_DAYS_PER_YEAR,
      n_trials: 2000,
      n_frontier_points: 50,
      seed: None,
      parallel: false,
      solver: SolverConfig::default(),
    }
  }
}

/// Single entry-point engine for a frontier run.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  pub fn simulator(&self) -> MonteCarloSimulator {
    MonteCarloSimulator::new(self.config.n_trials, self.config.seed, self.config.parallel)
  }

  pub fn optimizer(&self) -> FrontierOptimizer {
    FrontierOptimizer::new(self.config.solver, self.config.parallel)
  }

  /// Fetch prices from `source` and run.
  pub fn run_from_source<S: PriceSourceExt>(
    &self,
    source: &S,
    assets: &[String],
    start: Option<NaiveDate>,
  ) -> anyhow::Result<FrontierReport> {
    let prices = source
      .fetch_prices(assets, start)
      .context("failed to fetch price history")?;
    info!(requested = assets.len(), retrieved = prices.len(), "fetched price history");
    Ok(self.run(&prices)?)
  }

  /// Clean and align prices, then run on the resulting returns.
  pub fn run(&self, prices: &[PriceSeries]) -> PortfolioResult<FrontierReport> {
    let (returns, dropped) = ReturnMatrix::from_prices(prices)?;
    let mut report = self.run_returns(&returns)?;
    report.dropped = dropped;
    Ok(report)
  }

  /// Estimate moments and run.
  pub fn run_returns(&self, returns: &ReturnMatrix) -> PortfolioResult<FrontierReport> {
    let stats = StatisticsEngine::new(self.config.trading_days).estimate(returns)?;
    Ok(self.run_stats(&stats))
  }

  /// Simulate the scatter, then solve the frontier over its return range.
  pub fn run_stats<M: MomentsExt>(&self, stats: &M) -> FrontierReport {
    let simulator = self.simulator();
    let optimizer = self.optimizer();

    let (simulated, min_volatility) = if self.config.parallel {
      rayon::join(
        || simulator.simulate(stats),
        || optimizer.global_min_volatility(stats),
      )
    } else {
      (
        simulator.simulate(stats),
        optimizer.global_min_volatility(stats),
      )
    };

    let targets = target_returns(&simulated, self.config.n_frontier_points);
    let frontier = optimizer.frontier(stats, &targets);

    let report = FrontierReport {
      assets: stats.assets().to_vec(),
      dropped: Vec::new(),
      simulated_portfolios: simulated,
      efficient_frontier: frontier.points,
      optimal_weights: frontier.allocations,
      min_volatility: min_volatility.ok(),
    };

    info!(
      assets = report.assets.len(),
      simulated = report.simulated_portfolios.len(),
      targets = report.efficient_frontier.len(),
      converged = report.converged_targets(),
      "portfolio run complete"
    );

    report
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use anyhow::Result;
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::error::PortfolioError;

  fn synthetic_prices() -> Vec<PriceSeries> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    // Deterministic wiggles with distinct drifts.
    let assets = [("AAA", 0.0006, 0.011), ("BBB", 0.0003, 0.007), ("CCC", 0.0009, 0.017)];

    assets
      .iter()
      .enumerate()
      .map(|(k, (name, drift, amp))| {
        let mut price = 100.0;
        let obs = (0..260)
          .map(|t| {
            let date = start + chrono::Duration::days(t);
            let shock = amp * ((t as f64) * (0.7 + k as f64 * 0.31)).sin();
            price *= (drift + shock).exp();
            (date, price)
          })
          .collect();
        PriceSeries::new(*name, obs).unwrap()
      })
      .collect()
  }

  struct MapSource(HashMap<String, PriceSeries>);

  impl PriceSourceExt for MapSource {
    fn fetch_prices(&self, assets: &[String], _start: Option<NaiveDate>) -> Result<Vec<PriceSeries>> {
      Ok(assets.iter().filter_map(|a| self.0.get(a).cloned()).collect())
    }
  }

  #[test]
  #[traced_test]
  fn engine_produces_three_tables() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      seed: Some(42),
      ..PortfolioEngineConfig::default()
    });

    let report = engine.run(&synthetic_prices()).unwrap();

    assert_eq!(report.assets, vec!["AAA", "BBB", "CCC"]);
    assert!(report.dropped.is_empty());
    assert_eq!(report.simulated_portfolios.len(), 2000);
    assert_eq!(report.efficient_frontier.len(), 50);
    assert_eq!(report.optimal_weights.len(), report.converged_targets() * 3);
    assert!(report.converged_targets() > 0);
    assert!(report.min_volatility.is_some());

    let simulated_min = report
      .simulated_portfolios
      .iter()
      .map(|p| p.expected_return)
      .fold(f64::INFINITY, f64::min);
    assert_eq!(report.efficient_frontier[0].target_return, simulated_min);
    assert!(logs_contain("portfolio run complete"));
  }

  #[test]
  fn parallel_run_matches_sequential_run() {
    let sequential = PortfolioEngine::new(PortfolioEngineConfig {
      seed: Some(5),
      n_trials: 500,
      ..PortfolioEngineConfig::default()
    })
    .run(&synthetic_prices())
    .unwrap();
    let parallel = PortfolioEngine::new(PortfolioEngineConfig {
      seed: Some(5),
      n_trials: 500,
      parallel: true,
      ..PortfolioEngineConfig::default()
    })
    .run(&synthetic_prices())
    .unwrap();

    assert_eq!(sequential.simulated_portfolios, parallel.simulated_portfolios);
    assert_eq!(sequential.efficient_frontier, parallel.efficient_frontier);
    assert_eq!(sequential.optimal_weights, parallel.optimal_weights);
  }

  #[test]
  fn missing_assets_are_absent_not_fatal() -> Result<()> {
    let source = MapSource(
      synthetic_prices()
        .into_iter()
        .map(|s| (s.asset().to_string(), s))
        .collect(),
    );
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      seed: Some(1),
      n_trials: 200,
      n_frontier_points: 10,
      ..PortfolioEngineConfig::default()
    });

    let assets = vec!["CCC".to_string(), "ZZZ".to_string(), "AAA".to_string()];
    let report = engine.run_from_source(&source, &assets, None)?;

    assert_eq!(report.assets, vec!["CCC", "AAA"]);
    assert_eq!(report.efficient_frontier.len(), 10);
    Ok(())
  }

  #[test]
  fn empty_universe_aborts_the_run() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig::default());
    assert_eq!(engine.run(&[]).unwrap_err(), PortfolioError::EmptyUniverse);
  }

  #[test]
  fn min_volatility_is_below_every_simulated_point() {
    let report = PortfolioEngine::new(PortfolioEngineConfig {
      seed: Some(9),
      n_trials: 1000,
      ..PortfolioEngineConfig::default()
    })
    .run(&synthetic_prices())
    .unwrap();

    let gmv = report.min_volatility.unwrap();
    assert_abs_diff_eq!(gmv.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    for p in &report.simulated_portfolios {
      assert!(gmv.volatility <= p.volatility + 1e-7);
    }
  }
}
