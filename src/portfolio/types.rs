//! # Portfolio Types
//!
//! $$
//! \mathbf{w} \ge 0,\quad \mathbf{1}^\top \mathbf{w} = 1
//! $$
//!
//! Value types shared by the simulator, the optimizer and the output tables.

use std::fmt::Display;
use std::ops::Deref;

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::PortfolioResult;

/// Tolerance on `sum(w) = 1` and on the `[0, 1]` bounds.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Closing prices of one asset, dates strictly increasing.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
  asset: String,
  observations: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
  /// Build a series, rejecting non-increasing dates.
  pub fn new(
    asset: impl Into<String>,
    observations: Vec<(NaiveDate, f64)>,
  ) -> PortfolioResult<Self> {
    let asset = asset.into();

    for pair in observations.windows(2) {
      if pair[1].0 <= pair[0].0 {
        return Err(PortfolioError::UnorderedSeries {
          asset,
          date: pair[1].0,
        });
      }
    }

    Ok(Self {
      asset,
      observations,
    })
  }

  pub fn asset(&self) -> &str {
    &self.asset
  }

  pub fn observations(&self) -> &[(NaiveDate, f64)] {
    &self.observations
  }

  pub fn len(&self) -> usize {
    self.observations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.observations.is_empty()
  }
}

/// Long-only, fully-invested weights.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
  /// Validate non-negativity, upper bound and `sum = 1` within [`WEIGHT_TOLERANCE`].
  pub fn new(weights: Vec<f64>) -> PortfolioResult<Self> {
    if weights.is_empty() {
      return Err(PortfolioError::InvalidWeights("empty weight vector".into()));
    }

    if let Some(w) = weights
      .iter()
      .find(|w| !w.is_finite() || **w < -WEIGHT_TOLERANCE || **w > 1.0 + WEIGHT_TOLERANCE)
    {
      return Err(PortfolioError::InvalidWeights(format!(
        "weight {w} outside [0, 1]"
      )));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
      return Err(PortfolioError::InvalidWeights(format!(
        "weights sum to {sum}"
      )));
    }

    Ok(Self(weights))
  }

  /// Normalize non-negative raw values by their sum.
  pub fn normalized(raw: Vec<f64>) -> PortfolioResult<Self> {
    let sum: f64 = raw.iter().sum();
    if !(sum > 0.0) {
      return Err(PortfolioError::InvalidWeights(format!(
        "cannot normalize values summing to {sum}"
      )));
    }
    Self::new(raw.into_iter().map(|x| x / sum).collect())
  }

  /// `1/n` for every asset.
  pub fn equal(n: usize) -> PortfolioResult<Self> {
    Self::new(vec![1.0 / n as f64; n])
  }

  pub fn into_inner(self) -> Vec<f64> {
    self.0
  }
}

impl Deref for WeightVector {
  type Target = [f64];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

/// One Monte Carlo draw; the weights are not kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedPortfolio {
  pub expected_return: f64,
  pub volatility: f64,
}

/// Reason a frontier target produced no portfolio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveFailure {
  /// No long-only fully-invested portfolio reaches the target.
  TargetOutOfRange,
  /// Active-set iterations exhausted.
  IterationLimit,
  /// Solution drifted off the constraints or became non-finite.
  Numerical,
}

impl Display for SolveFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SolveFailure::TargetOutOfRange => write!(f, "target return out of range"),
      SolveFailure::IterationLimit => write!(f, "iteration limit reached"),
      SolveFailure::Numerical => write!(f, "numerical breakdown"),
    }
  }
}

/// A solved minimum-volatility portfolio.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizedPortfolio {
  pub weights: WeightVector,
  /// `w · mean`, recomputed from the weights.
  pub expected_return: f64,
  /// `sqrt(w' Σ w)`, recomputed from the weights.
  pub volatility: f64,
  /// Active-set iterations used.
  pub iterations: usize,
}

/// Row of the `efficient_frontier` table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontierPoint {
  pub target_return: f64,
  /// `None` when the target did not converge.
  pub efficient_volatility: Option<f64>,
  pub failure: Option<SolveFailure>,
}

/// Row of the `optimal_weights` table.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationRecord {
  pub target_return: f64,
  pub asset: String,
  pub weight: f64,
}

/// Asset removed before statistics were computed.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedAsset {
  pub asset: String,
  pub reason: String,
}

/// Everything a run produces.
#[derive(Clone, Debug, Default)]
pub struct FrontierReport {
  /// Assets that entered the statistics, in column order.
  pub assets: Vec<String>,
  pub dropped: Vec<DroppedAsset>,
  pub simulated_portfolios: Vec<SimulatedPortfolio>,
  pub efficient_frontier: Vec<FrontierPoint>,
  pub optimal_weights: Vec<AllocationRecord>,
  /// Global minimum-volatility portfolio, when it converged.
  pub min_volatility: Option<OptimizedPortfolio>,
}

impl FrontierReport {
  /// Number of frontier targets that converged.
  pub fn converged_targets(&self) -> usize {
    self
      .efficient_frontier
      .iter()
      .filter(|p| p.efficient_volatility.is_some())
      .count()
  }
}
