//! # Statistics Engine
//!
//! $$
//! \mu = 250\,\bar r,\qquad \Sigma = \frac{250}{N-1}\sum_t (r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Annualized mean vector and unbiased sample covariance of daily log returns.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;

use super::data::ReturnMatrix;
use crate::error::PortfolioError;
use crate::error::PortfolioResult;
use crate::traits::MomentsExt;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 250.0;

/// Annualized first and second moments of asset returns.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketStats {
  assets: Vec<String>,
  mean: Array1<f64>,
  cov: Array2<f64>,
}

impl MarketStats {
  /// Wrap externally estimated moments.
  pub fn new(assets: Vec<String>, mean: Array1<f64>, cov: Array2<f64>) -> PortfolioResult<Self> {
    let n = assets.len();
    if n == 0 {
      return Err(PortfolioError::EmptyUniverse);
    }
    if mean.len() != n || cov.dim() != (n, n) {
      return Err(PortfolioError::DimensionMismatch(format!(
        "{n} assets, mean of length {}, covariance of shape {:?}",
        mean.len(),
        cov.dim()
      )));
    }
    if mean.iter().chain(cov.iter()).any(|x| !x.is_finite()) {
      return Err(PortfolioError::NonFinite("annualized moments".into()));
    }

    Ok(Self { assets, mean, cov })
  }
}

impl MomentsExt for MarketStats {
  fn assets(&self) -> &[String] {
    &self.assets
  }

  fn mean_returns(&self) -> ArrayView1<'_, f64> {
    self.mean.view()
  }

  fn covariance(&self) -> ArrayView2<'_, f64> {
    self.cov.view()
  }
}

/// Estimates [`MarketStats`] from a [`ReturnMatrix`].
#[derive(Clone, Copy, Debug)]
pub struct StatisticsEngine {
  pub trading_days: f64,
}

impl Default for StatisticsEngine {
  fn default() -> Self {
    Self {
      trading_days: TRADING_DAYS_PER_YEAR,
    }
  }
}

impl StatisticsEngine {
  pub fn new(trading_days: f64) -> Self {
    Self { trading_days }
  }

  /// Annualized mean and unbiased (`ddof = 1`) covariance.
  pub fn estimate(&self, returns: &ReturnMatrix) -> PortfolioResult<MarketStats> {
    let r = returns.returns();
    let rows = r.nrows();

    let mean = r
      .mean_axis(Axis(0))
      .ok_or(PortfolioError::InsufficientHistory { common_dates: rows + 1 })?
      * self.trading_days;

    // ndarray-stats treats rows as variables and columns as observations.
    let cov = r
      .t()
      .cov(1.0)
      .map_err(|_| PortfolioError::InsufficientHistory { common_dates: rows + 1 })?
      * self.trading_days;

    debug!(assets = returns.n_assets(), rows, "estimated annualized moments");

    MarketStats::new(returns.assets().to_vec(), mean, cov)
  }
}
