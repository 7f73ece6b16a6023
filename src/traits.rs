//! # Traits
//!
//! $$
//! \mu_p = \mathbf{w}^\top \mu,\qquad \sigma_p = \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}
//! $$
//!
//! Seams between the numerical core and its collaborators.

use anyhow::Result;
use chrono::NaiveDate;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

use crate::portfolio::FrontierReport;
use crate::portfolio::PriceSeries;

/// Read-only source of annualized mean returns and covariance.
pub trait MomentsExt: Send + Sync {
  /// Asset identifiers in column order.
  fn assets(&self) -> &[String];

  /// Annualized expected return per asset.
  fn mean_returns(&self) -> ArrayView1<'_, f64>;

  /// Annualized covariance matrix.
  fn covariance(&self) -> ArrayView2<'_, f64>;

  fn n_assets(&self) -> usize {
    self.mean_returns().len()
  }

  /// `w · mean`
  fn portfolio_return(&self, weights: &[f64]) -> f64 {
    self.mean_returns().dot(&ArrayView1::from(weights))
  }

  /// `w' Σ w`
  fn portfolio_variance(&self, weights: &[f64]) -> f64 {
    let w = ArrayView1::from(weights);
    w.dot(&self.covariance().dot(&w))
  }

  /// `sqrt(w' Σ w)`, rounding noise below zero clamped away.
  fn portfolio_volatility(&self, weights: &[f64]) -> f64 {
    self.portfolio_variance(weights).max(0.0).sqrt()
  }
}

/// Price history provider.
pub trait PriceSourceExt {
  /// Fetch close prices from `start` onwards. Assets without data are absent
  /// from the result; order follows `assets`.
  fn fetch_prices(&self, assets: &[String], start: Option<NaiveDate>) -> Result<Vec<PriceSeries>>;
}

/// Destination for the three result tables.
pub trait ResultSinkExt {
  fn write_report(&self, report: &FrontierReport) -> Result<()>;
}
