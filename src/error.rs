//! # Errors
//!
//! Failures of the portfolio core. Per-target solver failures are not errors,
//! see [`crate::portfolio::SolveFailure`].

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
  /// No asset survived retrieval and cleaning.
  #[error("no assets left in the universe after price cleaning")]
  EmptyUniverse,

  /// Aligned price history too short to estimate a sample covariance.
  #[error("insufficient aligned history: {common_dates} common dates, at least 3 required")]
  InsufficientHistory { common_dates: usize },

  /// Price series dates must be strictly increasing.
  #[error("price series for '{asset}' is not strictly increasing at {date}")]
  UnorderedSeries { asset: String, date: NaiveDate },

  /// The same identifier was supplied twice.
  #[error("duplicate asset identifier '{0}'")]
  DuplicateAsset(String),

  /// Weights violate the long-only fully-invested invariants.
  #[error("invalid weight vector: {0}")]
  InvalidWeights(String),

  /// NaN or infinite values where finite numbers are required.
  #[error("non-finite values in {0}")]
  NonFinite(String),

  /// Shapes of inputs do not agree.
  #[error("dimension mismatch: {0}")]
  DimensionMismatch(String),
}

pub type PortfolioResult<T> = std::result::Result<T, PortfolioError>;
