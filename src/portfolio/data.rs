//! # Portfolio Data Utilities
//!
//! $$
//! r_t = \ln\frac{P_t}{P_{t-1}}
//! $$
//!
//! Price cleaning, inner-join alignment on calendar dates and log-return
//! construction.

use std::collections::BTreeSet;
use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView2;
use tracing::debug;
use tracing::warn;

use super::types::DroppedAsset;
use super::types::PriceSeries;
use crate::error::PortfolioError;
use crate::error::PortfolioResult;

/// Convert consecutive close prices to log returns.
pub fn log_returns_series(closes: &[f64]) -> Vec<f64> {
  closes.windows(2).map(|p| (p[1] / p[0]).ln()).collect()
}

/// Dates shared by every series, ascending.
pub fn common_dates(series: &[PriceSeries]) -> Vec<NaiveDate> {
  let mut iter = series.iter();
  let Some(first) = iter.next() else {
    return Vec::new();
  };

  let mut common: BTreeSet<NaiveDate> = first.observations().iter().map(|(d, _)| *d).collect();
  for s in iter {
    let dates: HashSet<NaiveDate> = s.observations().iter().map(|(d, _)| *d).collect();
    common.retain(|d| dates.contains(d));
  }

  common.into_iter().collect()
}

/// Daily log returns, one column per asset, one row per aligned trading day after the first.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
  assets: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnMatrix {
  /// Wrap precomputed returns (`rows = days`, `cols = assets`).
  pub fn new(assets: Vec<String>, returns: Array2<f64>) -> PortfolioResult<Self> {
    if assets.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }
    if returns.ncols() != assets.len() {
      return Err(PortfolioError::DimensionMismatch(format!(
        "{} return columns for {} assets",
        returns.ncols(),
        assets.len()
      )));
    }
    if returns.nrows() < 2 {
      return Err(PortfolioError::InsufficientHistory {
        common_dates: returns.nrows() + 1,
      });
    }
    if returns.iter().any(|r| !r.is_finite()) {
      return Err(PortfolioError::NonFinite("return matrix".into()));
    }

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in &assets {
      if !seen.insert(asset.as_str()) {
        return Err(PortfolioError::DuplicateAsset(asset.clone()));
      }
    }

    Ok(Self { assets, returns })
  }

  /// Clean, align and difference price series.
  ///
  /// Non-finite and non-positive closes are discarded; assets left with fewer
  /// than two observations are dropped and reported. Remaining series are
  /// inner-joined on calendar dates, preserving input order.
  pub fn from_prices(series: &[PriceSeries]) -> PortfolioResult<(Self, Vec<DroppedAsset>)> {
    let mut seen = HashSet::with_capacity(series.len());
    for s in series {
      if !seen.insert(s.asset()) {
        return Err(PortfolioError::DuplicateAsset(s.asset().to_string()));
      }
    }

    let mut kept = Vec::with_capacity(series.len());
    let mut dropped = Vec::new();

    for s in series {
      let valid: Vec<(NaiveDate, f64)> = s
        .observations()
        .iter()
        .copied()
        .filter(|(_, p)| p.is_finite() && *p > 0.0)
        .collect();

      let discarded = s.len() - valid.len();
      if discarded > 0 {
        debug!(asset = s.asset(), discarded, "discarded invalid closes");
      }

      if valid.len() < 2 {
        warn!(
          asset = s.asset(),
          observations = valid.len(),
          "dropping asset with insufficient price history"
        );
        dropped.push(DroppedAsset {
          asset: s.asset().to_string(),
          reason: format!("{} valid observations, at least 2 required", valid.len()),
        });
        continue;
      }

      kept.push(PriceSeries::new(s.asset(), valid)?);
    }

    if kept.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }

    let dates = common_dates(&kept);
    if dates.len() < 3 {
      return Err(PortfolioError::InsufficientHistory {
        common_dates: dates.len(),
      });
    }

    let n_rows = dates.len() - 1;
    let mut returns = Array2::<f64>::zeros((n_rows, kept.len()));

    for (j, s) in kept.iter().enumerate() {
      let mut obs = s.observations().iter().peekable();
      let closes: Vec<f64> = dates
        .iter()
        .filter_map(|d| {
          while obs.next_if(|(od, _)| od < d).is_some() {}
          obs.next_if(|(od, _)| od == d).map(|(_, p)| *p)
        })
        .collect();

      for (i, r) in log_returns_series(&closes).into_iter().enumerate() {
        returns[[i, j]] = r;
      }
    }

    debug!(
      assets = kept.len(),
      dropped = dropped.len(),
      rows = n_rows,
      first = %dates[0],
      last = %dates[n_rows],
      "aligned price series"
    );

    let assets = kept.iter().map(|s| s.asset().to_string()).collect();
    Ok((Self { assets, returns }, dropped))
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Daily returns, `rows = days`, `cols = assets`.
  pub fn returns(&self) -> ArrayView2<'_, f64> {
    self.returns.view()
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn n_rows(&self) -> usize {
    self.returns.nrows()
  }
}
