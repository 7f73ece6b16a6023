//! Long-format CSV price history: `date,asset,close`.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use crate::portfolio::PriceSeries;
use crate::traits::PriceSourceExt;

#[derive(Debug, Deserialize)]
struct PriceRow {
  date: NaiveDate,
  asset: String,
  close: f64,
}

/// Price history read from a CSV file with `date,asset,close` columns.
#[derive(Clone, Debug)]
pub struct CsvPriceSource {
  path: PathBuf,
}

impl CsvPriceSource {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
    }
  }

  /// Asset identifiers in order of first appearance.
  pub fn available_assets(&self) -> Result<Vec<String>> {
    let mut seen = Vec::new();
    for row in self.rows()? {
      if !seen.contains(&row.asset) {
        seen.push(row.asset);
      }
    }
    Ok(seen)
  }

  /// Random subset of at most `n` available assets, in file order.
  pub fn sample_assets(&self, n: usize, seed: Option<u64>) -> Result<Vec<String>> {
    ensure!(n > 0, "asset sample size must be positive");
    let available = self.available_assets()?;
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let sampled = sample_assets(&available, n, seed);
    info!(available = available.len(), sampled = sampled.len(), seed, "sampled asset universe");
    Ok(sampled)
  }

  fn rows(&self) -> Result<Vec<PriceRow>> {
    let mut reader = csv::ReaderBuilder::new()
      .trim(csv::Trim::All)
      .from_path(&self.path)
      .with_context(|| format!("failed to open price file: {}", self.path.display()))?;

    let rows = reader
      .deserialize()
      .enumerate()
      .map(|(i, row)| {
        row.with_context(|| format!("invalid price row {} in {}", i + 2, self.path.display()))
      })
      .collect();
    rows
  }
}

/// Seeded draw of `n` distinct assets without replacement, keeping input order.
pub fn sample_assets(assets: &[String], n: usize, seed: u64) -> Vec<String> {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut picked = index::sample(&mut rng, assets.len(), n.min(assets.len())).into_vec();
  picked.sort_unstable();
  picked.into_iter().map(|i| assets[i].clone()).collect()
}

impl PriceSourceExt for CsvPriceSource {
  fn fetch_prices(&self, assets: &[String], start: Option<NaiveDate>) -> Result<Vec<PriceSeries>> {
    let wanted: Vec<String> = if assets.is_empty() {
      self.available_assets()?
    } else {
      assets.to_vec()
    };

    let mut by_asset: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
    for row in self.rows()? {
      if start.is_some_and(|s| row.date < s) || !wanted.contains(&row.asset) {
        continue;
      }
      by_asset.entry(row.asset).or_default().push((row.date, row.close));
    }

    let mut series = Vec::with_capacity(wanted.len());
    for asset in &wanted {
      let Some(mut obs) = by_asset.remove(asset) else {
        debug!(asset = asset.as_str(), "no price history");
        continue;
      };

      obs.sort_by_key(|(d, _)| *d);
      if let Some(pair) = obs.windows(2).find(|p| p[0].0 == p[1].0) {
        bail!("duplicate close for '{asset}' on {}", pair[0].0);
      }
      series.push(PriceSeries::new(asset.as_str(), obs)?);
    }

    Ok(series)
  }
}
