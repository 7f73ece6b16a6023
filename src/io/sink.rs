//! CSV persistence of the result tables.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::portfolio::FrontierReport;
use crate::traits::ResultSinkExt;

pub const SIMULATED_PORTFOLIOS: &str = "simulated_portfolios.csv";
pub const EFFICIENT_FRONTIER: &str = "efficient_frontier.csv";
pub const OPTIMAL_WEIGHTS: &str = "optimal_weights.csv";

#[derive(Serialize)]
struct SimulatedRow {
  #[serde(rename = "return")]
  expected_return: f64,
  volatility: f64,
}

#[derive(Serialize)]
struct FrontierRow {
  target_return: f64,
  efficient_volatility: Option<f64>,
}

#[derive(Serialize)]
struct WeightRow<'a> {
  target_return: f64,
  asset: &'a str,
  weight: f64,
}

/// Writes each table to its own CSV file in `dir`, replacing previous output.
#[derive(Clone, Debug)]
pub struct CsvSink {
  dir: PathBuf,
}

impl CsvSink {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self {
      dir: dir.as_ref().to_path_buf(),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn write_table<T: Serialize>(
    &self,
    name: &str,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
  ) -> Result<()> {
    let path = self.dir.join(name);
    let mut writer = csv::WriterBuilder::new()
      .has_headers(false)
      .from_path(&path)
      .with_context(|| format!("failed to create {}", path.display()))?;

    // Written explicitly so empty tables still carry their schema.
    writer.write_record(header)?;
    let mut count = 0usize;
    for row in rows {
      writer.serialize(row)?;
      count += 1;
    }
    writer
      .flush()
      .with_context(|| format!("failed to write {}", path.display()))?;

    info!(table = name, rows = count, "table written");
    Ok(())
  }
}

impl ResultSinkExt for CsvSink {
  fn write_report(&self, report: &FrontierReport) -> Result<()> {
    fs::create_dir_all(&self.dir)
      .with_context(|| format!("failed to create output directory {}", self.dir.display()))?;

    self.write_table(
      SIMULATED_PORTFOLIOS,
      &["return", "volatility"],
      report.simulated_portfolios.iter().map(|p| SimulatedRow {
        expected_return: p.expected_return,
        volatility: p.volatility,
      }),
    )?;

    self.write_table(
      EFFICIENT_FRONTIER,
      &["target_return", "efficient_volatility"],
      report.efficient_frontier.iter().map(|p| FrontierRow {
        target_return: p.target_return,
        efficient_volatility: p.efficient_volatility,
      }),
    )?;

    self.write_table(
      OPTIMAL_WEIGHTS,
      &["target_return", "asset", "weight"],
      report.optimal_weights.iter().map(|a| WeightRow {
        target_return: a.target_return,
        asset: &a.asset,
        weight: a.weight,
      }),
    )?;

    Ok(())
  }
}
