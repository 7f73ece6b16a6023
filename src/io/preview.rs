//! Console preview of a run.

use prettytable::format;
use prettytable::row;
use prettytable::Table;

use crate::portfolio::FrontierReport;

fn new_table() -> Table {
  let mut table = Table::new();
  table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
  table
}

/// Render the run summary and the first `limit` rows of each table.
pub fn render_preview(report: &FrontierReport, limit: usize) -> String {
  let mut summary = new_table();
  summary.set_titles(row!["metric", "value"]);
  summary.add_row(row!["assets", report.assets.join(", ")]);
  summary.add_row(row!["dropped", report.dropped.len()]);
  summary.add_row(row!["simulated portfolios", report.simulated_portfolios.len()]);
  summary.add_row(row![
    "frontier targets",
    format!(
      "{} ({} converged)",
      report.efficient_frontier.len(),
      report.converged_targets()
    )
  ]);
  if let Some(gmv) = &report.min_volatility {
    summary.add_row(row![
      "min volatility",
      format!("{:.4} at return {:.4}", gmv.volatility, gmv.expected_return)
    ]);
  }

  let mut dropped = new_table();
  dropped.set_titles(row!["dropped asset", "reason"]);
  for d in &report.dropped {
    dropped.add_row(row![d.asset, d.reason]);
  }

  let mut simulated = new_table();
  simulated.set_titles(row!["return", "volatility"]);
  for p in report.simulated_portfolios.iter().take(limit) {
    simulated.add_row(row![
      format!("{:.4}", p.expected_return),
      format!("{:.4}", p.volatility)
    ]);
  }

  let mut frontier = new_table();
  frontier.set_titles(row!["target_return", "efficient_volatility"]);
  for p in report.efficient_frontier.iter().take(limit) {
    let vol = match (p.efficient_volatility, p.failure) {
      (Some(v), _) => format!("{v:.4}"),
      (None, Some(reason)) => format!("- ({reason})"),
      (None, None) => "-".to_string(),
    };
    frontier.add_row(row![format!("{:.4}", p.target_return), vol]);
  }

  let mut weights = new_table();
  weights.set_titles(row!["target_return", "asset", "weight"]);
  for a in report.optimal_weights.iter().take(limit) {
    weights.add_row(row![
      format!("{:.4}", a.target_return),
      a.asset,
      format!("{:.4}", a.weight)
    ]);
  }

  let mut out = summary.to_string();
  if !report.dropped.is_empty() {
    out.push('\n');
    out.push_str(&dropped.to_string());
  }
  for table in [simulated, frontier, weights] {
    out.push('\n');
    out.push_str(&table.to_string());
  }
  out
}
