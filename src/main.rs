use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use frontier_rs::io::render_preview;
use frontier_rs::io::CsvPriceSource;
use frontier_rs::io::CsvSink;
use frontier_rs::log::init_logging;
use frontier_rs::portfolio::PortfolioEngine;
use frontier_rs::portfolio::PortfolioEngineConfig;
use frontier_rs::portfolio::SolverConfig;
use frontier_rs::portfolio::TRADING_DAYS_PER_YEAR;
use frontier_rs::traits::ResultSinkExt;

/// Monte Carlo scatter and long-only efficient frontier from daily closes.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
  /// CSV file with `date,asset,close` rows
  #[arg(short, long)]
  prices: PathBuf,

  /// Assets to include, comma separated (default: every asset in the file)
  #[arg(short, long, value_delimiter = ',')]
  assets: Vec<String>,

  /// Draw this many assets at random from the file instead of listing them
  #[arg(long, conflicts_with = "assets")]
  sample: Option<usize>,

  /// Ignore prices before this date (YYYY-MM-DD)
  #[arg(long)]
  start: Option<NaiveDate>,

  /// Number of random portfolios
  #[arg(long, default_value_t = 2000)]
  trials: usize,

  /// Number of frontier targets
  #[arg(long, default_value_t = 50)]
  points: usize,

  /// Seed for the random portfolios and the asset sample
  #[arg(long)]
  seed: Option<u64>,

  /// Trading days used to annualize daily statistics
  #[arg(long, default_value_t = TRADING_DAYS_PER_YEAR)]
  trading_days: f64,

  /// Active-set iteration limit per frontier target
  #[arg(long, default_value_t = SolverConfig::default().max_iters)]
  max_iters: usize,

  /// Run trials and frontier targets in parallel
  #[arg(long)]
  parallel: bool,

  /// Directory receiving the three CSV tables
  #[arg(short, long)]
  out: Option<PathBuf>,

  /// Rows shown per table in the console preview
  #[arg(long, default_value_t = 10)]
  preview: usize,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);
  run(cli)
}

fn run(cli: Cli) -> Result<()> {
  let engine = PortfolioEngine::new(PortfolioEngineConfig {
    trading_days: cli.trading_days,
    n_trials: cli.trials,
    n_frontier_points: cli.points,
    seed: cli.seed,
    parallel: cli.parallel,
    solver: SolverConfig {
      max_iters: cli.max_iters,
      ..SolverConfig::default()
    },
  });

  let source = CsvPriceSource::new(&cli.prices);
  let assets = match cli.sample {
    Some(n) => source.sample_assets(n, cli.seed)?,
    None => cli.assets,
  };
  let report = engine.run_from_source(&source, &assets, cli.start)?;

  if let Some(dir) = &cli.out {
    CsvSink::new(dir).write_report(&report)?;
  }

  println!("{}", render_preview(&report, cli.preview));
  Ok(())
}
