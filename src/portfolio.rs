//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Markowitz mean-variance construction: return statistics, Monte Carlo
//! scatter and long-only efficient frontier.

pub mod data;
pub mod engine;
pub mod frontier;
pub mod monte_carlo;
pub mod optimizers;
pub mod stats;
pub mod types;

pub use data::ReturnMatrix;
pub use data::common_dates;
pub use data::log_returns_series;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use frontier::Frontier;
pub use frontier::FrontierOptimizer;
pub use frontier::linspace;
pub use frontier::target_returns;
pub use monte_carlo::MonteCarloSimulator;
pub use monte_carlo::random_weights;
pub use optimizers::SolverConfig;
pub use stats::MarketStats;
pub use stats::StatisticsEngine;
pub use stats::TRADING_DAYS_PER_YEAR;
pub use types::AllocationRecord;
pub use types::DroppedAsset;
pub use types::FrontierPoint;
pub use types::FrontierReport;
pub use types::OptimizedPortfolio;
pub use types::PriceSeries;
pub use types::SimulatedPortfolio;
pub use types::SolveFailure;
pub use types::WeightVector;
