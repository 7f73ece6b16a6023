//! # frontier-rs
//!
//! $$
//! \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1,\ \mu^\top\mathbf{w}=r}\ \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Markowitz mean-variance portfolio construction from daily price histories:
//! annualized log-return statistics, a Monte Carlo scatter of random long-only
//! portfolios and the long-only efficient frontier.

pub mod error;
pub mod io;
pub mod log;
pub mod portfolio;
pub mod traits;

pub use error::PortfolioError;
