//! Equal Risk Contribution (ERC) portfolio construction with a
//! trend-following overlay.
//!
//! One rebalance cycle flows covariance matrix -> [`erc::solve_erc`] ->
//! raw ERC weights, and price history -> [`trend::sma_trend_signals`] ->
//! per-asset trend signals; [`overlay::apply_trend_overlay`] merges both
//! into the final allocation. [`rebalance::run_rebalance`] runs the whole
//! cycle in one call. Every operation is a pure function of its inputs, so
//! independent rebalance dates or portfolios can be computed concurrently
//! without coordination.

pub mod erc;
pub mod error;
mod math;
pub mod overlay;
pub mod rebalance;
pub mod risk_contribution;
pub mod solver;
pub mod trend;
pub mod types;

pub use error::RiskParityError;
pub use types::*;

/// Standard result type for all riskparity operations
pub type RiskParityResult<T> = Result<T, RiskParityError>;
