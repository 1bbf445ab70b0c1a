//! Ballast - a walk-forward portfolio weighting engine.
//!
//! # Overview
//!
//! Ballast turns daily return streams into daily portfolio weights. It
//! re-optimizes allocations on a schedule, lets them drift with realized
//! returns in between, and can scale a strategy's total exposure to a
//! target volatility:
//!
//! - **Scheduling**: stride-based rebalance dates over any daily index
//! - **Weight solving**: equal, minimum-variance, maximum-Sharpe, and
//!   risk-parity schemes under a long-only, fully-invested constraint
//! - **Walk-forward tracks**: expanding or rolling training windows, with
//!   buy-and-hold drift between rebalances
//! - **Volatility targeting**: capped leverage factors from realized
//!   volatility
//! - **Performance statistics**: annualized return/volatility, Sharpe,
//!   maximum drawdown, Calmar
//! - **Configuration files**: TOML-based configuration for reproducible
//!   runs
//!
//! # Quick Start
//!
//! ```no_run
//! use ballast::{
//!     data::{load_returns_csv, CsvConfig},
//!     solver::WeightingScheme,
//!     walkforward::{TrackConfig, TrainingMethod, WeightTracker},
//! };
//!
//! let returns = load_returns_csv("data/strategies.csv", &CsvConfig::default()).unwrap();
//! let tracker = WeightTracker::new(TrackConfig {
//!     rebal_freq: 21,
//!     scheme: WeightingScheme::RiskParity,
//!     training: TrainingMethod::Expanding,
//! })
//! .unwrap();
//!
//! let weights = tracker.compute(&returns, &returns).unwrap();
//! println!("final weights: {:?}", weights.row(weights.len() - 1));
//! ```
//!
//! # Strategies
//!
//! Strategy variants implement the [`strategy::Strategy`] trait and supply
//! their own return matrices; the engine provides weighting, leverage, and
//! statistics. [`strategy::CompositeStrategy`] wires the pieces together
//! for the common case of weighting a basket of sub-strategy returns.
//!
//! # Modules
//!
//! - [`types`]: Core data types (return series/matrices, weight matrices)
//! - [`schedule`]: Rebalance date flags
//! - [`solver`]: Weighting schemes and portfolio objectives
//! - [`optimize`]: Pluggable constrained minimizer
//! - [`walkforward`]: Walk-forward weight tracks
//! - [`leverage`]: Volatility-targeting overlay
//! - [`stats`]: Performance statistics
//! - [`strategy`]: Strategy contract and composition
//! - [`config`]: TOML configuration file support
//! - [`data`]: CSV loading for tests and demos

pub mod config;
pub mod data;
pub mod error;
pub mod leverage;
pub mod optimize;
pub mod schedule;
pub mod solver;
pub mod stats;
pub mod strategy;
pub mod types;
pub mod walkforward;

// Re-exports for convenience
pub use config::EngineFileConfig;
pub use error::{EngineError, Result};
pub use leverage::{leverage_factors, leveraged_returns, LeverageConfig};
pub use optimize::{ProjectedGradient, SimplexMinimizer, Solution};
pub use schedule::rebalance_flags;
pub use solver::{solve_rebalance_weights, WeightingScheme};
pub use stats::{perf_stats, PerfStats};
pub use strategy::{CompositeStrategy, Strategy, StrategyOutput};
pub use types::{
    ReturnMatrix, ReturnSeries, WeightMatrix, LEVERAGE_CAP, TRADING_DAYS, WARM_UP,
    WEIGHT_TOLERANCE, WINDOW_SIZE,
};
pub use walkforward::{drift_step, TrackConfig, TrainingMethod, WeightTracker};
