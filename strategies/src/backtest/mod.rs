//! Historical replay
//!
//! Replays time-ordered trade prints for one market, or many markets with
//! isolated brokers, through tick- or candle-driven strategies.

pub mod candles;
pub mod engine;

pub use candles::CandleAggregator;
pub use engine::{BacktestConfig, BacktestEngine, BacktestResult, PortfolioResult};
