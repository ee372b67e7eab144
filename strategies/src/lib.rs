//! # predsim-strategies: Strategy Interfaces and Simulation Driver
//!
//! This library feeds market data into rule-based strategies that trade
//! through the predsim execution engine, either by replaying history
//! (backtest) or by consuming a live order-book feed (paper trading).
//!
//! ## Core Components
//!
//! - **Strategy Traits**: One capability trait per feed kind (ticks, candles, book updates)
//! - **StrategyContext**: The broker and execution simulator a strategy trades through
//! - **BacktestEngine**: Time-ordered replay of historical ticks with candle aggregation
//! - **PaperTrader**: Long-running driver over a live book feed with heartbeat metrics
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use predsim_strategies::{
//!     BacktestConfig, BacktestEngine, PriceTick, ReplayStrategy, StrategyContext,
//!     StrategyMetadata, StrategyResult, TickStrategy,
//! };
//! use async_trait::async_trait;
//! use rust_decimal_macros::dec;
//!
//! struct BuyTheDip;
//!
//! #[async_trait]
//! impl TickStrategy for BuyTheDip {
//!     async fn on_tick(&mut self, tick: &PriceTick, ctx: &mut StrategyContext) -> StrategyResult<()> {
//!         if tick.price < dec!(0.20) {
//!             ctx.broker().buy(&tick.asset_id, tick.price, dec!(50), tick.size);
//!         }
//!         Ok(())
//!     }
//!
//!     fn metadata(&self) -> StrategyMetadata {
//!         StrategyMetadata {
//!             name: "BuyTheDip".to_string(),
//!             version: "1.0.0".to_string(),
//!             description: "Buys YES below 20 cents".to_string(),
//!         }
//!     }
//! }
//!
//! # async fn run(ticks: Vec<PriceTick>) -> StrategyResult<()> {
//! let engine = BacktestEngine::new(BacktestConfig::default())?;
//! let mut strategy = ReplayStrategy::Tick(Box::new(BuyTheDip));
//! let result = engine.run_market(&mut strategy, &ticks).await?;
//! println!("Return: {}%", result.total_return_pct);
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod context;
pub mod error;
pub mod metrics;
pub mod paper;
pub mod types;

// Re-export main types
pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, CandleAggregator, PortfolioResult};
pub use context::StrategyContext;
pub use error::{StrategyError, StrategyResult};
pub use metrics::{EngineMetric, MetricBuilder, MetricType};
pub use paper::{PaperTrader, PaperTradingConfig};
pub use types::{BookEvent, Candle, PriceTick, StrategyMetadata};

use async_trait::async_trait;
use predsim_exec::SharedBook;

/// Strategy driven by individual trade prints
#[async_trait]
pub trait TickStrategy: Send + Sync {
    /// Process one historical trade
    async fn on_tick(&mut self, tick: &PriceTick, ctx: &mut StrategyContext) -> StrategyResult<()>;

    /// Get strategy metadata
    fn metadata(&self) -> StrategyMetadata;
}

/// Strategy driven by aggregated OHLCV bars
#[async_trait]
pub trait CandleStrategy: Send + Sync {
    /// Bar length used to aggregate ticks
    fn timeframe(&self) -> chrono::Duration;

    /// Process one completed bar
    async fn on_candle(&mut self, candle: &Candle, ctx: &mut StrategyContext) -> StrategyResult<()>;

    /// Get strategy metadata
    fn metadata(&self) -> StrategyMetadata;
}

/// Strategy driven by live order-book updates
///
/// Called after the update has been applied to `book`. Orders should go
/// through `ctx` so they see the latency layer.
///
/// Release any `book.read()` guard before submitting: fills need the write
/// lock, and a submit that cannot take it within
/// [`predsim_exec::BOOK_LOCK_TIMEOUT`] returns `Submission::Rejected`.
#[async_trait]
pub trait BookStrategy: Send + Sync {
    /// Process an order-book update for `asset_id`
    async fn on_book_update(
        &mut self,
        asset_id: &str,
        book: &SharedBook,
        ctx: &mut StrategyContext,
    ) -> StrategyResult<()>;

    /// Get strategy metadata
    fn metadata(&self) -> StrategyMetadata;
}

/// Strategies the backtest engine can replay
pub enum ReplayStrategy {
    Tick(Box<dyn TickStrategy>),
    Candle(Box<dyn CandleStrategy>),
}

impl ReplayStrategy {
    pub fn metadata(&self) -> StrategyMetadata {
        match self {
            ReplayStrategy::Tick(s) => s.metadata(),
            ReplayStrategy::Candle(s) => s.metadata(),
        }
    }
}
