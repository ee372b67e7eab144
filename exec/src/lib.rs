//! # predsim-exec: Execution and Accounting Engine for Binary-Outcome Markets
//!
//! This library simulates order execution for YES/NO prediction-market
//! shares against a locally maintained order book, tracks cash and
//! per-asset positions under concurrent access, and settles markets at
//! resolution.
//!
//! ## Core Components
//!
//! - **OrderBook**: Price-ordered bid/ask liquidity for one asset
//! - **PositionLedger**: YES/NO share counts and volume-weighted entry prices
//! - **SimulatedBroker**: Cash, positions, trade history and performance counters
//! - **ExecutionSimulator**: Latency simulation with at-most-one in-flight order per asset
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use predsim_exec::{BrokerConfig, ExecutionSimulator, OrderBook, SimulatedBroker, Submission};
//! use rust_decimal_macros::dec;
//!
//! let broker = Arc::new(SimulatedBroker::new(BrokerConfig::default()));
//! let executor = ExecutionSimulator::new(Arc::clone(&broker)).unwrap();
//!
//! let book = OrderBook::shared("0x123abc");
//! book.write().apply_depth_delta(&[(dec!(0.38), dec!(500))], &[(dec!(0.40), dec!(500))]);
//!
//! match executor.submit_buy_order("0x123abc", dec!(0.42), dec!(100), &book) {
//!     Submission::Immediate(shares) => println!("Filled {} shares", shares),
//!     other => println!("Unexpected: {:?}", other),
//! }
//!
//! let value = broker.total_portfolio_value();
//! assert!(value > dec!(990));
//! ```

// Public modules
pub mod book;
pub mod broker;
pub mod config;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod oms;
pub mod trade;

// Re-export main types
pub use book::{DeltaSummary, OrderBook, RawLevel, SharedBook};
pub use broker::{PerformanceSnapshot, SimulatedBroker};
pub use config::BrokerConfig;
pub use error::{ExecError, ExecResult};
pub use execution::{
    DelayedOrder, ExecutionSimulator, OrderIntent, OrderOutcome, Submission, BOOK_LOCK_TIMEOUT,
};
pub use ledger::{Position, PositionLedger, PositionPair};
pub use oms::{InFlightGuard, InFlightRegistry};
pub use trade::{ExecutedTrade, OutcomeSide, TradeSide};

// Initialize tracing
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
