//! Latency simulation and order submission
//!
//! `ExecutionSimulator` turns strategy order intents into broker calls
//! against the local order book. With zero latency the fill is synchronous
//! and deterministic. With latency configured, the order is registered as in
//! flight, a tokio task sleeps for the latency window, re-reads the book and
//! then fills or rejects on that single observation. There is no retry.

use parking_lot::RwLockWriteGuard;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::book::{OrderBook, SharedBook};
use crate::broker::{SimulatedBroker, MAX_EXECUTION_PRICE, MIN_EXECUTION_PRICE};
use crate::error::{ExecError, ExecResult};
use crate::oms::InFlightRegistry;
use crate::trade::TradeSide;

/// How long a fill waits for the book's write lock before rejecting
pub const BOOK_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// What the strategy asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderIntent {
    BuyYes,
    SellYes,
    BuyNo,
    SellNo,
}

impl OrderIntent {
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderIntent::BuyYes | OrderIntent::BuyNo)
    }

    fn rejection_side(&self) -> TradeSide {
        if self.is_buy() {
            TradeSide::RejectBuy
        } else {
            TradeSide::RejectSell
        }
    }

    /// Read the touch this intent trades against.
    ///
    /// Returns `(yes_quote, size)`. NO intents are priced off the opposite
    /// side of the YES book.
    fn read_quote(&self, book: &OrderBook) -> (Decimal, Decimal) {
        match self {
            OrderIntent::BuyYes | OrderIntent::SellNo => (book.best_ask_price(), book.best_ask_size()),
            OrderIntent::SellYes | OrderIntent::BuyNo => (book.best_bid_price(), book.best_bid_size()),
        }
    }

    /// Quote in the terms the target was expressed in
    fn intent_price(&self, yes_quote: Decimal) -> Decimal {
        match self {
            OrderIntent::BuyYes | OrderIntent::SellYes => yes_quote,
            OrderIntent::BuyNo | OrderIntent::SellNo => Decimal::ONE - yes_quote,
        }
    }

    fn accepts(&self, price: Decimal, target: Decimal) -> bool {
        if self.is_buy() {
            price <= target
        } else {
            price >= target
        }
    }

    fn consume(&self, book: &mut OrderBook, shares: Decimal) {
        match self {
            OrderIntent::BuyYes | OrderIntent::SellNo => book.consume_ask_liquidity(shares),
            OrderIntent::SellYes | OrderIntent::BuyNo => book.consume_bid_liquidity(shares),
        }
    }

    fn fill(
        &self,
        broker: &SimulatedBroker,
        asset_id: &str,
        yes_quote: Decimal,
        dollars: Decimal,
        size: Decimal,
    ) -> Decimal {
        match self {
            OrderIntent::BuyYes => broker.buy(asset_id, yes_quote, dollars, size),
            OrderIntent::SellYes => broker.sell_all(asset_id, yes_quote, size),
            OrderIntent::BuyNo => broker.buy_no(asset_id, yes_quote, dollars, size),
            OrderIntent::SellNo => broker.sell_all_no(asset_id, yes_quote, size),
        }
    }
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderIntent::BuyYes => write!(f, "BUY_YES"),
            OrderIntent::SellYes => write!(f, "SELL_YES"),
            OrderIntent::BuyNo => write!(f, "BUY_NO"),
            OrderIntent::SellNo => write!(f, "SELL_NO"),
        }
    }
}

/// Terminal result of a delayed order
///
/// Only price rejections (`StaleOrRejectedPrice`, `MissedExecutionRace`)
/// append a REJECT record to the trade history. `InsufficientFunds`,
/// `NoPosition` and `BookBusy` leave the history untouched.
#[derive(Debug)]
pub enum OrderOutcome {
    Filled(Decimal),
    Rejected(ExecError),
}

impl OrderOutcome {
    /// Shares filled, zero for a rejection
    pub fn filled_shares(&self) -> Decimal {
        match self {
            OrderOutcome::Filled(shares) => *shares,
            OrderOutcome::Rejected(_) => Decimal::ZERO,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, OrderOutcome::Filled(_))
    }
}

/// Handle to an order waiting out its latency window
#[derive(Debug)]
pub struct DelayedOrder {
    asset_id: String,
    intent: OrderIntent,
    handle: JoinHandle<OrderOutcome>,
}

impl DelayedOrder {
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn intent(&self) -> OrderIntent {
        self.intent
    }

    /// Wait for the fill-or-reject decision
    pub async fn wait(self) -> ExecResult<OrderOutcome> {
        self.handle
            .await
            .map_err(|e| ExecError::TaskFailed(e.to_string()))
    }

    /// Cancel the order. The in-flight marker is released when the task
    /// is dropped by the runtime.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Result of submitting an order
#[derive(Debug)]
pub enum Submission {
    /// Synchronous fill; zero means nothing filled
    Immediate(Decimal),
    /// Delayed fill scheduled on the runtime
    Pending(DelayedOrder),
    /// Another order for the asset is still in flight
    Dropped,
    /// Synchronous fill could not lock the book
    Rejected(ExecError),
}

impl Submission {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Submission::Dropped)
    }

    /// Take the pending order, if any
    pub fn into_pending(self) -> Option<DelayedOrder> {
        match self {
            Submission::Pending(order) => Some(order),
            _ => None,
        }
    }
}

/// Order submission front-end for the simulated broker
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    broker: Arc<SimulatedBroker>,
    latency: Duration,
    in_flight: InFlightRegistry,
    /// Present only when latency is non-zero
    runtime: Option<Handle>,
}

impl ExecutionSimulator {
    /// Create a simulator using the broker's configured latency
    pub fn new(broker: Arc<SimulatedBroker>) -> ExecResult<Self> {
        let latency = broker.config().latency();
        Self::with_latency(broker, latency)
    }

    /// Create a simulator with an explicit latency.
    ///
    /// A non-zero latency requires a tokio runtime on the calling thread.
    pub fn with_latency(broker: Arc<SimulatedBroker>, latency: Duration) -> ExecResult<Self> {
        let runtime = if latency.is_zero() {
            None
        } else {
            Some(Handle::try_current().map_err(|_| ExecError::NoRuntime)?)
        };

        Ok(Self {
            broker,
            latency,
            in_flight: InFlightRegistry::new(),
            runtime,
        })
    }

    pub fn broker(&self) -> &Arc<SimulatedBroker> {
        &self.broker
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Buy YES at or below `target_price`
    pub fn submit_buy_order(
        &self,
        asset_id: &str,
        target_price: Decimal,
        dollars_to_invest: Decimal,
        book: &SharedBook,
    ) -> Submission {
        self.submit(OrderIntent::BuyYes, asset_id, target_price, dollars_to_invest, book)
    }

    /// Sell the YES position at or above `target_price`
    pub fn submit_sell_all_order(&self, asset_id: &str, target_price: Decimal, book: &SharedBook) -> Submission {
        self.submit(OrderIntent::SellYes, asset_id, target_price, Decimal::ZERO, book)
    }

    /// Buy NO at or below `target_price` (NO terms)
    pub fn submit_buy_no_order(
        &self,
        asset_id: &str,
        target_price: Decimal,
        dollars_to_invest: Decimal,
        book: &SharedBook,
    ) -> Submission {
        self.submit(OrderIntent::BuyNo, asset_id, target_price, dollars_to_invest, book)
    }

    /// Sell the NO position at or above `target_price` (NO terms)
    pub fn submit_sell_all_no_order(&self, asset_id: &str, target_price: Decimal, book: &SharedBook) -> Submission {
        self.submit(OrderIntent::SellNo, asset_id, target_price, Decimal::ZERO, book)
    }

    fn submit(
        &self,
        intent: OrderIntent,
        asset_id: &str,
        target_price: Decimal,
        dollars: Decimal,
        book: &SharedBook,
    ) -> Submission {
        let Some(runtime) = &self.runtime else {
            return match fill_now(&self.broker, intent, asset_id, dollars, book) {
                Ok(filled) => Submission::Immediate(filled),
                Err(e) => {
                    warn!(asset_id = %asset_id, intent = %intent, error = %e, "Rejecting order");
                    Submission::Rejected(e)
                }
            };
        };

        let Some(guard) = self.in_flight.try_acquire(asset_id) else {
            warn!(
                asset_id = %asset_id,
                intent = %intent,
                error = %ExecError::DuplicateInFlightOrder(asset_id.to_string()),
                "Dropping order"
            );
            return Submission::Dropped;
        };

        let broker = Arc::clone(&self.broker);
        let book = Arc::clone(book);
        let latency = self.latency;
        let task_asset = asset_id.to_string();

        let handle = runtime.spawn(async move {
            let _guard = guard;
            tokio::time::sleep(latency).await;
            fill_after_delay(&broker, intent, &task_asset, target_price, dollars, &book)
        });

        debug!(asset_id = %asset_id, intent = %intent, target = %target_price, "Order in flight");

        Submission::Pending(DelayedOrder {
            asset_id: asset_id.to_string(),
            intent,
            handle,
        })
    }
}

/// Zero-latency path: trade the current touch and consume what filled
fn fill_now(
    broker: &SimulatedBroker,
    intent: OrderIntent,
    asset_id: &str,
    dollars: Decimal,
    book: &SharedBook,
) -> ExecResult<Decimal> {
    let mut book = lock_book(book, asset_id)?;
    let (yes_quote, size) = intent.read_quote(&book);
    let filled = intent.fill(broker, asset_id, yes_quote, dollars, size);
    if filled > Decimal::ZERO {
        intent.consume(&mut book, filled);
    }
    Ok(filled)
}

/// The book lock is not reentrant: a caller still holding a read guard
/// would otherwise block forever here
fn lock_book<'a>(book: &'a SharedBook, asset_id: &str) -> ExecResult<RwLockWriteGuard<'a, OrderBook>> {
    book.try_write_for(BOOK_LOCK_TIMEOUT)
        .ok_or_else(|| ExecError::BookBusy(asset_id.to_string()))
}

/// Delayed path: single re-read of the book after the latency window
fn fill_after_delay(
    broker: &SimulatedBroker,
    intent: OrderIntent,
    asset_id: &str,
    target_price: Decimal,
    dollars: Decimal,
    book: &SharedBook,
) -> OrderOutcome {
    let mut book = match lock_book(book, asset_id) {
        Ok(guard) => guard,
        Err(e) => {
            warn!(asset_id = %asset_id, intent = %intent, error = %e, "Delayed order could not lock book");
            return OrderOutcome::Rejected(e);
        }
    };
    let (yes_quote, size) = intent.read_quote(&book);

    if yes_quote >= MAX_EXECUTION_PRICE || yes_quote <= MIN_EXECUTION_PRICE {
        broker.record_rejection(asset_id, intent.rejection_side(), Decimal::ZERO);
        return OrderOutcome::Rejected(ExecError::StaleOrRejectedPrice {
            asset_id: asset_id.to_string(),
            price: yes_quote,
        });
    }

    let observed = intent.intent_price(yes_quote);
    if !intent.accepts(observed, target_price) || size <= Decimal::ZERO {
        broker.record_rejection(asset_id, intent.rejection_side(), observed);
        return OrderOutcome::Rejected(ExecError::MissedExecutionRace {
            asset_id: asset_id.to_string(),
            target: target_price,
            observed,
        });
    }

    let filled = intent.fill(broker, asset_id, yes_quote, dollars, size);
    if filled > Decimal::ZERO {
        intent.consume(&mut book, filled);
        return OrderOutcome::Filled(filled);
    }

    let error = if intent.is_buy() {
        ExecError::InsufficientFunds {
            asset_id: asset_id.to_string(),
            requested: dollars,
            available: broker.cash_balance(),
        }
    } else {
        ExecError::NoPosition(asset_id.to_string())
    };
    debug!(asset_id = %asset_id, intent = %intent, error = %error, "Delayed order filled nothing");
    OrderOutcome::Rejected(error)
}
