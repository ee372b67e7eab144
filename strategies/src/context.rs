//! Strategy execution context

use predsim_exec::{
    ExecutionSimulator, OutcomeSide, Position, SharedBook, SimulatedBroker, Submission,
};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::metrics::{EngineMetric, MetricBuilder};
use crate::StrategyResult;

/// Strategy execution context
///
/// The only engine surface strategies see: the run's broker for direct
/// tick-driven fills, and the execution simulator for book-driven orders
/// that go through the latency layer.
pub struct StrategyContext {
    /// Unique strategy identifier
    pub strategy_id: String,

    broker: Arc<SimulatedBroker>,

    executor: ExecutionSimulator,

    metrics: MetricBuilder,

    /// Metrics buffer (drained by the driver)
    metrics_buffer: Vec<EngineMetric>,
}

impl StrategyContext {
    /// Create a context sharing `broker`. Order latency comes from the
    /// broker's configuration.
    pub fn new(strategy_id: impl Into<String>, broker: Arc<SimulatedBroker>) -> StrategyResult<Self> {
        let executor = ExecutionSimulator::new(Arc::clone(&broker))?;
        Ok(Self::with_executor(strategy_id, executor))
    }

    /// Create a context around an existing executor
    pub fn with_executor(strategy_id: impl Into<String>, executor: ExecutionSimulator) -> Self {
        let strategy_id = strategy_id.into();
        Self {
            metrics: MetricBuilder::new(strategy_id.clone()),
            strategy_id,
            broker: Arc::clone(executor.broker()),
            executor,
            metrics_buffer: Vec::new(),
        }
    }

    pub fn broker(&self) -> &Arc<SimulatedBroker> {
        &self.broker
    }

    pub fn executor(&self) -> &ExecutionSimulator {
        &self.executor
    }

    pub fn cash_balance(&self) -> Decimal {
        self.broker.cash_balance()
    }

    pub fn position(&self, asset_id: &str, side: OutcomeSide) -> Position {
        self.broker.position(asset_id, side)
    }

    /// Route a YES buy through the latency layer.
    ///
    /// Drop any guard on `book` first; a book that stays locked comes back
    /// as `Submission::Rejected`.
    pub fn submit_buy(&mut self, asset_id: &str, target_price: Decimal, dollars: Decimal, book: &SharedBook) -> Submission {
        let submission = self.executor.submit_buy_order(asset_id, target_price, dollars, book);
        self.track(asset_id, submission)
    }

    /// Route a YES sell-all through the latency layer
    pub fn submit_sell_all(&mut self, asset_id: &str, target_price: Decimal, book: &SharedBook) -> Submission {
        let submission = self.executor.submit_sell_all_order(asset_id, target_price, book);
        self.track(asset_id, submission)
    }

    /// Route a NO buy through the latency layer
    pub fn submit_buy_no(&mut self, asset_id: &str, target_price: Decimal, dollars: Decimal, book: &SharedBook) -> Submission {
        let submission = self.executor.submit_buy_no_order(asset_id, target_price, dollars, book);
        self.track(asset_id, submission)
    }

    /// Route a NO sell-all through the latency layer
    pub fn submit_sell_all_no(&mut self, asset_id: &str, target_price: Decimal, book: &SharedBook) -> Submission {
        let submission = self.executor.submit_sell_all_no_order(asset_id, target_price, book);
        self.track(asset_id, submission)
    }

    /// Count orders dropped by the in-flight guard
    fn track(&mut self, asset_id: &str, submission: Submission) -> Submission {
        if submission.is_dropped() {
            self.metrics_buffer.push(self.metrics.order_dropped(asset_id));
        }
        submission
    }

    /// Emit a metric
    pub fn emit_metric(&mut self, metric: EngineMetric) {
        self.metrics_buffer.push(metric);
    }

    /// Drain metrics buffer
    pub fn drain_metrics(&mut self) -> Vec<EngineMetric> {
        std::mem::take(&mut self.metrics_buffer)
    }
}
