//! Engine metrics for monitoring and analysis

use chrono::{DateTime, Utc};
use predsim_exec::PerformanceSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metric type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Counter metric (monotonically increasing)
    Counter,
    /// Gauge metric (can go up or down)
    Gauge,
}

/// Engine or strategy metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetric {
    /// Metric timestamp
    pub timestamp: DateTime<Utc>,

    /// Emitting strategy or driver
    pub source: String,

    /// Metric type
    pub metric_type: MetricType,

    /// Metric name (e.g., "broker.cash_usd", "broker.win_rate")
    pub metric_name: String,

    /// Metric value
    pub value: Decimal,

    /// Additional labels for dimensions
    pub labels: HashMap<String, String>,
}

impl EngineMetric {
    /// Create a new counter metric
    pub fn counter(source: impl Into<String>, name: impl Into<String>, value: Decimal) -> Self {
        Self::new(source, MetricType::Counter, name, value)
    }

    /// Create a new gauge metric
    pub fn gauge(source: impl Into<String>, name: impl Into<String>, value: Decimal) -> Self {
        Self::new(source, MetricType::Gauge, name, value)
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Override the timestamp (replay time instead of wall clock)
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn new(source: impl Into<String>, metric_type: MetricType, name: impl Into<String>, value: Decimal) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            metric_type,
            metric_name: name.into(),
            value,
            labels: HashMap::new(),
        }
    }
}

/// Standard metric names
pub mod metric_names {
    /// Cash balance in USD
    pub const CASH_USD: &str = "broker.cash_usd";

    /// Cash plus marked positions in USD
    pub const PORTFOLIO_VALUE_USD: &str = "broker.portfolio_value_usd";

    /// Highest portfolio value seen
    pub const PEAK_EQUITY_USD: &str = "broker.peak_equity_usd";

    /// Max drawdown (fraction of peak)
    pub const MAX_DRAWDOWN: &str = "broker.max_drawdown";

    /// Win rate (fraction of classified trades)
    pub const WIN_RATE: &str = "broker.win_rate";

    /// Closing trades executed (sells and resolutions)
    pub const TRADES_EXECUTED: &str = "broker.trades_executed";

    /// All buy and sell actions
    pub const ACTIONS: &str = "broker.actions";

    /// Assets with an open position
    pub const OPEN_POSITIONS: &str = "broker.open_positions";

    /// Orders dropped because another was in flight
    pub const ORDERS_DROPPED: &str = "driver.orders_dropped";

    /// Book entries skipped as malformed
    pub const BOOK_ENTRIES_SKIPPED: &str = "driver.book_entries_skipped";
}

/// Helper to create common engine metrics
pub struct MetricBuilder {
    source: String,
}

impl MetricBuilder {
    /// Create a new metric builder
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// Gauges and counters describing a performance snapshot
    pub fn from_snapshot(&self, snapshot: &PerformanceSnapshot) -> Vec<EngineMetric> {
        let gauge = |name: &str, value: Decimal| {
            EngineMetric::gauge(self.source.clone(), name, value).at(snapshot.timestamp)
        };
        let counter = |name: &str, value: u64| {
            EngineMetric::counter(self.source.clone(), name, Decimal::from(value)).at(snapshot.timestamp)
        };

        vec![
            gauge(metric_names::CASH_USD, snapshot.cash_balance),
            gauge(metric_names::PORTFOLIO_VALUE_USD, snapshot.portfolio_value),
            gauge(metric_names::PEAK_EQUITY_USD, snapshot.peak_equity),
            gauge(metric_names::MAX_DRAWDOWN, snapshot.max_drawdown),
            gauge(metric_names::WIN_RATE, snapshot.win_rate()),
            gauge(metric_names::OPEN_POSITIONS, Decimal::from(snapshot.open_positions)),
            counter(metric_names::TRADES_EXECUTED, snapshot.total_trades_executed),
            counter(metric_names::ACTIONS, snapshot.total_actions),
        ]
    }

    /// Counter for a dropped duplicate order
    pub fn order_dropped(&self, asset_id: &str) -> EngineMetric {
        EngineMetric::counter(self.source.clone(), metric_names::ORDERS_DROPPED, Decimal::ONE)
            .with_label("asset", asset_id)
    }

    /// Counter for skipped book entries
    pub fn book_entries_skipped(&self, asset_id: &str, count: usize) -> EngineMetric {
        EngineMetric::counter(self.source.clone(), metric_names::BOOK_ENTRIES_SKIPPED, Decimal::from(count))
            .with_label("asset", asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metric_creation() {
        let metric = EngineMetric::gauge("paper", "test.metric", dec!(42)).with_label("asset", "0xabc");

        assert_eq!(metric.source, "paper");
        assert_eq!(metric.metric_name, "test.metric");
        assert_eq!(metric.value, dec!(42));
        assert_eq!(metric.metric_type, MetricType::Gauge);
        assert_eq!(metric.labels.get("asset"), Some(&"0xabc".to_string()));
    }

    #[test]
    fn test_snapshot_metrics() {
        let snapshot = PerformanceSnapshot {
            timestamp: Utc::now(),
            starting_cash: dec!(1000),
            cash_balance: dec!(900),
            portfolio_value: dec!(1050),
            peak_equity: dec!(1100),
            max_drawdown: dec!(0.05),
            total_trades_executed: 4,
            total_actions: 9,
            winning_trades: 1,
            losing_trades: 3,
            open_positions: 2,
        };

        let metrics = MetricBuilder::new("paper").from_snapshot(&snapshot);
        let find = |name: &str| metrics.iter().find(|m| m.metric_name == name).map(|m| m.value);

        assert_eq!(find(metric_names::CASH_USD), Some(dec!(900)));
        assert_eq!(find(metric_names::WIN_RATE), Some(dec!(0.25)));
        assert_eq!(find(metric_names::ACTIONS), Some(dec!(9)));
        assert!(metrics.iter().all(|m| m.timestamp == snapshot.timestamp));
    }
}
