//! Paper trading driver
//!
//! Runs book-driven strategies against a live order-book feed. Every asset
//! gets its own local book and its own strategy instance, both created the
//! first time the asset shows up on the feed. All strategies share one
//! broker and one execution simulator, so the in-flight guard spans the
//! whole run.

use dashmap::DashMap;
use predsim_exec::{
    BrokerConfig, ExecutionSimulator, OrderBook, PerformanceSnapshot, SharedBook, SimulatedBroker,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics::{EngineMetric, MetricBuilder};
use crate::types::BookEvent;
use crate::{BookStrategy, StrategyContext, StrategyError, StrategyResult};

/// Paper trading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTradingConfig {
    /// Broker settings, including order latency
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Seconds between heartbeat snapshots
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for PaperTradingConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl PaperTradingConfig {
    /// Load from a YAML string
    pub fn from_yaml(yaml: &str) -> StrategyResult<Self> {
        let config: PaperTradingConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML or JSON file (by extension)
    pub fn from_file(path: impl AsRef<Path>) -> StrategyResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: PaperTradingConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StrategyResult<()> {
        self.broker.validate()?;
        if self.heartbeat_interval_secs == 0 {
            return Err(StrategyError::ConfigError(
                "heartbeat_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

/// Live-feed driver for book-driven strategies
pub struct PaperTrader<F> {
    config: PaperTradingConfig,
    broker: Arc<SimulatedBroker>,
    executor: ExecutionSimulator,
    books: Arc<DashMap<String, SharedBook>>,
    strategies: HashMap<String, (Box<dyn BookStrategy>, StrategyContext)>,
    make_strategy: F,
    metrics: MetricBuilder,
    pending_metrics: Vec<EngineMetric>,
    latest_metrics: Vec<EngineMetric>,
    events_processed: u64,
}

impl<F> PaperTrader<F>
where
    F: FnMut(&str) -> Box<dyn BookStrategy> + Send,
{
    /// Create a trader with a fresh broker.
    ///
    /// `make_strategy` is called once per asset, on the asset's first event.
    /// Must be called inside a tokio runtime when latency is configured.
    pub fn new(config: PaperTradingConfig, make_strategy: F) -> StrategyResult<Self> {
        config.validate()?;
        let broker = Arc::new(SimulatedBroker::new(config.broker.clone()));
        let executor = ExecutionSimulator::new(Arc::clone(&broker))?;

        Ok(Self {
            config,
            broker,
            executor,
            books: Arc::new(DashMap::new()),
            strategies: HashMap::new(),
            make_strategy,
            metrics: MetricBuilder::new("paper"),
            pending_metrics: Vec::new(),
            latest_metrics: Vec::new(),
            events_processed: 0,
        })
    }

    pub fn broker(&self) -> &Arc<SimulatedBroker> {
        &self.broker
    }

    /// Local book for an asset, if it has been seen on the feed
    pub fn book(&self, asset_id: &str) -> Option<SharedBook> {
        self.books.get(asset_id).map(|b| Arc::clone(b.value()))
    }

    /// Shared handle to every local book, readable while the trader runs
    pub fn book_registry(&self) -> Arc<DashMap<String, SharedBook>> {
        Arc::clone(&self.books)
    }

    /// Number of assets with a live strategy instance
    pub fn active_assets(&self) -> usize {
        self.strategies.len()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Metrics from the most recent heartbeat, including driver and
    /// strategy metrics collected since the previous one
    pub fn latest_metrics(&self) -> &[EngineMetric] {
        &self.latest_metrics
    }

    /// Consume book events until the feed closes or `shutdown` turns true.
    ///
    /// Dropping the shutdown sender also stops the run. Returns the final
    /// performance snapshot.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<BookEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> StrategyResult<PerformanceSnapshot> {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        heartbeat.tick().await;

        info!(
            starting_cash = %self.config.broker.starting_cash,
            latency_ms = self.config.broker.latency_ms,
            "Paper trading started"
        );

        if *shutdown.borrow() {
            info!("Shutdown requested before start");
            return Ok(self.broker.snapshot());
        }

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        info!("Book feed closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
                _ = heartbeat.tick() => self.emit_heartbeat(),
            }
        }

        self.emit_heartbeat();
        let snapshot = self.broker.snapshot();
        info!(
            events = self.events_processed,
            portfolio_value = %snapshot.portfolio_value,
            trades = snapshot.total_trades_executed,
            "Paper trading stopped"
        );
        Ok(snapshot)
    }

    /// Apply one book event and dispatch it to the asset's strategy
    pub async fn handle_event(&mut self, event: BookEvent) -> StrategyResult<()> {
        self.events_processed += 1;
        let asset_id = event.asset_id;

        let book = Arc::clone(
            self.books
                .entry(asset_id.clone())
                .or_insert_with(|| OrderBook::shared(asset_id.as_str()))
                .value(),
        );

        let (summary, mid) = {
            let mut guard = book.write();
            let summary = if event.snapshot {
                guard.apply_snapshot(&event.bids, &event.asks)
            } else {
                guard.apply_raw_delta(&event.bids, &event.asks)
            };
            (summary, guard.mid_price())
        };

        if !summary.is_clean() {
            for error in &summary.skipped {
                warn!(asset_id = %asset_id, error = %error, "Skipped malformed book entry");
            }
            self.pending_metrics
                .push(self.metrics.book_entries_skipped(&asset_id, summary.skipped.len()));
        }

        if let Some(mid) = mid {
            self.broker.update_last_known_price(&asset_id, mid);
        }

        let (strategy, ctx) = match self.strategies.entry(asset_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let strategy = (self.make_strategy)(&asset_id);
                let name = strategy.metadata().name;
                info!(asset_id = %asset_id, strategy = %name, "Starting strategy for new asset");
                let ctx = StrategyContext::with_executor(format!("{}:{}", name, asset_id), self.executor.clone());
                entry.insert((strategy, ctx))
            }
        };

        match strategy.on_book_update(&asset_id, &book, ctx).await {
            Err(e) if e.is_market_condition() => {
                debug!(asset_id = %asset_id, error = %e, "Strategy hit a market condition");
                Ok(())
            }
            other => other,
        }
    }

    fn emit_heartbeat(&mut self) {
        let snapshot = self.broker.snapshot();
        let mut metrics = self.metrics.from_snapshot(&snapshot);
        metrics.append(&mut self.pending_metrics);
        for (_, ctx) in self.strategies.values_mut() {
            metrics.extend(ctx.drain_metrics());
        }

        info!(
            cash = %snapshot.cash_balance,
            portfolio_value = %snapshot.portfolio_value,
            drawdown = %snapshot.max_drawdown,
            trades = snapshot.total_trades_executed,
            open_positions = snapshot.open_positions,
            in_flight = self.executor.in_flight().len(),
            "Heartbeat"
        );

        self.latest_metrics = metrics;
    }
}
