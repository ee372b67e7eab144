//! Backtesting engine implementation

use chrono::{DateTime, Utc};
use predsim_exec::{BrokerConfig, ExecutedTrade, SimulatedBroker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backtest::candles::CandleAggregator;
use crate::types::PriceTick;
use crate::{ReplayStrategy, StrategyContext, StrategyError, StrategyResult};

/// Backtesting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Broker settings; `starting_cash` is the per-market allocation
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Force-sell leftover positions at the final tick price
    #[serde(default = "default_liquidate_at_end")]
    pub liquidate_at_end: bool,

    /// Settle at this outcome price (YES terms) instead of liquidating
    #[serde(default)]
    pub resolution_price: Option<Decimal>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            liquidate_at_end: default_liquidate_at_end(),
            resolution_price: None,
        }
    }
}

impl BacktestConfig {
    /// Load from a YAML string
    pub fn from_yaml(yaml: &str) -> StrategyResult<Self> {
        let config: BacktestConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML or JSON file (by extension)
    pub fn from_file(path: impl AsRef<Path>) -> StrategyResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StrategyResult<()> {
        self.broker.validate()?;
        if let Some(price) = self.resolution_price {
            if price < Decimal::ZERO || price > Decimal::ONE {
                return Err(StrategyError::ConfigError(format!(
                    "resolution_price {} must be in [0, 1]",
                    price
                )));
            }
        }
        Ok(())
    }
}

fn default_liquidate_at_end() -> bool {
    true
}

/// Single-market backtest result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Market replayed
    pub asset_id: String,

    /// Strategy name
    pub strategy: String,

    /// Starting capital in USD
    pub starting_capital: Decimal,

    /// Final capital (cash plus marked positions)
    pub final_capital: Decimal,

    /// Total return (absolute)
    pub total_return: Decimal,

    /// Total return (percentage)
    pub total_return_pct: Decimal,

    /// Maximum drawdown (fraction of peak)
    pub max_drawdown: Decimal,

    /// Win rate (fraction of classified trades)
    pub win_rate: Decimal,

    pub winning_trades: u64,

    pub losing_trades: u64,

    /// Closing trades (sells and resolutions)
    pub num_trades: u64,

    /// All buy and sell actions
    pub num_actions: u64,

    /// Trade ledger in execution order
    pub trades: Vec<ExecutedTrade>,

    /// Portfolio value after every tick, plus the post-settlement point
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
}

/// Aggregate over a multi-market backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    /// Markets that had data and were replayed
    pub markets_traded: usize,

    pub total_starting_capital: Decimal,

    pub total_ending_capital: Decimal,

    /// Total return (percentage)
    pub total_return_pct: Decimal,

    pub total_trades: u64,

    pub winning_trades: u64,

    pub losing_trades: u64,

    /// Win rate (fraction of classified trades)
    pub win_rate: Decimal,

    /// Every market's ledger, concatenated in replay order
    pub master_ledger: Vec<ExecutedTrade>,

    /// Per-market results
    pub markets: Vec<BacktestResult>,
}

/// Event-driven backtesting engine
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine
    pub fn new(config: BacktestConfig) -> StrategyResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay one market's ticks through `strategy` with a fresh broker
    ///
    /// # Arguments
    /// * `strategy` - Strategy to backtest
    /// * `ticks` - Trade prints for a single asset, in non-decreasing time order
    pub async fn run_market(
        &self,
        strategy: &mut ReplayStrategy,
        ticks: &[PriceTick],
    ) -> StrategyResult<BacktestResult> {
        let first = ticks.first().ok_or_else(|| {
            StrategyError::InsufficientData("No historical data provided".to_string())
        })?;
        validate_stream(ticks)?;

        let asset_id = first.asset_id.clone();
        let metadata = strategy.metadata();
        let broker = Arc::new(SimulatedBroker::new(self.config.broker.clone()));
        let mut ctx = StrategyContext::new(format!("backtest:{}", metadata.name), Arc::clone(&broker))?;

        info!(
            asset_id = %asset_id,
            strategy = %metadata.name,
            ticks = ticks.len(),
            starting_cash = %self.config.broker.starting_cash,
            "Starting market backtest"
        );

        let mut aggregator = match strategy {
            ReplayStrategy::Candle(s) => {
                let timeframe = s.timeframe();
                if timeframe <= chrono::Duration::zero() {
                    return Err(StrategyError::InvalidParameter(format!(
                        "{} candle timeframe must be positive, got {}",
                        metadata.name, timeframe
                    )));
                }
                Some(CandleAggregator::new(timeframe))
            }
            ReplayStrategy::Tick(_) => None,
        };

        let mut equity_curve = Vec::with_capacity(ticks.len() + 1);

        for tick in ticks {
            broker.set_clock(tick.timestamp);
            broker.update_last_known_price(&tick.asset_id, tick.price);

            let outcome = match (&mut *strategy, aggregator.as_mut()) {
                (ReplayStrategy::Tick(s), _) => s.on_tick(tick, &mut ctx).await,
                (ReplayStrategy::Candle(s), Some(agg)) => match agg.push(tick) {
                    Some(candle) => s.on_candle(&candle, &mut ctx).await,
                    None => Ok(()),
                },
                (ReplayStrategy::Candle(_), None) => Ok(()),
            };
            tolerate_market_conditions(outcome)?;

            equity_curve.push((tick.timestamp, broker.mark_equity()));
        }

        if let (ReplayStrategy::Candle(s), Some(agg)) = (&mut *strategy, aggregator.as_mut()) {
            if let Some(candle) = agg.flush() {
                tolerate_market_conditions(s.on_candle(&candle, &mut ctx).await)?;
            }
        }

        let last = &ticks[ticks.len() - 1];
        self.settle(&broker, &asset_id, last.price);
        equity_curve.push((last.timestamp, broker.mark_equity()));

        let snapshot = broker.snapshot();
        let result = BacktestResult {
            asset_id,
            strategy: metadata.name,
            starting_capital: snapshot.starting_cash,
            final_capital: snapshot.portfolio_value,
            total_return: snapshot.total_return(),
            total_return_pct: snapshot.return_pct(),
            max_drawdown: snapshot.max_drawdown,
            win_rate: snapshot.win_rate(),
            winning_trades: snapshot.winning_trades,
            losing_trades: snapshot.losing_trades,
            num_trades: snapshot.total_trades_executed,
            num_actions: snapshot.total_actions,
            trades: broker.trades(),
            equity_curve,
        };

        info!(
            asset_id = %result.asset_id,
            final_capital = %result.final_capital,
            return_pct = %result.total_return_pct.round_dp(2),
            trades = result.num_trades,
            "Market backtest complete"
        );

        Ok(result)
    }

    /// Replay several markets, each with its own isolated broker funded with
    /// `broker.starting_cash`. Markets without ticks are skipped.
    ///
    /// `make_strategy` is called once per market so strategy state never
    /// leaks between markets.
    pub async fn run_portfolio<F>(
        &self,
        markets: &[(String, Vec<PriceTick>)],
        mut make_strategy: F,
    ) -> StrategyResult<PortfolioResult>
    where
        F: FnMut(&str) -> ReplayStrategy,
    {
        let mut results = Vec::new();

        for (asset_id, ticks) in markets {
            let Some(first) = ticks.first() else {
                debug!(asset_id = %asset_id, "No ticks for market, skipping");
                continue;
            };
            if first.asset_id != *asset_id {
                return Err(StrategyError::MarketNotFound(format!(
                    "{} (ticks supplied are for {})",
                    asset_id, first.asset_id
                )));
            }
            let mut strategy = make_strategy(asset_id);
            results.push(self.run_market(&mut strategy, ticks).await?);
        }

        let allocation = self.config.broker.starting_cash;
        let total_starting_capital = allocation * Decimal::from(results.len());
        let total_ending_capital: Decimal = results.iter().map(|r| r.final_capital).sum();
        let total_trades: u64 = results.iter().map(|r| r.num_trades).sum();
        let winning_trades: u64 = results.iter().map(|r| r.winning_trades).sum();
        let losing_trades: u64 = results.iter().map(|r| r.losing_trades).sum();

        let total_return_pct = if total_starting_capital.is_zero() {
            Decimal::ZERO
        } else {
            (total_ending_capital - total_starting_capital) / total_starting_capital * Decimal::ONE_HUNDRED
        };
        let classified = winning_trades + losing_trades;
        let win_rate = if classified == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(winning_trades) / Decimal::from(classified)
        };

        let master_ledger = results.iter().flat_map(|r| r.trades.iter().cloned()).collect();

        info!(
            markets = results.len(),
            starting_capital = %total_starting_capital,
            ending_capital = %total_ending_capital,
            "Portfolio backtest complete"
        );

        Ok(PortfolioResult {
            markets_traded: results.len(),
            total_starting_capital,
            total_ending_capital,
            total_return_pct,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            master_ledger,
            markets: results,
        })
    }

    fn settle(&self, broker: &SimulatedBroker, asset_id: &str, final_price: Decimal) {
        if let Some(outcome) = self.config.resolution_price {
            broker.resolve_market(asset_id, outcome);
        } else if self.config.liquidate_at_end {
            let closed = broker.liquidate(asset_id, final_price);
            if closed > Decimal::ZERO {
                debug!(asset_id = %asset_id, shares = %closed, price = %final_price, "Liquidated leftover position");
            }
        }
    }
}

/// Reject empty, mixed-asset or time-reversed streams and out-of-range ticks
fn validate_stream(ticks: &[PriceTick]) -> StrategyResult<()> {
    let Some(first) = ticks.first() else {
        return Ok(());
    };

    for tick in ticks {
        tick.validate()?;
        if tick.asset_id != first.asset_id {
            return Err(StrategyError::InvalidData(format!(
                "tick for {} in replay of {}",
                tick.asset_id, first.asset_id
            )));
        }
    }

    for pair in ticks.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(StrategyError::InvalidData(format!(
                "timestamp {} precedes {} for {}",
                pair[1].timestamp, pair[0].timestamp, first.asset_id
            )));
        }
    }

    Ok(())
}

/// Market conditions are logged and the replay continues; anything else aborts
fn tolerate_market_conditions(outcome: StrategyResult<()>) -> StrategyResult<()> {
    match outcome {
        Err(e) if e.is_market_condition() => {
            warn!(error = %e, "Strategy hit a market condition, continuing");
            Ok(())
        }
        other => other,
    }
}
