//! Core types for the strategy framework

use chrono::{DateTime, Utc};
use predsim_exec::RawLevel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{StrategyError, StrategyResult};

/// One historical trade print for an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Asset (outcome token) identifier
    pub asset_id: String,
    /// Trade timestamp
    pub timestamp: DateTime<Utc>,
    /// Trade price (YES terms, in [0, 1])
    pub price: Decimal,
    /// Trade size in shares
    pub size: Decimal,
}

impl PriceTick {
    pub fn new(asset_id: impl Into<String>, timestamp: DateTime<Utc>, price: Decimal, size: Decimal) -> Self {
        Self {
            asset_id: asset_id.into(),
            timestamp,
            price,
            size,
        }
    }

    /// Check price and size ranges
    pub fn validate(&self) -> StrategyResult<()> {
        if self.price < Decimal::ZERO || self.price > Decimal::ONE {
            return Err(StrategyError::InvalidData(format!(
                "tick price {} for {} outside [0, 1]",
                self.price, self.asset_id
            )));
        }
        if self.size < Decimal::ZERO {
            return Err(StrategyError::InvalidData(format!(
                "negative tick size {} for {}",
                self.size, self.asset_id
            )));
        }
        Ok(())
    }
}

/// OHLCV bar aggregated from ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub asset_id: String,
    /// Timestamp of the first tick in the bar
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Open a new bar at `tick`
    pub fn open_at(tick: &PriceTick) -> Self {
        Self {
            asset_id: tick.asset_id.clone(),
            open_time: tick.timestamp,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.size,
        }
    }

    /// Fold a tick into the bar
    pub fn absorb(&mut self, tick: &PriceTick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.volume += tick.size;
    }
}

/// Live order-book update for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEvent {
    pub asset_id: String,
    #[serde(default)]
    pub bids: Vec<RawLevel>,
    #[serde(default)]
    pub asks: Vec<RawLevel>,
    /// Full book replacement rather than an incremental delta
    #[serde(default)]
    pub snapshot: bool,
}

impl BookEvent {
    /// Incremental depth update
    pub fn delta(asset_id: impl Into<String>, bids: Vec<RawLevel>, asks: Vec<RawLevel>) -> Self {
        Self {
            asset_id: asset_id.into(),
            bids,
            asks,
            snapshot: false,
        }
    }

    /// Full book snapshot
    pub fn snapshot(asset_id: impl Into<String>, bids: Vec<RawLevel>, asks: Vec<RawLevel>) -> Self {
        Self {
            asset_id: asset_id.into(),
            bids,
            asks,
            snapshot: true,
        }
    }
}

/// Strategy metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyMetadata {
    /// Strategy name
    pub name: String,

    /// Strategy version
    pub version: String,

    /// Strategy description
    pub description: String,
}
