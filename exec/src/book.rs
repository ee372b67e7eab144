//! Local order book model
//!
//! Price-ordered view of resting liquidity for one outcome token, kept in sync
//! from incremental depth updates. Both sides are `BTreeMap<price, size>`;
//! the best bid is the last bid key and the best ask the first ask key.
//!
//! A price level with size zero is never stored: a zero-size update deletes
//! the level.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::error::ExecError;

/// Order book shared between a feed handler and delayed fills
pub type SharedBook = Arc<RwLock<OrderBook>>;

/// Best bid reported for an empty bid side
pub const EMPTY_BID_PRICE: Decimal = Decimal::ZERO;

/// Best ask reported for an empty ask side ("no sellers")
pub const EMPTY_ASK_PRICE: Decimal = Decimal::ONE;

/// One price level as it arrives on the wire (decimal strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLevel {
    pub price: String,
    pub size: String,
}

impl RawLevel {
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }

    /// Parse into a typed `(price, size)` pair
    pub fn parse(&self) -> Result<(Decimal, Decimal), ExecError> {
        let malformed = |reason: String| ExecError::MalformedBookEntry {
            price: self.price.clone(),
            size: self.size.clone(),
            reason,
        };

        let price = Decimal::from_str(self.price.trim())
            .map_err(|e| malformed(format!("bad price: {}", e)))?;
        let size = Decimal::from_str(self.size.trim())
            .map_err(|e| malformed(format!("bad size: {}", e)))?;

        if price < Decimal::ZERO || price > Decimal::ONE {
            return Err(malformed("price outside [0, 1]".to_string()));
        }
        if size < Decimal::ZERO {
            return Err(malformed("negative size".to_string()));
        }

        Ok((price, size))
    }
}

/// Result of applying a raw depth update
#[derive(Debug, Default)]
pub struct DeltaSummary {
    /// Entries written or deleted
    pub applied: usize,
    /// Entries that could not be parsed, in input order
    pub skipped: Vec<ExecError>,
}

impl DeltaSummary {
    /// True when every entry was applied
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Local order book for one asset
#[derive(Debug, Clone)]
pub struct OrderBook {
    asset_id: String,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    /// Create an empty book
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Create an empty book wrapped for sharing
    pub fn shared(asset_id: impl Into<String>) -> SharedBook {
        Arc::new(RwLock::new(Self::new(asset_id)))
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Apply typed depth changes. Size zero removes the level; later entries
    /// for the same price win.
    pub fn apply_depth_delta(&mut self, bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) {
        for &(price, size) in bids.iter().chain(asks) {
            debug_assert!(
                size >= Decimal::ZERO && price >= Decimal::ZERO && price <= Decimal::ONE,
                "invalid depth level {} @ {}",
                size,
                price
            );
        }
        for &(price, size) in bids {
            Self::set_level(&mut self.bids, price, size);
        }
        for &(price, size) in asks {
            Self::set_level(&mut self.asks, price, size);
        }
    }

    /// Apply wire-format depth changes, skipping malformed entries.
    ///
    /// A bad entry never aborts the rest of the update; it is reported in
    /// `DeltaSummary::skipped`.
    pub fn apply_raw_delta(&mut self, bids: &[RawLevel], asks: &[RawLevel]) -> DeltaSummary {
        let mut summary = DeltaSummary::default();
        Self::apply_raw_side(&mut self.bids, bids, &mut summary);
        Self::apply_raw_side(&mut self.asks, asks, &mut summary);
        summary
    }

    /// Replace both sides with a full book snapshot
    pub fn apply_snapshot(&mut self, bids: &[RawLevel], asks: &[RawLevel]) -> DeltaSummary {
        self.bids.clear();
        self.asks.clear();
        self.apply_raw_delta(bids, asks)
    }

    fn apply_raw_side(
        side: &mut BTreeMap<Decimal, Decimal>,
        levels: &[RawLevel],
        summary: &mut DeltaSummary,
    ) {
        for level in levels {
            match level.parse() {
                Ok((price, size)) => {
                    Self::set_level(side, price, size);
                    summary.applied += 1;
                }
                Err(e) => {
                    debug!(error = %e, "Skipping malformed book entry");
                    summary.skipped.push(e);
                }
            }
        }
    }

    fn set_level(side: &mut BTreeMap<Decimal, Decimal>, price: Decimal, size: Decimal) {
        if size.is_zero() {
            side.remove(&price);
        } else {
            side.insert(price, size);
        }
    }

    /// Highest bid, 0.00 when no buyers
    pub fn best_bid_price(&self) -> Decimal {
        self.bids
            .keys()
            .next_back()
            .copied()
            .unwrap_or(EMPTY_BID_PRICE)
    }

    /// Lowest ask, 1.00 when no sellers
    pub fn best_ask_price(&self) -> Decimal {
        self.asks.keys().next().copied().unwrap_or(EMPTY_ASK_PRICE)
    }

    /// Size resting at the best bid, 0 when empty
    pub fn best_bid_size(&self) -> Decimal {
        self.bids
            .values()
            .next_back()
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Size resting at the best ask, 0 when empty
    pub fn best_ask_size(&self) -> Decimal {
        self.asks.values().next().copied().unwrap_or(Decimal::ZERO)
    }

    /// Remove `shares` from the best ask level after a simulated buy
    pub fn consume_ask_liquidity(&mut self, shares: Decimal) {
        if let Some(mut entry) = self.asks.first_entry() {
            let remaining = *entry.get() - shares;
            if remaining <= Decimal::ZERO {
                entry.remove();
            } else {
                entry.insert(remaining);
            }
        }
    }

    /// Remove `shares` from the best bid level after a simulated sell
    pub fn consume_bid_liquidity(&mut self, shares: Decimal) {
        if let Some(mut entry) = self.bids.last_entry() {
            let remaining = *entry.get() - shares;
            if remaining <= Decimal::ZERO {
                entry.remove();
            } else {
                entry.insert(remaining);
            }
        }
    }

    /// Bid levels, best (highest) first
    pub fn bid_levels(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.bids.iter().rev().map(|(p, s)| (*p, *s))
    }

    /// Ask levels, best (lowest) first
    pub fn ask_levels(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.asks.iter().map(|(p, s)| (*p, *s))
    }

    /// Total size resting in the best `levels` bid levels
    pub fn bid_depth(&self, levels: usize) -> Decimal {
        self.bid_levels().take(levels).map(|(_, s)| s).sum()
    }

    /// Total size resting in the best `levels` ask levels
    pub fn ask_depth(&self, levels: usize) -> Decimal {
        self.ask_levels().take(levels).map(|(_, s)| s).sum()
    }

    /// Midpoint of the touch; None unless both sides have liquidity
    pub fn mid_price(&self) -> Option<Decimal> {
        if self.bids.is_empty() || self.asks.is_empty() {
            return None;
        }
        Some((self.best_bid_price() + self.best_ask_price()) / Decimal::TWO)
    }

    /// Ask minus bid; None unless both sides have liquidity
    pub fn spread(&self) -> Option<Decimal> {
        if self.bids.is_empty() || self.asks.is_empty() {
            return None;
        }
        Some(self.best_ask_price() - self.best_bid_price())
    }

    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
