//! Position ledger
//!
//! Per-asset YES/NO share counts and volume-weighted entry prices. Plain
//! arithmetic with no locking of its own: the broker only touches it while
//! holding the ledger lock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::trade::OutcomeSide;

/// Holding on one side of one asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Shares held (never negative)
    pub shares: Decimal,
    /// Volume-weighted average entry price (0 when flat)
    pub avg_entry_price: Decimal,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.shares.is_zero()
    }

    /// Cost basis of the holding
    pub fn cost_basis(&self) -> Decimal {
        self.shares * self.avg_entry_price
    }
}

/// YES and NO holdings for one asset. Never netted against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPair {
    pub yes: Position,
    pub no: Position,
}

impl PositionPair {
    pub fn side(&self, side: OutcomeSide) -> &Position {
        match side {
            OutcomeSide::Yes => &self.yes,
            OutcomeSide::No => &self.no,
        }
    }

    pub fn side_mut(&mut self, side: OutcomeSide) -> &mut Position {
        match side {
            OutcomeSide::Yes => &mut self.yes,
            OutcomeSide::No => &mut self.no,
        }
    }
}

/// Positions for every asset traded during a run
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<String, PositionPair>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position for `(asset, side)`, zero if never traded
    pub fn get(&self, asset_id: &str, side: OutcomeSide) -> Position {
        self.positions
            .get(asset_id)
            .map(|pair| *pair.side(side))
            .unwrap_or_default()
    }

    pub fn shares(&self, asset_id: &str, side: OutcomeSide) -> Decimal {
        self.get(asset_id, side).shares
    }

    pub fn avg_entry_price(&self, asset_id: &str, side: OutcomeSide) -> Decimal {
        self.get(asset_id, side).avg_entry_price
    }

    /// Overwrite share count. A flat position also resets its average price.
    pub fn set_shares(&mut self, asset_id: &str, side: OutcomeSide, shares: Decimal) {
        debug_assert!(
            shares >= Decimal::ZERO,
            "negative position for {} {}: {}",
            asset_id,
            side,
            shares
        );
        let position = self.entry(asset_id, side);
        position.shares = shares;
        if shares.is_zero() {
            position.avg_entry_price = Decimal::ZERO;
        }
    }

    pub fn set_avg_entry_price(&mut self, asset_id: &str, side: OutcomeSide, price: Decimal) {
        self.entry(asset_id, side).avg_entry_price = price;
    }

    /// Add `filled` shares bought for `spent` dollars.
    ///
    /// `avg' = (shares * avg + spent) / (shares + filled)`
    pub fn apply_buy(&mut self, asset_id: &str, side: OutcomeSide, filled: Decimal, spent: Decimal) {
        debug_assert!(filled > Decimal::ZERO, "buy of non-positive size {}", filled);
        let position = self.entry(asset_id, side);
        let new_shares = position.shares + filled;
        position.avg_entry_price = (position.cost_basis() + spent) / new_shares;
        position.shares = new_shares;
    }

    /// Remove `filled` shares. The average price is kept unless the
    /// position reaches exactly zero.
    pub fn apply_sell(&mut self, asset_id: &str, side: OutcomeSide, filled: Decimal) {
        let position = self.entry(asset_id, side);
        let remaining = position.shares - filled;
        debug_assert!(
            remaining >= Decimal::ZERO,
            "sell of {} exceeds position {} for {} {}",
            filled,
            position.shares,
            asset_id,
            side
        );
        position.shares = remaining;
        if remaining.is_zero() {
            position.avg_entry_price = Decimal::ZERO;
        }
    }

    /// Zero one side and return what it held
    pub fn close(&mut self, asset_id: &str, side: OutcomeSide) -> Position {
        let position = self.entry(asset_id, side);
        std::mem::take(position)
    }

    /// Assets with a non-flat position on either side
    pub fn open_assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self
            .positions
            .iter()
            .filter(|(_, pair)| !pair.yes.is_flat() || !pair.no.is_flat())
            .map(|(id, _)| id.clone())
            .collect();
        assets.sort();
        assets
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PositionPair)> {
        self.positions.iter()
    }

    fn entry(&mut self, asset_id: &str, side: OutcomeSide) -> &mut Position {
        self.positions
            .entry(asset_id.to_string())
            .or_default()
            .side_mut(side)
    }
}
