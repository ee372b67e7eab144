//! Trade history types
//!
//! `ExecutedTrade` is the audit record appended by every fill, settlement and
//! rejection. Records are never mutated or removed once written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which outcome token a position holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeSide {
    /// YES share, pays 1.00 when the market resolves true
    Yes,
    /// NO share, pays 1.00 when the market resolves false
    No,
}

impl OutcomeSide {
    /// Price of this side given the YES price
    pub fn price_from_yes(&self, yes_price: Decimal) -> Decimal {
        match self {
            OutcomeSide::Yes => yes_price,
            OutcomeSide::No => Decimal::ONE - yes_price,
        }
    }
}

impl fmt::Display for OutcomeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeSide::Yes => write!(f, "YES"),
            OutcomeSide::No => write!(f, "NO"),
        }
    }
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
    BuyNo,
    SellNo,
    ResolveYes,
    ResolveNo,
    RejectBuy,
    RejectSell,
}

impl TradeSide {
    /// Buy-side entry for an outcome side
    pub fn buy(side: OutcomeSide) -> Self {
        match side {
            OutcomeSide::Yes => TradeSide::Buy,
            OutcomeSide::No => TradeSide::BuyNo,
        }
    }

    /// Sell-side entry for an outcome side
    pub fn sell(side: OutcomeSide) -> Self {
        match side {
            OutcomeSide::Yes => TradeSide::Sell,
            OutcomeSide::No => TradeSide::SellNo,
        }
    }

    /// Settlement entry for an outcome side
    pub fn resolve(side: OutcomeSide) -> Self {
        match side {
            OutcomeSide::Yes => TradeSide::ResolveYes,
            OutcomeSide::No => TradeSide::ResolveNo,
        }
    }

    /// Whether this entry is a rejection marker
    pub fn is_rejection(&self) -> bool {
        matches!(self, TradeSide::RejectBuy | TradeSide::RejectSell)
    }

    /// Whether this entry moved shares into the account
    pub fn is_buy(&self) -> bool {
        matches!(self, TradeSide::Buy | TradeSide::BuyNo)
    }

    /// Whether this entry moved shares out of the account for cash
    pub fn is_sell(&self) -> bool {
        matches!(self, TradeSide::Sell | TradeSide::SellNo)
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
            TradeSide::BuyNo => "BUY_NO",
            TradeSide::SellNo => "SELL_NO",
            TradeSide::ResolveYes => "RESOLVE_YES",
            TradeSide::ResolveNo => "RESOLVE_NO",
            TradeSide::RejectBuy => "REJECT_BUY",
            TradeSide::RejectSell => "REJECT_SELL",
        };
        f.pad(s)
    }
}

/// Immutable record of one ledger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTrade {
    /// Asset (outcome token) identifier
    pub asset_id: String,
    /// Simulation or wall-clock time of the event
    pub timestamp: DateTime<Utc>,
    /// Entry kind
    pub side: TradeSide,
    /// Execution price (side price for settlements, 0 or observed quote for rejections)
    pub price: Decimal,
    /// Shares moved
    pub shares: Decimal,
    /// Cash moved, net of fees
    pub dollar_value: Decimal,
    /// Fee withheld (resolution only)
    #[serde(default)]
    pub fee: Decimal,
}

impl fmt::Display for ExecutedTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<11} {} | price {:.3} | shares {:.2} | value {:.2}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.side,
            self.asset_id,
            self.price,
            self.shares,
            self.dollar_value
        )
    }
}
