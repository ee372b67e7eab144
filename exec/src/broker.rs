//! Simulated broker
//!
//! Owns cash, the position ledger, the trade history and performance
//! counters for one simulation run. Every mutating operation runs under a
//! single ledger lock so cash, a position pair and the history move together.
//! Valuation prices live outside the lock in a concurrent map; a slightly
//! stale valuation is acceptable, stale cash is not.
//!
//! Lock order is always ledger lock, then price map. Nothing takes the price
//! map first and then waits on the ledger lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::ledger::{Position, PositionLedger, PositionPair};
use crate::trade::{ExecutedTrade, OutcomeSide, TradeSide};

/// Orders at or below this dollar amount are ignored
pub const MIN_ORDER_DOLLARS: Decimal = dec!(0.01);

/// Highest price a buy can execute at
pub const MAX_EXECUTION_PRICE: Decimal = dec!(0.99);

/// Lowest price a sell can execute at
pub const MIN_EXECUTION_PRICE: Decimal = dec!(0.01);

/// NO valuation price for an asset with no known YES price
pub const UNKNOWN_NO_VALUATION: Decimal = dec!(0.50);

/// Point-in-time view of account performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub starting_cash: Decimal,
    pub cash_balance: Decimal,
    pub portfolio_value: Decimal,
    pub peak_equity: Decimal,
    /// Largest fractional drop from peak equity seen so far
    pub max_drawdown: Decimal,
    pub total_trades_executed: u64,
    pub total_actions: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub open_positions: usize,
}

impl PerformanceSnapshot {
    /// Winning share of classified trades, 0 when none
    pub fn win_rate(&self) -> Decimal {
        let classified = self.winning_trades + self.losing_trades;
        if classified == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(classified)
    }

    /// Portfolio value minus starting cash
    pub fn total_return(&self) -> Decimal {
        self.portfolio_value - self.starting_cash
    }

    /// Return as a percentage of starting cash
    pub fn return_pct(&self) -> Decimal {
        if self.starting_cash.is_zero() {
            return Decimal::ZERO;
        }
        self.total_return() / self.starting_cash * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug)]
struct AccountState {
    cash: Decimal,
    ledger: PositionLedger,
    trades: Vec<ExecutedTrade>,
    total_trades_executed: u64,
    total_actions: u64,
    winning_trades: u64,
    losing_trades: u64,
    peak_equity: Decimal,
    max_drawdown: Decimal,
    clock: Option<DateTime<Utc>>,
}

impl AccountState {
    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn record(
        &mut self,
        asset_id: &str,
        side: TradeSide,
        price: Decimal,
        shares: Decimal,
        dollar_value: Decimal,
        fee: Decimal,
    ) {
        let timestamp = self.now();
        self.trades.push(ExecutedTrade {
            asset_id: asset_id.to_string(),
            timestamp,
            side,
            price,
            shares,
            dollar_value,
            fee,
        });
    }

    fn classify(&mut self, exit_price: Decimal, entry_price: Decimal) {
        // Ties count as losses
        if exit_price > entry_price {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
    }

    fn portfolio_value(&self, prices: &DashMap<String, Decimal>) -> Decimal {
        let mut value = self.cash;
        for (asset_id, pair) in self.ledger.iter() {
            let last = prices.get(asset_id).map(|p| *p);
            if !pair.yes.is_flat() {
                value += pair.yes.shares * last.unwrap_or(Decimal::ZERO);
            }
            if !pair.no.is_flat() {
                let no_price = last
                    .map(|p| Decimal::ONE - p)
                    .unwrap_or(UNKNOWN_NO_VALUATION);
                value += pair.no.shares * no_price;
            }
        }
        value
    }

    fn mark_equity(&mut self, prices: &DashMap<String, Decimal>) -> Decimal {
        let equity = self.portfolio_value(prices);
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        equity
    }
}

/// Accounting engine for a single-agent binary-outcome simulation
///
/// Construct one per run and share it by `Arc`. All operations take `&self`.
#[derive(Debug)]
pub struct SimulatedBroker {
    config: BrokerConfig,
    state: Mutex<AccountState>,
    last_prices: DashMap<String, Decimal>,
}

impl SimulatedBroker {
    /// Create a broker funded with `config.starting_cash`
    pub fn new(config: BrokerConfig) -> Self {
        let state = AccountState {
            cash: config.starting_cash,
            ledger: PositionLedger::new(),
            trades: Vec::new(),
            total_trades_executed: 0,
            total_actions: 0,
            winning_trades: 0,
            losing_trades: 0,
            peak_equity: config.starting_cash,
            max_drawdown: Decimal::ZERO,
            clock: None,
        };

        Self {
            config,
            state: Mutex::new(state),
            last_prices: DashMap::new(),
        }
    }

    /// Create a broker with default pricing and the given cash
    pub fn with_starting_cash(starting_cash: Decimal) -> Self {
        Self::new(BrokerConfig::with_starting_cash(starting_cash))
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Stamp subsequent trade records with `now` instead of wall-clock time
    pub fn set_clock(&self, now: DateTime<Utc>) {
        self.state.lock().clock = Some(now);
    }

    /// Buy YES shares with up to `dollars_to_invest`. Returns shares filled.
    pub fn buy(
        &self,
        asset_id: &str,
        quoted_price: Decimal,
        dollars_to_invest: Decimal,
        available_shares: Decimal,
    ) -> Decimal {
        self.execute_buy(
            asset_id,
            OutcomeSide::Yes,
            quoted_price,
            dollars_to_invest,
            available_shares,
        )
    }

    /// Sell the whole YES position into the bid. Returns shares filled.
    pub fn sell_all(&self, asset_id: &str, quoted_price: Decimal, available_shares: Decimal) -> Decimal {
        self.execute_sell(
            asset_id,
            OutcomeSide::Yes,
            quoted_price,
            Some(available_shares * self.config.max_participation_rate),
        )
    }

    /// Buy NO shares priced at `1 - quoted_yes_price`. Returns shares filled.
    pub fn buy_no(
        &self,
        asset_id: &str,
        quoted_yes_price: Decimal,
        dollars_to_invest: Decimal,
        available_shares: Decimal,
    ) -> Decimal {
        self.execute_buy(
            asset_id,
            OutcomeSide::No,
            quoted_yes_price,
            dollars_to_invest,
            available_shares,
        )
    }

    /// Sell the whole NO position at `1 - quoted_yes_price`. Returns shares filled.
    pub fn sell_all_no(
        &self,
        asset_id: &str,
        quoted_yes_price: Decimal,
        available_shares: Decimal,
    ) -> Decimal {
        self.execute_sell(
            asset_id,
            OutcomeSide::No,
            quoted_yes_price,
            Some(available_shares * self.config.max_participation_rate),
        )
    }

    /// Force-close both sides at `yes_price`, ignoring the participation cap.
    /// Returns total shares closed.
    pub fn liquidate(&self, asset_id: &str, yes_price: Decimal) -> Decimal {
        let yes = self.execute_sell(asset_id, OutcomeSide::Yes, yes_price, None);
        let no = self.execute_sell(asset_id, OutcomeSide::No, yes_price, None);
        yes + no
    }

    /// Settle every held side of `asset_id` at `outcome_price` (YES terms).
    ///
    /// Fee is charged on profit only. Returns net cash credited. A second
    /// call on an already-settled asset is a no-op returning zero.
    pub fn resolve_market(&self, asset_id: &str, outcome_price: Decimal) -> Decimal {
        self.last_prices.insert(asset_id.to_string(), outcome_price);

        let mut state = self.state.lock();
        let mut total_net = Decimal::ZERO;
        let mut settled = false;

        for side in [OutcomeSide::Yes, OutcomeSide::No] {
            let position = state.ledger.get(asset_id, side);
            if position.shares <= Decimal::ZERO {
                continue;
            }

            let side_price = side.price_from_yes(outcome_price);
            let gross = position.shares * side_price;
            let profit = ((side_price - position.avg_entry_price) * position.shares).max(Decimal::ZERO);
            let fee = profit * self.config.resolution_fee_rate;
            let net = gross - fee;

            state.cash += net;
            state.classify(side_price, position.avg_entry_price);
            state.ledger.close(asset_id, side);
            state.record(
                asset_id,
                TradeSide::resolve(side),
                side_price,
                position.shares,
                net,
                fee,
            );

            info!(
                asset_id = %asset_id,
                side = %side,
                shares = %position.shares,
                payout = %net,
                fee = %fee,
                "Market side resolved"
            );

            total_net += net;
            settled = true;
        }

        if settled {
            state.total_trades_executed += 1;
            state.mark_equity(&self.last_prices);
        }

        total_net
    }

    /// Append a zero-size REJECT record for an order that did not fill
    pub fn record_rejection(&self, asset_id: &str, side: TradeSide, price: Decimal) {
        debug_assert!(side.is_rejection(), "{} is not a rejection kind", side);
        let mut state = self.state.lock();
        state.record(asset_id, side, price, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        debug!(asset_id = %asset_id, side = %side, price = %price, "Order rejected");
    }

    /// Cash plus positions marked at last known prices
    pub fn total_portfolio_value(&self) -> Decimal {
        let state = self.state.lock();
        state.portfolio_value(&self.last_prices)
    }

    /// Re-mark equity and update peak/drawdown. Returns current equity.
    pub fn mark_equity(&self) -> Decimal {
        let mut state = self.state.lock();
        state.mark_equity(&self.last_prices)
    }

    /// Consistent view of account performance
    pub fn snapshot(&self) -> PerformanceSnapshot {
        let state = self.state.lock();
        PerformanceSnapshot {
            timestamp: state.now(),
            starting_cash: self.config.starting_cash,
            cash_balance: state.cash,
            portfolio_value: state.portfolio_value(&self.last_prices),
            peak_equity: state.peak_equity,
            max_drawdown: state.max_drawdown,
            total_trades_executed: state.total_trades_executed,
            total_actions: state.total_actions,
            winning_trades: state.winning_trades,
            losing_trades: state.losing_trades,
            open_positions: state.ledger.open_assets().len(),
        }
    }

    pub fn cash_balance(&self) -> Decimal {
        self.state.lock().cash
    }

    pub fn position(&self, asset_id: &str, side: OutcomeSide) -> Position {
        self.state.lock().ledger.get(asset_id, side)
    }

    /// Every asset with a non-flat position, sorted by asset id
    pub fn open_positions(&self) -> Vec<(String, PositionPair)> {
        let state = self.state.lock();
        state
            .ledger
            .open_assets()
            .into_iter()
            .map(|asset_id| {
                let pair = PositionPair {
                    yes: state.ledger.get(&asset_id, OutcomeSide::Yes),
                    no: state.ledger.get(&asset_id, OutcomeSide::No),
                };
                (asset_id, pair)
            })
            .collect()
    }

    /// Full trade history in append order
    pub fn trades(&self) -> Vec<ExecutedTrade> {
        self.state.lock().trades.clone()
    }

    pub fn trades_for(&self, asset_id: &str) -> Vec<ExecutedTrade> {
        self.state
            .lock()
            .trades
            .iter()
            .filter(|t| t.asset_id == asset_id)
            .cloned()
            .collect()
    }

    pub fn trade_count(&self) -> usize {
        self.state.lock().trades.len()
    }

    /// Valuation price, served without the ledger lock
    pub fn last_known_price(&self, asset_id: &str) -> Option<Decimal> {
        self.last_prices.get(asset_id).map(|p| *p)
    }

    pub fn update_last_known_price(&self, asset_id: &str, price: Decimal) {
        self.last_prices.insert(asset_id.to_string(), price);
    }

    fn execute_buy(
        &self,
        asset_id: &str,
        side: OutcomeSide,
        quoted_yes_price: Decimal,
        dollars_to_invest: Decimal,
        available_shares: Decimal,
    ) -> Decimal {
        debug_assert!(
            dollars_to_invest >= Decimal::ZERO,
            "negative dollars_to_invest {}",
            dollars_to_invest
        );
        debug_assert!(
            available_shares >= Decimal::ZERO,
            "negative available_shares {}",
            available_shares
        );

        self.update_last_known_price(asset_id, quoted_yes_price);

        let mut state = self.state.lock();
        if dollars_to_invest <= MIN_ORDER_DOLLARS || state.cash < dollars_to_invest {
            debug!(
                asset_id = %asset_id,
                side = %side,
                requested = %dollars_to_invest,
                cash = %state.cash,
                "Buy skipped: insufficient funds or dust order"
            );
            return Decimal::ZERO;
        }

        let quoted = side.price_from_yes(quoted_yes_price);
        let execution_price = (quoted + self.config.spread_penalty).min(MAX_EXECUTION_PRICE);
        if execution_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let desired = dollars_to_invest / execution_price;
        let mut filled = desired.min(available_shares * self.config.max_participation_rate);

        // The penalty can push cost past cash even though the pre-check passed
        if filled * execution_price > state.cash {
            filled = state.cash / execution_price;
        }

        if filled <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        // Rounding guard for the recomputed fill
        let spent = (filled * execution_price).min(state.cash);

        state.ledger.apply_buy(asset_id, side, filled, spent);
        state.cash -= spent;
        state.total_actions += 1;
        state.record(
            asset_id,
            TradeSide::buy(side),
            execution_price,
            filled,
            spent,
            Decimal::ZERO,
        );

        debug_assert!(state.cash >= Decimal::ZERO, "cash went negative: {}", state.cash);

        debug!(
            asset_id = %asset_id,
            side = %side,
            price = %execution_price,
            shares = %filled,
            spent = %spent,
            "Buy filled"
        );

        filled
    }

    /// `cap` bounds the shares sold; `None` sells the whole position
    fn execute_sell(
        &self,
        asset_id: &str,
        side: OutcomeSide,
        quoted_yes_price: Decimal,
        cap: Option<Decimal>,
    ) -> Decimal {
        self.update_last_known_price(asset_id, quoted_yes_price);

        let mut state = self.state.lock();
        let position = state.ledger.get(asset_id, side);
        if position.shares <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let quoted = side.price_from_yes(quoted_yes_price);
        let execution_price = (quoted - self.config.spread_penalty).max(MIN_EXECUTION_PRICE);
        let filled = match cap {
            Some(cap) => position.shares.min(cap),
            None => position.shares,
        };

        if filled <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let proceeds = filled * execution_price;

        state.classify(execution_price, position.avg_entry_price);
        state.ledger.apply_sell(asset_id, side, filled);
        state.cash += proceeds;
        state.total_trades_executed += 1;
        state.total_actions += 1;
        state.record(
            asset_id,
            TradeSide::sell(side),
            execution_price,
            filled,
            proceeds,
            Decimal::ZERO,
        );
        state.mark_equity(&self.last_prices);

        debug!(
            asset_id = %asset_id,
            side = %side,
            price = %execution_price,
            shares = %filled,
            proceeds = %proceeds,
            entry = %position.avg_entry_price,
            "Sell filled"
        );

        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn broker() -> SimulatedBroker {
        SimulatedBroker::with_starting_cash(dec!(1000))
    }

    fn close_to(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn test_buy_scenario() {
        let broker = broker();
        let filled = broker.buy("0xabc", dec!(0.40), dec!(100), dec!(1000));

        assert!(close_to(filled, dec!(240.963855)));
        assert!(close_to(broker.cash_balance(), dec!(900)));

        let trades = broker.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].price, dec!(0.415));

        let pos = broker.position("0xabc", OutcomeSide::Yes);
        assert_eq!(pos.shares, filled);
        assert!(close_to(pos.avg_entry_price, dec!(0.415)));
    }

    #[test]
    fn test_dust_and_overdraw_rejected() {
        let broker = broker();
        assert_eq!(broker.buy("0xabc", dec!(0.40), dec!(0.01), dec!(1000)), Decimal::ZERO);
        assert_eq!(broker.buy("0xabc", dec!(0.40), dec!(1000.01), dec!(1000)), Decimal::ZERO);
        assert_eq!(broker.cash_balance(), dec!(1000));
        assert!(broker.trades().is_empty());

        // The valuation price is still updated
        assert_eq!(broker.last_known_price("0xabc"), Some(dec!(0.40)));
    }

    #[test]
    fn test_participation_cap() {
        let config = BrokerConfig {
            max_participation_rate: dec!(0.5),
            ..BrokerConfig::default()
        };
        let broker = SimulatedBroker::new(config);
        let filled = broker.buy("0xabc", dec!(0.485), dec!(100), dec!(40));
        assert_eq!(filled, dec!(20));
        assert_eq!(broker.cash_balance(), dec!(990));
    }

    #[test]
    fn test_buy_price_clamped() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.995), dec!(99), dec!(1000));
        assert_eq!(broker.trades()[0].price, dec!(0.99));
        assert_eq!(broker.trades()[0].shares, dec!(100));
    }

    #[test]
    fn test_sell_all_win() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        let filled = broker.sell_all("0xabc", dec!(0.515), dec!(1000));

        assert_eq!(filled, dec!(100));
        assert_eq!(broker.cash_balance(), dec!(1010));
        assert_eq!(broker.position("0xabc", OutcomeSide::Yes), Position::default());

        let snap = broker.snapshot();
        assert_eq!(snap.winning_trades, 1);
        assert_eq!(snap.losing_trades, 0);
        assert_eq!(snap.total_trades_executed, 1);
        assert_eq!(snap.total_actions, 2);
    }

    #[test]
    fn test_tie_counts_as_loss() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        broker.sell_all("0xabc", dec!(0.415), dec!(1000));
        let snap = broker.snapshot();
        assert_eq!(snap.winning_trades, 0);
        assert_eq!(snap.losing_trades, 1);
    }

    #[test]
    fn test_partial_sell_keeps_average() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        let filled = broker.sell_all("0xabc", dec!(0.50), dec!(30));
        assert_eq!(filled, dec!(30));

        let pos = broker.position("0xabc", OutcomeSide::Yes);
        assert_eq!(pos.shares, dec!(70));
        assert_eq!(pos.avg_entry_price, dec!(0.40));
    }

    #[test]
    fn test_sell_without_position() {
        let broker = broker();
        assert_eq!(broker.sell_all("0xabc", dec!(0.50), dec!(100)), Decimal::ZERO);
        assert_eq!(broker.sell_all_no("0xabc", dec!(0.50), dec!(100)), Decimal::ZERO);
        assert!(broker.trades().is_empty());
    }

    #[test]
    fn test_sell_price_floor() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.185), dec!(20), dec!(1000));
        broker.sell_all("0xabc", dec!(0.005), dec!(1000));
        let last = broker.trades().pop().unwrap();
        assert_eq!(last.price, dec!(0.01));
        assert_eq!(last.dollar_value, dec!(1));
    }

    #[test]
    fn test_no_side_is_independent() {
        let broker = broker();
        // NO at 1 - 0.615 = 0.385, plus penalty = 0.40
        let no = broker.buy_no("0xabc", dec!(0.615), dec!(40), dec!(1000));
        let yes = broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        assert_eq!(no, dec!(100));
        assert_eq!(yes, dec!(100));

        let sold = broker.sell_all_no("0xabc", dec!(0.385), dec!(1000));
        assert_eq!(sold, dec!(100));
        assert_eq!(broker.trades().last().unwrap().side, TradeSide::SellNo);
        assert_eq!(broker.trades().last().unwrap().price, dec!(0.60));
        assert_eq!(broker.position("0xabc", OutcomeSide::Yes).shares, dec!(100));
        assert_eq!(broker.position("0xabc", OutcomeSide::No).shares, Decimal::ZERO);
    }

    #[test]
    fn test_resolution_fee_on_profit_only() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.385), dec!(4), dec!(1000));
        assert_eq!(broker.position("0xabc", OutcomeSide::Yes).shares, dec!(10));

        let net = broker.resolve_market("0xabc", dec!(1.00));
        assert_eq!(net, dec!(9.88));
        assert_eq!(broker.cash_balance(), dec!(1005.88));

        let record = broker.trades().pop().unwrap();
        assert_eq!(record.side, TradeSide::ResolveYes);
        assert_eq!(record.fee, dec!(0.12));
        assert_eq!(record.dollar_value, dec!(9.88));

        // Second call is a no-op
        assert_eq!(broker.resolve_market("0xabc", dec!(1.00)), Decimal::ZERO);
        assert_eq!(broker.trade_count(), 2);
    }

    #[test]
    fn test_resolution_of_losing_side_has_no_fee() {
        let broker = broker();
        broker.buy_no("0xabc", dec!(0.615), dec!(40), dec!(1000));
        let net = broker.resolve_market("0xabc", dec!(1.00));
        assert_eq!(net, Decimal::ZERO);

        let snap = broker.snapshot();
        assert_eq!(snap.losing_trades, 1);
        assert_eq!(snap.total_trades_executed, 1);
        assert_eq!(snap.total_actions, 1);
    }

    #[test]
    fn test_hedged_resolution_settles_both_sides() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        broker.buy_no("0xabc", dec!(0.415), dec!(56), dec!(1000));
        broker.resolve_market("0xabc", dec!(0));

        let records: Vec<_> = broker
            .trades()
            .into_iter()
            .filter(|t| matches!(t.side, TradeSide::ResolveYes | TradeSide::ResolveNo))
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(broker.snapshot().total_trades_executed, 1);
        assert!(broker.open_positions().is_empty());
    }

    #[test]
    fn test_portfolio_value_defaults() {
        let broker = broker();
        broker.buy_no("0xabc", dec!(0.615), dec!(40), dec!(1000));
        assert_eq!(broker.total_portfolio_value(), dec!(960) + dec!(100) * dec!(0.385));

        broker.update_last_known_price("0xabc", dec!(0.90));
        assert_eq!(broker.total_portfolio_value(), dec!(970));
    }

    #[test]
    fn test_drawdown_tracking() {
        let broker = broker();
        broker.buy("0xabc", dec!(0.485), dec!(500), dec!(10000));
        broker.update_last_known_price("0xabc", dec!(0.25));
        let equity = broker.mark_equity();
        assert_eq!(equity, dec!(750));

        let snap = broker.snapshot();
        assert_eq!(snap.peak_equity, dec!(1000));
        assert_eq!(snap.max_drawdown, dec!(0.25));
    }

    #[test]
    fn test_liquidate_ignores_participation_cap() {
        let config = BrokerConfig {
            max_participation_rate: dec!(0.1),
            ..BrokerConfig::default()
        };
        let broker = SimulatedBroker::new(config);
        broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
        broker.buy_no("0xabc", dec!(0.615), dec!(40), dec!(1000));

        let closed = broker.liquidate("0xabc", dec!(0.5));
        assert_eq!(closed, dec!(200));
        assert!(broker.open_positions().is_empty());
    }

    #[test]
    fn test_clock_stamps_records() {
        let broker = broker();
        let ts = Utc.with_ymd_and_hms(2024, 11, 5, 12, 0, 0).unwrap();
        broker.set_clock(ts);
        broker.record_rejection("0xabc", TradeSide::RejectBuy, dec!(0.45));

        let record = broker.trades().pop().unwrap();
        assert_eq!(record.timestamp, ts);
        assert_eq!(record.shares, Decimal::ZERO);
        assert_eq!(broker.cash_balance(), dec!(1000));
        assert_eq!(broker.trades_for("0xother").len(), 0);
    }

    #[test]
    fn test_snapshot_win_rate() {
        let snap = PerformanceSnapshot {
            timestamp: Utc::now(),
            starting_cash: dec!(1000),
            cash_balance: dec!(1100),
            portfolio_value: dec!(1100),
            peak_equity: dec!(1100),
            max_drawdown: Decimal::ZERO,
            total_trades_executed: 4,
            total_actions: 8,
            winning_trades: 3,
            losing_trades: 1,
            open_positions: 0,
        };
        assert_eq!(snap.win_rate(), dec!(0.75));
        assert_eq!(snap.total_return(), dec!(100));
        assert_eq!(snap.return_pct(), dec!(10));
    }
}
