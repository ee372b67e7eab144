//! Tick to candle aggregation

use chrono::Duration;

use crate::types::{Candle, PriceTick};

/// Builds fixed-length candles from a tick stream.
///
/// A candle opens at its first tick and closes when a tick arrives at or
/// after `open_time + timeframe`; that tick opens the next candle.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    timeframe: Duration,
    current: Option<Candle>,
}

impl CandleAggregator {
    pub fn new(timeframe: Duration) -> Self {
        Self {
            timeframe,
            current: None,
        }
    }

    pub fn timeframe(&self) -> Duration {
        self.timeframe
    }

    /// Add a tick. Returns the candle it closed, if any.
    pub fn push(&mut self, tick: &PriceTick) -> Option<Candle> {
        if let Some(candle) = self.current.as_mut() {
            if tick.timestamp < candle.open_time + self.timeframe {
                candle.absorb(tick);
                return None;
            }
        }
        self.current.replace(Candle::open_at(tick))
    }

    /// Take the partially built candle at end of stream
    pub fn flush(&mut self) -> Option<Candle> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tick(secs: i64, price: Decimal) -> PriceTick {
        PriceTick::new("0xabc", Utc.timestamp_opt(secs, 0).unwrap(), price, dec!(1))
    }

    #[test]
    fn test_boundary_tick_opens_next_candle() {
        let mut agg = CandleAggregator::new(Duration::seconds(60));

        assert!(agg.push(&tick(0, dec!(0.40))).is_none());
        assert!(agg.push(&tick(59, dec!(0.45))).is_none());

        let closed = agg.push(&tick(60, dec!(0.50))).unwrap();
        assert_eq!(closed.open, dec!(0.40));
        assert_eq!(closed.close, dec!(0.45));
        assert_eq!(closed.volume, dec!(2));

        let trailing = agg.flush().unwrap();
        assert_eq!(trailing.open, dec!(0.50));
        assert!(agg.flush().is_none());
    }

    #[test]
    fn test_gap_longer_than_timeframe() {
        let mut agg = CandleAggregator::new(Duration::seconds(60));
        agg.push(&tick(0, dec!(0.40)));
        let closed = agg.push(&tick(600, dec!(0.30))).unwrap();
        assert_eq!(closed.high, dec!(0.40));
        assert_eq!(agg.flush().unwrap().open_time, Utc.timestamp_opt(600, 0).unwrap());
    }
}
