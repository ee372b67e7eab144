//! Error types for the execution engine
//!
//! Most variants describe ordinary market conditions (not enough cash, a book
//! that moved during the latency window, a garbage depth entry). The engine
//! never propagates those as faults: they surface as zero-share returns,
//! REJECT ledger entries or skipped book entries. The remaining variants are
//! infrastructure failures (configuration, I/O, runtime).

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for execution operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Execution engine error types
#[derive(Debug, Error)]
pub enum ExecError {
    /// Not enough cash to cover the requested spend
    #[error("Insufficient funds for {asset_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Asset identifier
        asset_id: String,
        /// Dollars requested
        requested: Decimal,
        /// Cash available at the time of the check
        available: Decimal,
    },

    /// Sell attempted with no inventory on that side
    #[error("No position to sell for {0}")]
    NoPosition(String),

    /// Re-read quote fell outside the tradable (0.01, 0.99) band
    #[error("Stale or rejected price {price} for {asset_id}")]
    StaleOrRejectedPrice {
        /// Asset identifier
        asset_id: String,
        /// Quote observed after the latency window
        price: Decimal,
    },

    /// Book moved against the order while it was in flight
    #[error("Missed execution race for {asset_id}: target {target}, observed {observed}")]
    MissedExecutionRace {
        /// Asset identifier
        asset_id: String,
        /// Limit the strategy asked for
        target: Decimal,
        /// Quote observed after the latency window
        observed: Decimal,
    },

    /// Another delayed order for the asset is still outstanding
    #[error("Order already in flight for {0}")]
    DuplicateInFlightOrder(String),

    /// Depth-delta entry that could not be applied
    #[error("Malformed book entry (price={price:?}, size={size:?}): {reason}")]
    MalformedBookEntry {
        /// Raw price text
        price: String,
        /// Raw size text
        size: String,
        /// Why the entry was rejected
        reason: String,
    },

    /// Order book stayed locked past the submit timeout, usually because
    /// the submitting caller still holds a guard on it
    #[error("Order book for {0} is locked")]
    BookBusy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Latency simulation needs a tokio runtime
    #[error("No tokio runtime available for delayed execution")]
    NoRuntime,

    /// Delayed fill task panicked or was aborted before completing
    #[error("Delayed order task failed: {0}")]
    TaskFailed(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExecError {
    /// Check if the error is a market condition rather than a fault.
    ///
    /// Market conditions are recoverable by simply trying again on the next
    /// tick; callers should not abort a run because of them.
    pub fn is_market_condition(&self) -> bool {
        matches!(
            self,
            ExecError::InsufficientFunds { .. }
                | ExecError::NoPosition(_)
                | ExecError::StaleOrRejectedPrice { .. }
                | ExecError::MissedExecutionRace { .. }
                | ExecError::DuplicateInFlightOrder(_)
                | ExecError::MalformedBookEntry { .. }
                | ExecError::BookBusy(_)
        )
    }

    /// Check if the error was produced by the latency race
    pub fn is_race_rejection(&self) -> bool {
        matches!(
            self,
            ExecError::StaleOrRejectedPrice { .. } | ExecError::MissedExecutionRace { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_conditions() {
        let missed = ExecError::MissedExecutionRace {
            asset_id: "0xabc".to_string(),
            target: dec!(0.40),
            observed: dec!(0.45),
        };
        assert!(missed.is_market_condition());
        assert!(missed.is_race_rejection());

        let dup = ExecError::DuplicateInFlightOrder("0xabc".to_string());
        assert!(dup.is_market_condition());
        assert!(!dup.is_race_rejection());

        let busy = ExecError::BookBusy("0xabc".to_string());
        assert!(busy.is_market_condition());
        assert!(!busy.is_race_rejection());
    }

    #[test]
    fn test_faults_are_not_market_conditions() {
        let cfg = ExecError::ConfigError("bad spread".to_string());
        assert!(!cfg.is_market_condition());
        assert!(!ExecError::NoRuntime.is_market_condition());
    }
}
