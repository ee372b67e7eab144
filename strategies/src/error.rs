//! Error types for strategies and the simulation driver

use predsim_exec::ExecError;
use thiserror::Error;

/// Main error type for strategy and driver operations
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Execution engine error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Market not found
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Replay input violates ordering or range constraints
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Insufficient data for a run
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("Strategy error: {0}")]
    Other(String),
}

impl StrategyError {
    /// Whether the error is an ordinary market condition from the engine
    pub fn is_market_condition(&self) -> bool {
        matches!(self, StrategyError::Exec(e) if e.is_market_condition())
    }
}

/// Result type for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;
