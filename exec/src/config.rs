//! Broker configuration
//!
//! Pricing and latency parameters for one simulation run. Loadable from YAML
//! or JSON; every field has a default so partial documents are fine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ExecError, ExecResult};

/// Simulated broker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Cash the account starts the run with
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,

    /// Price offset charged against the trader on every fill
    #[serde(default = "default_spread_penalty")]
    pub spread_penalty: Decimal,

    /// Fraction of visible best-level liquidity one fill may take
    #[serde(default = "default_max_participation_rate")]
    pub max_participation_rate: Decimal,

    /// Fee charged on realized profit at resolution
    #[serde(default = "default_resolution_fee_rate")]
    pub resolution_fee_rate: Decimal,

    /// Order latency in milliseconds (0 = synchronous fills)
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
            spread_penalty: default_spread_penalty(),
            max_participation_rate: default_max_participation_rate(),
            resolution_fee_rate: default_resolution_fee_rate(),
            latency_ms: 0,
        }
    }
}

impl BrokerConfig {
    /// Config with the given starting cash and default pricing
    pub fn with_starting_cash(starting_cash: Decimal) -> Self {
        Self {
            starting_cash,
            ..Self::default()
        }
    }

    /// Load from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use predsim_exec::BrokerConfig;
    ///
    /// let yaml = r#"
    /// starting_cash: 500
    /// latency_ms: 250
    /// "#;
    ///
    /// let config = BrokerConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.latency_ms, 250);
    /// ```
    pub fn from_yaml(yaml: &str) -> ExecResult<Self> {
        let config: BrokerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON string
    pub fn from_json(json: &str) -> ExecResult<Self> {
        let config: BrokerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> ExecResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Validate parameter ranges
    pub fn validate(&self) -> ExecResult<()> {
        if self.starting_cash < Decimal::ZERO {
            return Err(ExecError::ConfigError(format!(
                "starting_cash {} must not be negative",
                self.starting_cash
            )));
        }

        if self.spread_penalty < Decimal::ZERO || self.spread_penalty >= Decimal::ONE {
            return Err(ExecError::ConfigError(format!(
                "spread_penalty {} must be in [0, 1)",
                self.spread_penalty
            )));
        }

        if self.max_participation_rate <= Decimal::ZERO || self.max_participation_rate > Decimal::ONE {
            return Err(ExecError::ConfigError(format!(
                "max_participation_rate {} must be in (0, 1]",
                self.max_participation_rate
            )));
        }

        if self.resolution_fee_rate < Decimal::ZERO || self.resolution_fee_rate > Decimal::ONE {
            return Err(ExecError::ConfigError(format!(
                "resolution_fee_rate {} must be in [0, 1]",
                self.resolution_fee_rate
            )));
        }

        Ok(())
    }

    /// Latency as a Duration
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

// Default value functions
fn default_starting_cash() -> Decimal {
    dec!(1000)
}

fn default_spread_penalty() -> Decimal {
    dec!(0.015)
}

fn default_max_participation_rate() -> Decimal {
    dec!(1.00)
}

fn default_resolution_fee_rate() -> Decimal {
    dec!(0.02)
}
