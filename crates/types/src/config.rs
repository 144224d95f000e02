/// Rebalance parameters shared by the gate, the math and the executor

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{RebalancerError, RebalancerResult};

/// Live rebalance parameters. Validated on construction and on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Slippage tolerance in percent applied to minimum amounts
    pub slippage_tolerance: f64,

    /// Total width of a newly opened range in percent of price
    pub range_width_percent: f64,

    /// Minimum spacing between two executed rebalances (seconds)
    pub min_rebalance_interval: u64,

    /// Upper bound on gas handed to the ledger client per transaction
    pub gas_budget: u64,

    /// Whether the monitoring loop may execute rebalances on its own
    pub auto_rebalance: bool,
}

impl RebalanceConfig {
    /// Validate all numeric fields
    pub fn validate(&self) -> RebalancerResult<()> {
        validate_percent("slippage_tolerance", self.slippage_tolerance)?;
        validate_percent("range_width_percent", self.range_width_percent)?;

        if self.gas_budget == 0 {
            return Err(RebalancerError::invalid_parameter("gas_budget", "0", "greater than 0"));
        }

        Ok(())
    }

    /// Merge a partial update, returning the new config. `self` is untouched
    /// when the merged result fails validation.
    pub fn merged(&self, update: &ConfigUpdate) -> RebalancerResult<Self> {
        let mut next = self.clone();
        if let Some(slippage) = update.slippage_tolerance {
            next.slippage_tolerance = slippage;
        }
        if let Some(width) = update.range_width_percent {
            next.range_width_percent = width;
        }
        if let Some(interval) = update.min_rebalance_interval {
            next.min_rebalance_interval = interval;
        }
        if let Some(gas_budget) = update.gas_budget {
            next.gas_budget = gas_budget;
        }
        if let Some(auto) = update.auto_rebalance {
            next.auto_rebalance = auto;
        }
        next.validate()?;
        Ok(next)
    }
}

fn validate_percent(parameter: &str, value: f64) -> RebalancerResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RebalancerError::invalid_parameter(
            parameter,
            &value.to_string(),
            "finite value greater than 0",
        ));
    }
    Ok(())
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            slippage_tolerance: DEFAULT_SLIPPAGE_TOLERANCE,
            range_width_percent: DEFAULT_RANGE_WIDTH_PERCENT,
            min_rebalance_interval: DEFAULT_MIN_REBALANCE_INTERVAL,
            gas_budget: DEFAULT_GAS_BUDGET,
            auto_rebalance: true,
        }
    }
}

/// Partial config update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub slippage_tolerance: Option<f64>,
    pub range_width_percent: Option<f64>,
    pub min_rebalance_interval: Option<u64>,
    pub gas_budget: Option<u64>,
    pub auto_rebalance: Option<bool>,
}

impl ConfigUpdate {
    /// No field set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RebalanceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RebalanceConfig::default();
        config.slippage_tolerance = 0.0;
        assert!(config.validate().is_err());

        let mut config = RebalanceConfig::default();
        config.range_width_percent = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = RebalanceConfig::default();
        config.gas_budget = 0;
        assert!(config.validate().is_err());

        // Zero interval is allowed
        let mut config = RebalanceConfig::default();
        config.min_rebalance_interval = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_applies_only_given_fields() {
        let config = RebalanceConfig::default();
        let update = ConfigUpdate {
            range_width_percent: Some(4.0),
            auto_rebalance: Some(false),
            ..Default::default()
        };

        let merged = config.merged(&update).unwrap();
        assert_eq!(merged.range_width_percent, 4.0);
        assert!(!merged.auto_rebalance);
        assert_eq!(merged.slippage_tolerance, config.slippage_tolerance);
        assert_eq!(merged.gas_budget, config.gas_budget);
    }

    #[test]
    fn test_merge_rejects_invalid_update() {
        let config = RebalanceConfig::default();
        let update = ConfigUpdate {
            slippage_tolerance: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            config.merged(&update),
            Err(RebalancerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RebalanceConfig = toml::from_str("range_width_percent = 5.0").unwrap();
        assert_eq!(config.range_width_percent, 5.0);
        assert_eq!(config.gas_budget, DEFAULT_GAS_BUDGET);
        assert!(ConfigUpdate::default().is_empty());
    }
}
