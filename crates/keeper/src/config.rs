use std::fs;
use serde::{Deserialize, Serialize};
use lp_rebalancer_types::{
    PoolId, PositionId, RebalanceConfig, TickRange, TokenInfo, DEFAULT_CHECK_INTERVAL,
};

use crate::error::{KeeperError, KeeperResult};

/// Keeper configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeeperConfig {
    /// Position to monitor when none is given on the command line
    #[serde(default)]
    pub position_id: Option<PositionId>,

    /// Cadence of the monitoring loop in seconds
    pub check_interval_secs: u64,

    /// Dry run mode - compute but don't submit transactions
    #[serde(default)]
    pub dry_run: bool,

    /// Rebalance parameters
    #[serde(default)]
    pub rebalance: RebalanceConfig,

    /// Retry configuration for snapshot fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// In-memory ledger used when no chain adapter is linked
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first failed attempt
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

/// Seed data for the simulated ledger
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub pool_id: PoolId,
    pub position_id: PositionId,
    pub tick_spacing: u32,

    /// Fee rate in millionths
    pub fee_rate: u32,

    pub initial_tick: i32,

    /// Liquidity of the seeded position (TOML integers stop at i64)
    pub liquidity: u64,

    /// Ticks the pool price moves on every position fetch
    #[serde(default)]
    pub drift_ticks_per_fetch: i32,

    pub position_range: TickRange,
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
}

impl KeeperConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> KeeperResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| KeeperError::Io(format!("Failed to read config file {}: {}", path, e)))?;

        let config: KeeperConfig = toml::from_str(&content)
            .map_err(|e| KeeperError::SerializationError(format!("Failed to parse config file {}: {}", path, e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> KeeperResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| KeeperError::Io(format!("Failed to write config file {}: {}", path, e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> KeeperResult<()> {
        if self.check_interval_secs == 0 {
            return Err(KeeperError::InvalidConfig("check_interval_secs must be greater than 0".to_string()));
        }

        self.rebalance.validate()?;
        self.retry.validate()?;

        if let Some(simulation) = &self.simulation {
            simulation.validate()?;
        }

        Ok(())
    }

    /// Position to monitor: explicit setting first, then the simulated one
    pub fn target_position(&self) -> Option<PositionId> {
        self.position_id
            .clone()
            .or_else(|| self.simulation.as_ref().map(|s| s.position_id.clone()))
    }
}

impl RetryConfig {
    /// Validate retry configuration
    fn validate(&self) -> KeeperResult<()> {
        if self.base_delay_ms == 0 {
            return Err(KeeperError::InvalidConfig("retry.base_delay_ms must be greater than 0".to_string()));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(KeeperError::InvalidConfig(format!(
                "retry.max_delay_ms ({}) must be at least base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }

        if !(self.backoff_multiplier >= 1.0) {
            return Err(KeeperError::InvalidConfig(format!(
                "retry.backoff_multiplier ({}) must be at least 1.0",
                self.backoff_multiplier
            )));
        }

        Ok(())
    }

    /// Calculate delay for retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return self.base_delay_ms;
        }

        let exponential_delay = self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        (exponential_delay as u64).min(self.max_delay_ms)
    }
}

impl SimulationConfig {
    fn validate(&self) -> KeeperResult<()> {
        if self.tick_spacing == 0 {
            return Err(KeeperError::InvalidConfig("simulation.tick_spacing must be greater than 0".to_string()));
        }

        if self.position_range.lower >= self.position_range.upper {
            return Err(KeeperError::InvalidConfig(format!(
                "simulation.position_range {} is empty",
                self.position_range
            )));
        }

        Ok(())
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            position_id: None,
            check_interval_secs: DEFAULT_CHECK_INTERVAL,
            dry_run: false,
            rebalance: RebalanceConfig::default(),
            retry: RetryConfig::default(),
            simulation: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: &str) -> KeeperResult<()> {
    let example_config = KeeperConfig {
        position_id: None,
        check_interval_secs: 15,
        dry_run: true,
        rebalance: RebalanceConfig {
            slippage_tolerance: 0.5,
            range_width_percent: 10.0,
            min_rebalance_interval: 300,
            gas_budget: 100_000_000,
            auto_rebalance: true,
        },
        retry: RetryConfig::default(),
        simulation: Some(SimulationConfig {
            pool_id: PoolId::new("sim-pool-sui-usdc"),
            position_id: PositionId::new("sim-position-0"),
            tick_spacing: 60,
            fee_rate: 2500,
            initial_tick: -63_000,
            liquidity: 5_000_000_000_000,
            drift_ticks_per_fetch: 40,
            position_range: TickRange::new(-63_600, -62_400),
            token_a: TokenInfo::new("0x2::sui::SUI", "SUI", 9),
            token_b: TokenInfo::new("0xdba3::usdc::USDC", "USDC", 6),
        }),
    };

    example_config.save(path)?;
    Ok(())
}
