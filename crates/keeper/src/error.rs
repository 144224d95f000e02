//! Error types for the keeper service

use lp_rebalancer_types::{LedgerError, RebalancerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Bot is already running")]
    AlreadyRunning,

    #[error("No monitored position")]
    NoMonitoredPosition,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Math error: {0}")]
    Math(RebalancerError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<RebalancerError> for KeeperError {
    fn from(err: RebalancerError) -> Self {
        match err {
            RebalancerError::InvalidParameter { .. } => KeeperError::InvalidConfig(err.to_string()),
            other => KeeperError::Math(other),
        }
    }
}

impl From<std::io::Error> for KeeperError {
    fn from(err: std::io::Error) -> Self {
        KeeperError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for KeeperError {
    fn from(err: toml::de::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}

impl From<toml::ser::Error> for KeeperError {
    fn from(err: toml::ser::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(err: serde_json::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}

pub type KeeperResult<T> = Result<T, KeeperError>;
