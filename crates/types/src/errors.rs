use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_TICK, MIN_TICK};

// ============================================================================
// Math and Validation Errors
// ============================================================================

/// Errors raised by the liquidity math and by configuration validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RebalancerError {
    /// Division by zero, usually a degenerate zero sqrt price
    #[error("Division by zero in context: {context}")]
    DivisionByZero { context: String },

    /// Arithmetic overflow occurred
    #[error("Math overflow in '{operation}' with values: {values:?}")]
    MathOverflow { operation: String, values: Vec<String> },

    /// Tick outside the supported domain
    #[error("Invalid tick {tick}: not in valid range [{min_tick}, {max_tick}]")]
    InvalidTick { tick: i32, min_tick: i32, max_tick: i32 },

    /// Sqrt price outside the supported domain or otherwise unusable
    #[error("Invalid sqrt price {sqrt_price}: {reason}")]
    InvalidSqrtPrice { sqrt_price: u128, reason: String },

    /// Tick range that could not be made non-empty
    #[error("Tick range collapsed around tick {current_tick} (spacing {tick_spacing}): {reason}")]
    RangeCollapse { current_tick: i32, tick_spacing: u32, reason: String },

    /// Invalid parameter
    #[error("Invalid parameter '{parameter}': got '{value}', expected '{expected}'")]
    InvalidParameter { parameter: String, value: String, expected: String },
}

impl RebalancerError {
    /// Create a division by zero error
    pub fn division_by_zero(context: &str) -> Self {
        Self::DivisionByZero {
            context: context.to_string(),
        }
    }

    /// Create a math overflow error with context
    pub fn math_overflow(operation: &str, values: &[&str]) -> Self {
        Self::MathOverflow {
            operation: operation.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create an invalid tick error for the protocol tick domain
    pub fn invalid_tick(tick: i32) -> Self {
        Self::InvalidTick {
            tick,
            min_tick: MIN_TICK,
            max_tick: MAX_TICK,
        }
    }

    pub fn invalid_sqrt_price(sqrt_price: u128, reason: &str) -> Self {
        Self::InvalidSqrtPrice {
            sqrt_price,
            reason: reason.to_string(),
        }
    }

    pub fn range_collapse(current_tick: i32, tick_spacing: u32, reason: &str) -> Self {
        Self::RangeCollapse {
            current_tick,
            tick_spacing,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, value: &str, expected: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Whether the error points at malformed upstream data rather than a
    /// caller mistake
    pub fn is_bad_data(&self) -> bool {
        !matches!(self, Self::InvalidParameter { .. })
    }
}

/// Result type alias using the shared error type
pub type RebalancerResult<T> = std::result::Result<T, RebalancerError>;

// ============================================================================
// Ledger Errors
// ============================================================================

/// Errors reported by a ledger client
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// Requested object does not exist on chain
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Transport failure, worth retrying
    #[error("Network error: {0}")]
    Network(String),

    /// The chain or the client refused the request
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
