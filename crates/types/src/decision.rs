/// Rebalance decisions and execution outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{LedgerError, RebalancerError};
use crate::position::{PositionId, TickRange};

// ============================================================================
// Decision
// ============================================================================

/// Outcome of the rebalance gate. Re-derived on every query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceCheck {
    pub needed: bool,
    pub reason: String,
}

impl RebalanceCheck {
    pub fn needed(reason: impl Into<String>) -> Self {
        Self {
            needed: true,
            reason: reason.into(),
        }
    }

    pub fn not_needed(reason: impl Into<String>) -> Self {
        Self {
            needed: false,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RebalanceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

// ============================================================================
// Execution Plan
// ============================================================================

/// Everything the executor computed before touching the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub position_id: PositionId,
    pub old_range: TickRange,
    pub new_range: TickRange,
    pub current_tick: i32,

    /// Liquidity removed from the old position
    pub liquidity: u128,

    /// Amounts expected from the old position at the current price
    pub expected_amount_a: u128,
    pub expected_amount_b: u128,

    /// Slippage-adjusted floors for the removal step
    pub min_amount_a: u128,
    pub min_amount_b: u128,
}

// ============================================================================
// Execution Result
// ============================================================================

/// Successful remove-then-add sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceReceipt {
    /// Transaction that opened the new position
    pub tx_id: String,

    /// Transaction that removed liquidity from the old position
    pub remove_tx_id: String,

    /// Gas spent across both steps, wide enough that the sum never clamps
    pub gas_cost: u128,

    pub new_range: TickRange,

    /// Present when the ledger minted a fresh position record
    pub new_position_id: Option<PositionId>,

    pub executed_at: DateTime<Utc>,
}

/// Which half of the remove-then-add sequence failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStep {
    FetchPosition,
    FetchPool,
    RemoveLiquidity,
    OpenPosition,
}

impl fmt::Display for LedgerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerStep::FetchPosition => "fetch position",
            LedgerStep::FetchPool => "fetch pool",
            LedgerStep::RemoveLiquidity => "remove liquidity",
            LedgerStep::OpenPosition => "open position",
        };
        f.write_str(name)
    }
}

/// Why a rebalance attempt did not complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RebalanceFailure {
    /// Position was back in range when execution started
    NotNeeded { reason: String },

    /// Upstream data the math cannot work with
    BadData { reason: String },

    /// Ledger client failed during a step
    Ledger { step: LedgerStep, error: LedgerError },
}

impl RebalanceFailure {
    pub fn bad_data(err: &RebalancerError) -> Self {
        Self::BadData {
            reason: err.to_string(),
        }
    }

    pub fn ledger(step: LedgerStep, error: LedgerError) -> Self {
        Self::Ledger { step, error }
    }
}

impl fmt::Display for RebalanceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceFailure::NotNeeded { reason } => write!(f, "Rebalance not needed: {}", reason),
            RebalanceFailure::BadData { reason } => write!(f, "Bad data: {}", reason),
            RebalanceFailure::Ledger { step, error } => write!(f, "Ledger failure during {}: {}", step, error),
        }
    }
}

/// Outcome of one execution attempt. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RebalanceResult {
    Success(RebalanceReceipt),

    /// Dry-run mode: everything computed, nothing submitted
    DryRun(RebalancePlan),

    Failure(RebalanceFailure),
}

impl RebalanceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RebalanceResult::Success(_))
    }

    pub fn receipt(&self) -> Option<&RebalanceReceipt> {
        match self {
            RebalanceResult::Success(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RebalanceFailure> {
        match self {
            RebalanceResult::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for RebalanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceResult::Success(receipt) => write!(
                f,
                "Rebalanced into {} (tx {}, gas {})",
                receipt.new_range, receipt.tx_id, receipt.gas_cost
            ),
            RebalanceResult::DryRun(plan) => write!(
                f,
                "Dry run: would move {} from {} to {}",
                plan.position_id, plan.old_range, plan.new_range
            ),
            RebalanceResult::Failure(failure) => failure.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_distinguish_bad_data() {
        let bad = RebalanceFailure::bad_data(&RebalancerError::division_by_zero("sqrt_price_lower"));
        let rejected = RebalanceFailure::ledger(
            LedgerStep::RemoveLiquidity,
            LedgerError::Rejected("slippage".into()),
        );

        assert!(bad.to_string().starts_with("Bad data"));
        assert_eq!(
            rejected.to_string(),
            "Ledger failure during remove liquidity: Rejected: slippage"
        );
    }

    #[test]
    fn test_result_accessors() {
        let result = RebalanceResult::Failure(RebalanceFailure::NotNeeded {
            reason: "in range".into(),
        });
        assert!(!result.is_success());
        assert!(result.receipt().is_none());
        assert!(result.failure().is_some());
    }
}
