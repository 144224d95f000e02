//! Bot operating state and statistics

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::Serialize;

use lp_rebalancer_types::{PositionId, MAX_ERROR_LOG_ENTRIES};

/// Timestamped error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"), self.message)
    }
}

/// Persistent record of one bot instance. Callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotState {
    /// View-only: the bot owns the lifecycle flag and fills this in when it
    /// hands out a snapshot. The copy held inside the bot is never read.
    pub is_running: bool,

    /// Monitored position, at most one
    pub position_id: Option<PositionId>,

    /// Never moves backwards once set
    pub last_rebalance_time: Option<DateTime<Utc>>,

    pub rebalance_count: u64,

    /// Cumulative gas, arbitrary precision
    pub total_gas_spent: BigUint,

    /// Most recent errors, oldest first
    pub errors: VecDeque<ErrorEntry>,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            is_running: false,
            position_id: None,
            last_rebalance_time: None,
            rebalance_count: 0,
            total_gas_spent: BigUint::default(),
            errors: VecDeque::with_capacity(MAX_ERROR_LOG_ENTRIES),
        }
    }

    /// Append an error, evicting the oldest beyond capacity
    pub fn record_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        while self.errors.len() >= MAX_ERROR_LOG_ENTRIES {
            self.errors.pop_front();
        }
        self.errors.push_back(ErrorEntry {
            timestamp: now,
            message: message.into(),
        });
    }

    /// Account for an executed rebalance
    pub fn record_success(&mut self, gas_cost: u128, now: DateTime<Utc>) {
        self.rebalance_count = self.rebalance_count.saturating_add(1);
        self.last_rebalance_time = Some(match self.last_rebalance_time {
            Some(previous) if previous > now => previous,
            _ => now,
        });
        self.total_gas_spent += gas_cost;
    }

    /// Up to `n` most recent errors, newest first
    pub fn recent_errors(&self, n: usize) -> Vec<&ErrorEntry> {
        self.errors.iter().rev().take(n).collect()
    }

    pub fn last_error(&self) -> Option<&ErrorEntry> {
        self.errors.back()
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}
