//! Range membership and rebalance gate
//!
//! Pure predicates over a fetched snapshot and the current bot state. None
//! of them mutate anything, so they may be evaluated any number of times.

use chrono::{DateTime, Utc};
use lp_rebalancer_types::{PositionSnapshot, RebalanceCheck, RebalanceConfig};

use crate::state::BotState;

/// True when the current tick lies strictly outside the position's range
pub fn is_out_of_range(position: &PositionSnapshot) -> bool {
    !position.tick_range.contains(position.current_tick)
}

/// Whole seconds left before another rebalance is allowed, rounded up.
/// `None` when the interval has elapsed or nothing was rebalanced yet.
pub fn remaining_wait_secs(state: &BotState, config: &RebalanceConfig, now: DateTime<Utc>) -> Option<u64> {
    let last = state.last_rebalance_time?;

    // A clock that stepped backwards counts as zero elapsed
    let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
    let interval_ms = config.min_rebalance_interval.saturating_mul(1000);

    if elapsed_ms >= interval_ms {
        return None;
    }

    let remaining_ms = interval_ms - elapsed_ms;
    Some(remaining_ms.div_ceil(1000))
}

/// Minimum interval since the last executed rebalance has elapsed
pub fn can_rebalance(state: &BotState, config: &RebalanceConfig, now: DateTime<Utc>) -> bool {
    remaining_wait_secs(state, config, now).is_none()
}

/// Combine range membership and the interval gate into a decision
pub fn check_rebalance_needed(
    position: &PositionSnapshot,
    state: &BotState,
    config: &RebalanceConfig,
    now: DateTime<Utc>,
) -> RebalanceCheck {
    let range = position.tick_range;
    let tick = position.current_tick;

    if !is_out_of_range(position) {
        return RebalanceCheck::not_needed(format!(
            "Position in range: current tick {} within {}",
            tick, range
        ));
    }

    match remaining_wait_secs(state, config, now) {
        Some(remaining) => RebalanceCheck::not_needed(format!(
            "Position out of range (tick {} outside {}) but rebalance interval not elapsed: {}s remaining",
            tick, range, remaining
        )),
        None => RebalanceCheck::needed(format!(
            "Position out of range: current tick {} outside {}",
            tick, range
        )),
    }
}
