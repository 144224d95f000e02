/// Position and pool snapshots fetched from the ledger

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// On-chain identifier of a liquidity position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub String);

/// On-chain identifier of a pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl PositionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PositionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&str> for PoolId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Token Information
// ============================================================================

/// Token identity as seen by the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Fully qualified coin type or mint address
    pub token_type: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(token_type: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            token_type: token_type.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

// ============================================================================
// Tick Range
// ============================================================================

/// Closed tick interval `[lower, upper]` of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    pub const fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    /// Both bounds count as inside the range
    pub fn contains(&self, tick: i32) -> bool {
        tick >= self.lower && tick <= self.upper
    }

    /// Width in ticks
    pub fn width(&self) -> i64 {
        self.upper as i64 - self.lower as i64
    }

    pub fn is_aligned(&self, tick_spacing: u32) -> bool {
        let spacing = tick_spacing as i32;
        spacing > 0 && self.lower % spacing == 0 && self.upper % spacing == 0
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Point-in-time view of a liquidity position. Fetched fresh on every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position_id: PositionId,
    pub pool_id: PoolId,

    /// Token pair
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,

    /// Liquidity currently held by the position
    pub liquidity: u128,

    /// Active tick range
    pub tick_range: TickRange,

    /// Pool state at fetch time
    pub current_tick: i32,
    pub current_sqrt_price: u128,

    /// Token amounts reconstructed from liquidity and the range
    pub amount_a: u128,
    pub amount_b: u128,
}

impl PositionSnapshot {
    pub fn tick_lower(&self) -> i32 {
        self.tick_range.lower
    }

    pub fn tick_upper(&self) -> i32 {
        self.tick_range.upper
    }
}

/// Point-in-time view of a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool_id: PoolId,
    pub tick_spacing: u32,

    /// Fee rate in millionths (3000 = 0.3%)
    pub fee_rate: u32,

    pub current_tick: i32,
    pub current_sqrt_price: u128,
    pub liquidity: u128,

    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
}
