/// Constants shared by the rebalancer crates

// ============================================================================
// Fixed-Point Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Number of fractional bits in a Q64.64 sqrt price
pub const Q64_RESOLUTION: u32 = 64;

// ============================================================================
// Tick and Price Constants
// ============================================================================

/// Minimum tick value
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick value
pub const MAX_TICK: i32 = 443_636;

/// ln(1.0001), the log of the price ratio between two adjacent ticks.
/// 1.0001 itself is not exact in f64 and its error compounds over large
/// exponents, so tick math exponentiates through this constant instead.
pub const LN_TICK_BASE: f64 = 9.999_500_033_330_833_533e-5;

/// Minimum tick spacing
pub const MIN_TICK_SPACING: u32 = 1;

/// Maximum tick spacing
pub const MAX_TICK_SPACING: u32 = 32_767;

// ============================================================================
// Percentage Constants
// ============================================================================

/// Percent denominator (100 = 100%)
pub const PERCENT_DENOMINATOR: f64 = 100.0;

/// Slippage resolution: tolerances are applied in millionths (0.0001%)
pub const SLIPPAGE_PPM_DENOMINATOR: u128 = 1_000_000;

// ============================================================================
// Keeper Constants
// ============================================================================

/// Maximum number of entries retained in the bot error log
pub const MAX_ERROR_LOG_ENTRIES: usize = 100;

/// Default slippage tolerance in percent
pub const DEFAULT_SLIPPAGE_TOLERANCE: f64 = 1.0;

/// Default total range width in percent
pub const DEFAULT_RANGE_WIDTH_PERCENT: f64 = 10.0;

/// Default minimum spacing between rebalances (seconds)
pub const DEFAULT_MIN_REBALANCE_INTERVAL: u64 = 300;

/// Default gas budget handed to the ledger client
pub const DEFAULT_GAS_BUDGET: u64 = 100_000_000;

/// Default cadence of the monitoring loop (seconds)
pub const DEFAULT_CHECK_INTERVAL: u64 = 30;
