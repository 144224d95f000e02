/// Q64.64 fixed-point helpers
///
/// Sqrt prices travel as raw `u128` bits of a `U64F64`, the chain's native
/// representation. Intermediate products go through `U512` so that
/// liquidity × price-difference × 2^64 never overflows.

use fixed::types::U64F64;
use lp_rebalancer_types::{RebalancerError, RebalancerResult};
use primitive_types::U512;

/// Raw Q64.64 sqrt price
pub type SqrtPriceX64 = u128;

// ============================================================================
// Fixed-Point Conversion Functions
// ============================================================================

/// Convert a non-negative f64 to Q64.64 (round to nearest)
pub fn f64_to_q64(value: f64) -> RebalancerResult<u128> {
    if !value.is_finite() || value < 0.0 {
        return Err(RebalancerError::invalid_parameter(
            "f64_to_q64",
            &value.to_string(),
            "finite non-negative value",
        ));
    }

    U64F64::checked_from_num(value)
        .map(U64F64::to_bits)
        .ok_or_else(|| RebalancerError::math_overflow("f64 to Q64 conversion", &[&value.to_string()]))
}

/// Convert Q64.64 fixed-point to f64
pub fn q64_to_f64(value: u128) -> f64 {
    U64F64::from_bits(value).to_num::<f64>()
}

// ============================================================================
// Wide Integer Helpers
// ============================================================================

/// Narrow a wide intermediate back to u128
pub(crate) fn narrow(value: U512, operation: &str) -> RebalancerResult<u128> {
    if value.bits() > 128 {
        return Err(RebalancerError::math_overflow(operation, &[&value.to_string()]));
    }
    Ok(value.low_u128())
}

/// floor(a * b / denominator) without intermediate overflow
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> RebalancerResult<u128> {
    if denominator == 0 {
        return Err(RebalancerError::division_by_zero(&format!(
            "mul_div_floor: {} * {} / 0",
            a, b
        )));
    }
    let product = U512::from(a) * U512::from(b);
    narrow(product / U512::from(denominator), "mul_div_floor")
}
