/// Token amounts held by a position, reconstructed from its liquidity
///
/// With real-valued sqrt prices `s`:
/// - amount A over `[s0, s1]` = L * (s1 - s0) / (s1 * s0)
/// - amount B over `[s0, s1]` = L * (s1 - s0)
///
/// On Q64.64 inputs that becomes `L * (s1 - s0) * 2^64 / (s1 * s0)` and
/// `L * (s1 - s0) / 2^64`. All divisions truncate.

use lp_rebalancer_types::{RebalancerError, RebalancerResult, Q64_RESOLUTION};
use primitive_types::U512;

use crate::fixed_point::{narrow, SqrtPriceX64};

// ============================================================================
// Per-Token Deltas
// ============================================================================

/// Amount of token A represented by `liquidity` between two sqrt prices
pub fn amount_a_delta(liquidity: u128, sqrt_price_0: SqrtPriceX64, sqrt_price_1: SqrtPriceX64) -> RebalancerResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == 0 {
        return Err(RebalancerError::division_by_zero("amount_a_delta: zero sqrt price"));
    }

    let numerator = (U512::from(liquidity) * U512::from(upper - lower)) << Q64_RESOLUTION;
    let denominator = U512::from(upper) * U512::from(lower);
    narrow(numerator / denominator, "amount_a_delta")
}

/// Amount of token B represented by `liquidity` between two sqrt prices
pub fn amount_b_delta(liquidity: u128, sqrt_price_0: SqrtPriceX64, sqrt_price_1: SqrtPriceX64) -> RebalancerResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    let product = U512::from(liquidity) * U512::from(upper - lower);
    narrow(product >> Q64_RESOLUTION, "amount_b_delta")
}

fn ordered(a: SqrtPriceX64, b: SqrtPriceX64) -> (SqrtPriceX64, SqrtPriceX64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ============================================================================
// Position Amounts
// ============================================================================

/// Token amounts `(a, b)` held by a position at the current price.
///
/// Below the range everything is token A, above it everything is token B,
/// inside it the liquidity splits at the current price. A zero sqrt price
/// bound is malformed data and reported as `DivisionByZero`.
pub fn reconstruct_token_amounts(
    liquidity: u128,
    sqrt_price_current: SqrtPriceX64,
    sqrt_price_lower: SqrtPriceX64,
    sqrt_price_upper: SqrtPriceX64,
) -> RebalancerResult<(u128, u128)> {
    if sqrt_price_lower == 0 || sqrt_price_upper == 0 {
        return Err(RebalancerError::division_by_zero(&format!(
            "reconstruct_token_amounts: sqrt price bounds [{}, {}]",
            sqrt_price_lower, sqrt_price_upper
        )));
    }
    if sqrt_price_lower > sqrt_price_upper {
        return Err(RebalancerError::invalid_sqrt_price(
            sqrt_price_lower,
            &format!("lower bound above upper bound {}", sqrt_price_upper),
        ));
    }

    if sqrt_price_current < sqrt_price_lower {
        let amount_a = amount_a_delta(liquidity, sqrt_price_lower, sqrt_price_upper)?;
        Ok((amount_a, 0))
    } else if sqrt_price_current > sqrt_price_upper {
        let amount_b = amount_b_delta(liquidity, sqrt_price_lower, sqrt_price_upper)?;
        Ok((0, amount_b))
    } else {
        let amount_a = amount_a_delta(liquidity, sqrt_price_current, sqrt_price_upper)?;
        let amount_b = amount_b_delta(liquidity, sqrt_price_lower, sqrt_price_current)?;
        Ok((amount_a, amount_b))
    }
}

// ============================================================================
// Liquidity From Amounts
// ============================================================================

/// Liquidity supported by `amount` of token A between two sqrt prices
pub fn liquidity_for_amount_a(amount: u128, sqrt_price_0: SqrtPriceX64, sqrt_price_1: SqrtPriceX64) -> RebalancerResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == upper {
        return Err(RebalancerError::division_by_zero("liquidity_for_amount_a: empty price interval"));
    }

    let numerator = U512::from(amount) * U512::from(lower) * U512::from(upper);
    let denominator = U512::from(upper - lower) << Q64_RESOLUTION;
    narrow(numerator / denominator, "liquidity_for_amount_a")
}

/// Liquidity supported by `amount` of token B between two sqrt prices
pub fn liquidity_for_amount_b(amount: u128, sqrt_price_0: SqrtPriceX64, sqrt_price_1: SqrtPriceX64) -> RebalancerResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == upper {
        return Err(RebalancerError::division_by_zero("liquidity_for_amount_b: empty price interval"));
    }

    let numerator = U512::from(amount) << Q64_RESOLUTION;
    narrow(numerator / U512::from(upper - lower), "liquidity_for_amount_b")
}

/// Largest liquidity the amounts can fund over `[lower, upper]` at the
/// current price. Inside the range the scarcer token decides.
pub fn liquidity_for_amounts(
    sqrt_price_current: SqrtPriceX64,
    sqrt_price_lower: SqrtPriceX64,
    sqrt_price_upper: SqrtPriceX64,
    amount_a: u128,
    amount_b: u128,
) -> RebalancerResult<u128> {
    if sqrt_price_lower >= sqrt_price_upper {
        return Err(RebalancerError::invalid_sqrt_price(
            sqrt_price_lower,
            &format!("lower bound not below upper bound {}", sqrt_price_upper),
        ));
    }

    if sqrt_price_current <= sqrt_price_lower {
        liquidity_for_amount_a(amount_a, sqrt_price_lower, sqrt_price_upper)
    } else if sqrt_price_current >= sqrt_price_upper {
        liquidity_for_amount_b(amount_b, sqrt_price_lower, sqrt_price_upper)
    } else {
        let from_a = liquidity_for_amount_a(amount_a, sqrt_price_current, sqrt_price_upper)?;
        let from_b = liquidity_for_amount_b(amount_b, sqrt_price_lower, sqrt_price_current)?;
        Ok(from_a.min(from_b))
    }
}
