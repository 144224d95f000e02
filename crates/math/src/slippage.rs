/// Slippage-adjusted minimum amounts

use lp_rebalancer_types::{
    RebalancerError, RebalancerResult, PERCENT_DENOMINATOR, SLIPPAGE_PPM_DENOMINATOR,
};
use num_traits::ToPrimitive;

use crate::fixed_point::mul_div_floor;

/// `floor(amount * (1 - tolerance / 100))`.
///
/// The tolerance is applied at a resolution of 0.0001% (parts per million).
/// Tolerances of 100% or more yield zero.
pub fn min_amount_with_slippage(amount: u128, tolerance_percent: f64) -> RebalancerResult<u128> {
    if !tolerance_percent.is_finite() || tolerance_percent < 0.0 {
        return Err(RebalancerError::invalid_parameter(
            "slippage_tolerance",
            &tolerance_percent.to_string(),
            "finite non-negative percentage",
        ));
    }
    if tolerance_percent >= PERCENT_DENOMINATOR {
        return Ok(0);
    }

    let tolerance_ppm = (tolerance_percent * 10_000.0)
        .round()
        .to_u128()
        .unwrap_or(SLIPPAGE_PPM_DENOMINATOR)
        .min(SLIPPAGE_PPM_DENOMINATOR);
    let keep_ppm = SLIPPAGE_PPM_DENOMINATOR - tolerance_ppm;

    mul_div_floor(amount, keep_ppm, SLIPPAGE_PPM_DENOMINATOR)
}
