/// Tick ↔ sqrt-price conversion
///
/// `sqrt_price = sqrt(1.0001^tick) * 2^64`. The exponentiation runs in f64 as
/// `exp(tick * ln(1.0001) / 2)` and is rescaled into Q64.64 through `fixed`.
/// The error is the f64 error (a few 1e-15 relative, 53 bits of mantissa)
/// plus one Q64 ulp from truncation. The ulp dominates at the bottom of the
/// domain, where the raw value is only ~4.3e9 and one unit is ~2.3e-10
/// relative (~7e-11 observed at `MIN_TICK`). At the top (sqrt price ≈ 2^32)
/// only the upper ~21 of the 64 fractional bits are meaningful. Adjacent ticks differ by a factor of
/// ~1.00005, which keeps the conversion strictly monotonic and makes
/// `sqrt_price_to_tick` an exact inverse on the outputs of
/// `tick_to_sqrt_price`. The float step lives only in `sqrt_ratio_f64`.

use lp_rebalancer_types::{RebalancerError, RebalancerResult, LN_TICK_BASE, MAX_TICK, MIN_TICK};
use num_traits::ToPrimitive;

use crate::fixed_point::{f64_to_q64, q64_to_f64, SqrtPriceX64};

/// Reject ticks outside the protocol domain
pub fn check_tick(tick: i32) -> RebalancerResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(RebalancerError::invalid_tick(tick));
    }
    Ok(())
}

fn sqrt_ratio_f64(tick: i32) -> f64 {
    (tick as f64 * LN_TICK_BASE / 2.0).exp()
}

/// Sqrt price (Q64.64) at `tick`
pub fn tick_to_sqrt_price(tick: i32) -> RebalancerResult<SqrtPriceX64> {
    check_tick(tick)?;
    f64_to_q64(sqrt_ratio_f64(tick))
}

/// Smallest representable sqrt price
pub fn min_sqrt_price() -> SqrtPriceX64 {
    f64_to_q64(sqrt_ratio_f64(MIN_TICK)).unwrap_or(1)
}

/// Largest representable sqrt price
pub fn max_sqrt_price() -> SqrtPriceX64 {
    f64_to_q64(sqrt_ratio_f64(MAX_TICK)).unwrap_or(u128::MAX)
}

/// Greatest tick whose sqrt price is less than or equal to `sqrt_price`
pub fn sqrt_price_to_tick(sqrt_price: SqrtPriceX64) -> RebalancerResult<i32> {
    if sqrt_price == 0 {
        return Err(RebalancerError::division_by_zero("sqrt_price_to_tick: zero sqrt price"));
    }
    if sqrt_price < min_sqrt_price() || sqrt_price > max_sqrt_price() {
        return Err(RebalancerError::invalid_sqrt_price(
            sqrt_price,
            "outside the supported tick domain",
        ));
    }

    // log_{1.0001}(p) = 2 * ln(sqrt_p) / ln(1.0001)
    let estimate = (2.0 * q64_to_f64(sqrt_price).ln() / LN_TICK_BASE).floor();
    let mut tick = estimate
        .to_i32()
        .ok_or_else(|| RebalancerError::invalid_sqrt_price(sqrt_price, "tick estimate not finite"))?
        .clamp(MIN_TICK, MAX_TICK);

    // Settle the float estimate against the forward conversion
    while tick > MIN_TICK && tick_to_sqrt_price(tick)? > sqrt_price {
        tick -= 1;
    }
    while tick < MAX_TICK && tick_to_sqrt_price(tick + 1)? <= sqrt_price {
        tick += 1;
    }

    Ok(tick)
}

/// Linear price at `tick`, token B per token A in raw units
pub fn tick_to_price(tick: i32) -> RebalancerResult<f64> {
    check_tick(tick)?;
    Ok((tick as f64 * LN_TICK_BASE).exp())
}

/// Linear price of token A in token B, adjusted for token decimals
pub fn sqrt_price_to_price(sqrt_price: SqrtPriceX64, decimals_a: u8, decimals_b: u8) -> f64 {
    let sqrt = q64_to_f64(sqrt_price);
    let scale = 10f64.powi(decimals_a as i32 - decimals_b as i32);
    sqrt * sqrt * scale
}
