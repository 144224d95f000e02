/// New tick range centered on the current tick

use lp_rebalancer_types::{
    RebalancerError, RebalancerResult, TickRange, MAX_TICK, MAX_TICK_SPACING, MIN_TICK,
    MIN_TICK_SPACING, LN_TICK_BASE, PERCENT_DENOMINATOR,
};
use num_traits::ToPrimitive;

use crate::tick_math::check_tick;

/// Number of ticks spanned by a total price width of `width_percent`
pub fn width_percent_to_tick_span(width_percent: f64) -> RebalancerResult<f64> {
    if !width_percent.is_finite() || width_percent <= 0.0 {
        return Err(RebalancerError::invalid_parameter(
            "range_width_percent",
            &width_percent.to_string(),
            "finite value greater than 0",
        ));
    }
    let ratio = 1.0 + width_percent / PERCENT_DENOMINATOR;
    Ok(ratio.ln() / LN_TICK_BASE)
}

/// Centered, spacing-aligned range around `current_tick`.
///
/// The span is split in half around the current tick, then the lower bound
/// snaps down and the upper bound snaps up to a multiple of `tick_spacing`,
/// so the result always covers the requested width. If snapping leaves an
/// empty range it is widened one spacing on each side. Bounds are clamped to
/// the aligned tick domain, which must contain `current_tick`; otherwise, or
/// when no distinct aligned pair fits, `RangeCollapse` is returned.
pub fn compute_centered_range(
    current_tick: i32,
    tick_spacing: u32,
    width_percent: f64,
) -> RebalancerResult<TickRange> {
    check_tick(current_tick)?;
    if !(MIN_TICK_SPACING..=MAX_TICK_SPACING).contains(&tick_spacing) {
        return Err(RebalancerError::invalid_parameter(
            "tick_spacing",
            &tick_spacing.to_string(),
            &format!("between {} and {}", MIN_TICK_SPACING, MAX_TICK_SPACING),
        ));
    }

    let half_span = width_percent_to_tick_span(width_percent)? / 2.0;
    let spacing = tick_spacing as i64;

    let lower_raw = current_tick as f64 - half_span;
    let upper_raw = current_tick as f64 + half_span;

    let lower_steps = (lower_raw / spacing as f64)
        .floor()
        .to_i64()
        .ok_or_else(|| RebalancerError::range_collapse(current_tick, tick_spacing, "lower bound not finite"))?;
    let upper_steps = (upper_raw / spacing as f64)
        .ceil()
        .to_i64()
        .ok_or_else(|| RebalancerError::range_collapse(current_tick, tick_spacing, "upper bound not finite"))?;

    let (min_aligned, max_aligned) = aligned_domain(spacing);
    if (current_tick as i64) < min_aligned || (current_tick as i64) > max_aligned {
        return Err(RebalancerError::range_collapse(
            current_tick,
            tick_spacing,
            "current tick lies beyond the outermost aligned tick",
        ));
    }

    let mut lower = lower_steps.saturating_mul(spacing).max(min_aligned);
    let mut upper = upper_steps.saturating_mul(spacing).min(max_aligned);

    while lower >= upper {
        let can_lower = lower - spacing >= min_aligned;
        let can_raise = upper + spacing <= max_aligned;
        if !can_lower && !can_raise {
            return Err(RebalancerError::range_collapse(
                current_tick,
                tick_spacing,
                "no distinct aligned ticks inside the tick domain",
            ));
        }
        if can_lower {
            lower -= spacing;
        }
        if can_raise {
            upper += spacing;
        }
    }

    // Both bounds sit inside [MIN_TICK, MAX_TICK] here
    Ok(TickRange::new(lower as i32, upper as i32))
}

/// Outermost multiples of `spacing` inside the tick domain
fn aligned_domain(spacing: i64) -> (i64, i64) {
    let min_aligned = (MIN_TICK as i64).div_euclid(spacing) * spacing;
    let min_aligned = if min_aligned < MIN_TICK as i64 {
        min_aligned + spacing
    } else {
        min_aligned
    };
    let max_aligned = (MAX_TICK as i64).div_euclid(spacing) * spacing;
    (min_aligned, max_aligned)
}
