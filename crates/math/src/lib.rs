/// Concentrated-liquidity math for the rebalancer
///
/// Pure functions over ticks, Q64.64 sqrt prices and liquidity: tick ↔
/// sqrt-price conversion, token amounts held by a range, slippage floors and
/// centered range construction. No function here touches the ledger or the
/// bot state.

pub mod fixed_point;
pub mod liquidity;
pub mod range;
pub mod slippage;
pub mod tick_math;

// Re-export commonly used functions
pub use fixed_point::*;
pub use liquidity::*;
pub use range::*;
pub use slippage::*;
pub use tick_math::*;
