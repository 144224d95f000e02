/// Shared types for the concentrated-liquidity rebalancer
///
/// This crate provides the snapshots, configuration, decision records and
/// error types used by the math crate and the keeper.

pub mod config;
pub mod constants;
pub mod decision;
pub mod errors;
pub mod position;

// Re-export all public types
pub use config::*;
pub use constants::*;
pub use decision::*;
pub use errors::*;
pub use position::*;
