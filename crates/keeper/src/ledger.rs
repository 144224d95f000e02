//! Ledger client port
//!
//! The keeper never talks to a chain directly. Snapshot reads and the two
//! logical transaction steps go through a `LedgerClient` handed in at
//! construction; the client owns signing, submission and finality.

use async_trait::async_trait;
use lp_rebalancer_types::{
    LedgerResult, PoolId, PoolSnapshot, PositionId, PositionSnapshot, TickRange,
};

/// Fully remove liquidity from an existing position
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveLiquidityRequest {
    pub position_id: PositionId,
    pub pool_id: PoolId,
    pub liquidity: u128,
    pub min_amount_a: u128,
    pub min_amount_b: u128,
    pub gas_budget: u64,
}

/// Confirmed removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveLiquidityReceipt {
    pub tx_id: String,
    pub gas_cost: u64,

    /// Tokens actually returned to the wallet
    pub amount_a: u128,
    pub amount_b: u128,
}

/// Open a position in `tick_range` and fund it
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPositionRequest {
    pub pool_id: PoolId,
    pub token_a_type: String,
    pub token_b_type: String,
    pub amount_a: u128,
    pub amount_b: u128,
    pub min_amount_a: u128,
    pub min_amount_b: u128,
    pub tick_range: TickRange,
    pub gas_budget: u64,
}

/// Confirmed open-and-fund
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPositionReceipt {
    /// Set when the chain minted a new position record
    pub new_position_id: Option<PositionId>,
    pub tx_id: String,
    pub gas_cost: u64,
}

/// Chain access used by the bot. Implementations must be safe to share
/// across the monitoring task and API callers.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn fetch_position(&self, position_id: &PositionId) -> LedgerResult<PositionSnapshot>;

    async fn fetch_pool(&self, pool_id: &PoolId) -> LedgerResult<PoolSnapshot>;

    async fn remove_liquidity(&self, request: RemoveLiquidityRequest) -> LedgerResult<RemoveLiquidityReceipt>;

    async fn open_and_fund_position(&self, request: OpenPositionRequest) -> LedgerResult<OpenPositionReceipt>;
}
