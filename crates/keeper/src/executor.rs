//! Remove-then-add rebalance sequence
//!
//! The executor computes the new range and slippage floors, then drives the
//! ledger client through the two logical steps. Atomicity below that level
//! belongs to the ledger client; nothing here attempts a rollback.

use std::sync::Arc;

use chrono::Utc;
use lp_rebalancer_math::{
    compute_centered_range, min_amount_with_slippage, reconstruct_token_amounts, tick_to_sqrt_price,
};
use lp_rebalancer_types::{
    LedgerStep, PoolSnapshot, PositionId, PositionSnapshot, RebalanceConfig, RebalanceFailure,
    RebalancePlan, RebalanceReceipt, RebalanceResult, RebalancerError, RebalancerResult,
};

use crate::gate::is_out_of_range;
use crate::ledger::{LedgerClient, OpenPositionRequest, RemoveLiquidityRequest};
use crate::state::BotState;

/// Build the rebalance plan for an out-of-range position
pub fn build_plan(
    position: &PositionSnapshot,
    pool: &PoolSnapshot,
    config: &RebalanceConfig,
) -> RebalancerResult<RebalancePlan> {
    if position.current_sqrt_price == 0 {
        return Err(RebalancerError::division_by_zero(&format!(
            "position {} reports a zero sqrt price",
            position.position_id
        )));
    }

    let new_range = compute_centered_range(pool.current_tick, pool.tick_spacing, config.range_width_percent)?;

    let sqrt_price_lower = tick_to_sqrt_price(position.tick_lower())?;
    let sqrt_price_upper = tick_to_sqrt_price(position.tick_upper())?;
    let (expected_amount_a, expected_amount_b) = reconstruct_token_amounts(
        position.liquidity,
        position.current_sqrt_price,
        sqrt_price_lower,
        sqrt_price_upper,
    )?;

    Ok(RebalancePlan {
        position_id: position.position_id.clone(),
        old_range: position.tick_range,
        new_range,
        current_tick: pool.current_tick,
        liquidity: position.liquidity,
        expected_amount_a,
        expected_amount_b,
        min_amount_a: min_amount_with_slippage(expected_amount_a, config.slippage_tolerance)?,
        min_amount_b: min_amount_with_slippage(expected_amount_b, config.slippage_tolerance)?,
    })
}

/// Executes rebalances against a ledger client
pub struct RebalanceExecutor {
    ledger: Arc<dyn LedgerClient>,
    dry_run: bool,
}

impl RebalanceExecutor {
    pub fn new(ledger: Arc<dyn LedgerClient>, dry_run: bool) -> Self {
        Self { ledger, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run one rebalance attempt and fold its outcome into `state`.
    ///
    /// The position is re-fetched and re-checked first, so a position that
    /// drifted back into range yields `NotNeeded` even on a manual trigger.
    pub async fn execute(
        &self,
        position_id: &PositionId,
        config: &RebalanceConfig,
        state: &mut BotState,
    ) -> RebalanceResult {
        let result = match self.attempt(position_id, config).await {
            Ok(result) => result,
            Err(failure) => RebalanceResult::Failure(failure),
        };

        match &result {
            RebalanceResult::Success(receipt) => {
                state.record_success(receipt.gas_cost, receipt.executed_at);
                log::info!(
                    "Rebalanced {} into {} (tx {}, gas {}, total rebalances {})",
                    position_id,
                    receipt.new_range,
                    receipt.tx_id,
                    receipt.gas_cost,
                    state.rebalance_count
                );

                if let Some(new_id) = &receipt.new_position_id {
                    if new_id != position_id {
                        log::info!("Now monitoring new position {} (was {})", new_id, position_id);
                    }
                    state.position_id = Some(new_id.clone());
                }
            }
            RebalanceResult::DryRun(plan) => {
                log::info!(
                    "[DRY RUN] Would move {} from {} to {} (expected {} / {}, minimum {} / {})",
                    plan.position_id,
                    plan.old_range,
                    plan.new_range,
                    plan.expected_amount_a,
                    plan.expected_amount_b,
                    plan.min_amount_a,
                    plan.min_amount_b
                );
            }
            RebalanceResult::Failure(failure) => {
                match failure {
                    RebalanceFailure::NotNeeded { .. } => log::warn!("Rebalance of {} skipped: {}", position_id, failure),
                    _ => log::error!("Rebalance of {} failed: {}", position_id, failure),
                }
                state.record_error(failure.to_string(), Utc::now());
            }
        }

        result
    }

    async fn attempt(
        &self,
        position_id: &PositionId,
        config: &RebalanceConfig,
    ) -> Result<RebalanceResult, RebalanceFailure> {
        let position = self
            .ledger
            .fetch_position(position_id)
            .await
            .map_err(|e| RebalanceFailure::ledger(LedgerStep::FetchPosition, e))?;

        if !is_out_of_range(&position) {
            return Err(RebalanceFailure::NotNeeded {
                reason: format!(
                    "current tick {} is back within {}",
                    position.current_tick, position.tick_range
                ),
            });
        }

        let pool = self
            .ledger
            .fetch_pool(&position.pool_id)
            .await
            .map_err(|e| RebalanceFailure::ledger(LedgerStep::FetchPool, e))?;

        let plan = build_plan(&position, &pool, config).map_err(|e| RebalanceFailure::bad_data(&e))?;
        log::debug!("Rebalance plan for {}: {:?}", position_id, plan);

        if self.dry_run {
            return Ok(RebalanceResult::DryRun(plan));
        }

        let removed = self
            .ledger
            .remove_liquidity(RemoveLiquidityRequest {
                position_id: position.position_id.clone(),
                pool_id: position.pool_id.clone(),
                liquidity: plan.liquidity,
                min_amount_a: plan.min_amount_a,
                min_amount_b: plan.min_amount_b,
                gas_budget: config.gas_budget,
            })
            .await
            .map_err(|e| RebalanceFailure::ledger(LedgerStep::RemoveLiquidity, e))?;

        log::debug!(
            "Removed liquidity from {} (tx {}): {} / {}",
            position_id,
            removed.tx_id,
            removed.amount_a,
            removed.amount_b
        );

        let min_amount_a = min_amount_with_slippage(removed.amount_a, config.slippage_tolerance)
            .map_err(|e| RebalanceFailure::bad_data(&e))?;
        let min_amount_b = min_amount_with_slippage(removed.amount_b, config.slippage_tolerance)
            .map_err(|e| RebalanceFailure::bad_data(&e))?;

        let opened = self
            .ledger
            .open_and_fund_position(OpenPositionRequest {
                pool_id: position.pool_id.clone(),
                token_a_type: position.token_a.token_type.clone(),
                token_b_type: position.token_b.token_type.clone(),
                amount_a: removed.amount_a,
                amount_b: removed.amount_b,
                min_amount_a,
                min_amount_b,
                tick_range: plan.new_range,
                gas_budget: config.gas_budget,
            })
            .await
            .map_err(|e| {
                log::warn!(
                    "Liquidity was removed from {} (tx {}) but opening {} failed; funds remain in the wallet",
                    position_id,
                    removed.tx_id,
                    plan.new_range
                );
                RebalanceFailure::ledger(LedgerStep::OpenPosition, e)
            })?;

        Ok(RebalanceResult::Success(RebalanceReceipt {
            tx_id: opened.tx_id,
            remove_tx_id: removed.tx_id,
            gas_cost: u128::from(removed.gas_cost) + u128::from(opened.gas_cost),
            new_range: plan.new_range,
            new_position_id: opened.new_position_id,
            executed_at: Utc::now(),
        }))
    }
}
