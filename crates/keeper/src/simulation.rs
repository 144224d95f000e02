//! In-memory ledger
//!
//! Holds pools and positions, prices them with the same math the keeper
//! uses and supports scripted failures, artificial latency and a call
//! journal. The binary runs against it when no chain adapter is linked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lp_rebalancer_math::{
    amount_a_delta, amount_b_delta, liquidity_for_amounts, mul_div_floor, reconstruct_token_amounts,
    tick_to_sqrt_price,
};
use lp_rebalancer_types::{
    LedgerError, LedgerResult, PoolId, PoolSnapshot, PositionId, PositionSnapshot, RebalancerResult,
    TickRange, TokenInfo, MAX_TICK, MIN_TICK, Q64,
};

use crate::config::SimulationConfig;
use crate::error::{KeeperError, KeeperResult};
use crate::ledger::{
    LedgerClient, OpenPositionReceipt, OpenPositionRequest, RemoveLiquidityReceipt,
    RemoveLiquidityRequest,
};

const DEFAULT_REMOVE_GAS: u64 = 2_500_000;
const DEFAULT_OPEN_GAS: u64 = 4_000_000;

#[derive(Debug, Clone)]
struct SimPool {
    tick_spacing: u32,
    fee_rate: u32,
    current_tick: i32,
    token_a: TokenInfo,
    token_b: TokenInfo,
}

#[derive(Debug, Clone)]
struct SimPosition {
    pool_id: PoolId,
    liquidity: u128,
    tick_range: TickRange,
}

#[derive(Debug)]
struct LedgerBook {
    pools: HashMap<PoolId, SimPool>,
    positions: HashMap<PositionId, SimPosition>,
    next_position: u64,
    next_tx: u64,
    failing_fetches: u32,
    reject_next_remove: Option<String>,
    reject_next_open: Option<String>,
    drift_ticks_per_fetch: i32,
    remove_gas: u64,
    open_gas: u64,
    latency: Duration,
}

impl LedgerBook {
    fn next_tx_id(&mut self) -> String {
        self.next_tx += 1;
        format!("sim-tx-{}", self.next_tx)
    }

    fn pool(&self, pool_id: &PoolId) -> LedgerResult<&SimPool> {
        self.pools
            .get(pool_id)
            .ok_or_else(|| LedgerError::NotFound(format!("pool {}", pool_id)))
    }

    fn pool_sqrt_price(&self, pool_id: &PoolId) -> LedgerResult<u128> {
        let pool = self.pool(pool_id)?;
        tick_to_sqrt_price(pool.current_tick).map_err(|e| LedgerError::Rejected(e.to_string()))
    }

    fn take_fetch_failure(&mut self) -> LedgerResult<()> {
        if self.failing_fetches > 0 {
            self.failing_fetches -= 1;
            return Err(LedgerError::Network("simulated network failure".to_string()));
        }
        Ok(())
    }
}

/// Counters of calls made against a [`SimulatedLedger`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerJournal {
    pub position_fetches: u64,
    pub pool_fetches: u64,
    pub removes: u64,
    pub opens: u64,
    pub max_concurrent_removes: usize,
}

#[derive(Debug, Default)]
struct JournalCounters {
    position_fetches: AtomicU64,
    pool_fetches: AtomicU64,
    removes: AtomicU64,
    opens: AtomicU64,
    removes_in_flight: AtomicUsize,
    max_concurrent_removes: AtomicUsize,
}

/// `LedgerClient` backed by in-memory state
#[derive(Debug)]
pub struct SimulatedLedger {
    book: Mutex<LedgerBook>,
    journal: JournalCounters,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(LedgerBook {
                pools: HashMap::new(),
                positions: HashMap::new(),
                next_position: 0,
                next_tx: 0,
                failing_fetches: 0,
                reject_next_remove: None,
                reject_next_open: None,
                drift_ticks_per_fetch: 0,
                remove_gas: DEFAULT_REMOVE_GAS,
                open_gas: DEFAULT_OPEN_GAS,
                latency: Duration::ZERO,
            }),
            journal: JournalCounters::default(),
        }
    }

    /// Seed a ledger with one pool and one position
    pub async fn from_config(config: &SimulationConfig) -> KeeperResult<Self> {
        let ledger = Self::new();
        ledger
            .add_pool(
                config.pool_id.clone(),
                config.tick_spacing,
                config.fee_rate,
                config.initial_tick,
                config.token_a.clone(),
                config.token_b.clone(),
            )
            .await?;
        ledger
            .add_position(
                config.position_id.clone(),
                &config.pool_id,
                config.position_range,
                u128::from(config.liquidity),
            )
            .await?;
        ledger.set_drift(config.drift_ticks_per_fetch).await;
        Ok(ledger)
    }

    pub async fn add_pool(
        &self,
        pool_id: PoolId,
        tick_spacing: u32,
        fee_rate: u32,
        current_tick: i32,
        token_a: TokenInfo,
        token_b: TokenInfo,
    ) -> KeeperResult<()> {
        if !(MIN_TICK..=MAX_TICK).contains(&current_tick) {
            return Err(KeeperError::InvalidConfig(format!(
                "pool {} starts at tick {} outside the tick domain",
                pool_id, current_tick
            )));
        }

        let mut book = self.book.lock().await;
        book.pools.insert(
            pool_id,
            SimPool {
                tick_spacing,
                fee_rate,
                current_tick,
                token_a,
                token_b,
            },
        );
        Ok(())
    }

    pub async fn add_position(
        &self,
        position_id: PositionId,
        pool_id: &PoolId,
        tick_range: TickRange,
        liquidity: u128,
    ) -> KeeperResult<()> {
        let mut book = self.book.lock().await;
        if !book.pools.contains_key(pool_id) {
            return Err(KeeperError::InvalidConfig(format!("unknown pool {}", pool_id)));
        }
        book.positions.insert(
            position_id,
            SimPosition {
                pool_id: pool_id.clone(),
                liquidity,
                tick_range,
            },
        );
        Ok(())
    }

    /// Move the pool price
    pub async fn set_pool_tick(&self, pool_id: &PoolId, tick: i32) -> KeeperResult<()> {
        let mut book = self.book.lock().await;
        let pool = book
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| KeeperError::InvalidConfig(format!("unknown pool {}", pool_id)))?;
        pool.current_tick = tick.clamp(MIN_TICK, MAX_TICK);
        Ok(())
    }

    /// Ticks every pool moves on each position fetch
    pub async fn set_drift(&self, ticks_per_fetch: i32) {
        self.book.lock().await.drift_ticks_per_fetch = ticks_per_fetch;
    }

    /// Delay applied to each transaction call
    pub async fn set_latency(&self, latency: Duration) {
        self.book.lock().await.latency = latency;
    }

    /// The next `count` fetches fail with a transient error
    pub async fn fail_next_fetches(&self, count: u32) {
        self.book.lock().await.failing_fetches = count;
    }

    pub async fn reject_next_remove(&self, reason: &str) {
        self.book.lock().await.reject_next_remove = Some(reason.to_string());
    }

    pub async fn reject_next_open(&self, reason: &str) {
        self.book.lock().await.reject_next_open = Some(reason.to_string());
    }

    pub async fn set_gas_costs(&self, remove_gas: u64, open_gas: u64) {
        let mut book = self.book.lock().await;
        book.remove_gas = remove_gas;
        book.open_gas = open_gas;
    }

    /// Range and liquidity of a stored position
    pub async fn position(&self, position_id: &PositionId) -> Option<(TickRange, u128)> {
        let book = self.book.lock().await;
        book.positions
            .get(position_id)
            .map(|position| (position.tick_range, position.liquidity))
    }

    pub fn journal(&self) -> LedgerJournal {
        LedgerJournal {
            position_fetches: self.journal.position_fetches.load(Ordering::SeqCst),
            pool_fetches: self.journal.pool_fetches.load(Ordering::SeqCst),
            removes: self.journal.removes.load(Ordering::SeqCst),
            opens: self.journal.opens.load(Ordering::SeqCst),
            max_concurrent_removes: self.journal.max_concurrent_removes.load(Ordering::SeqCst),
        }
    }

    async fn latency(&self) -> Duration {
        self.book.lock().await.latency
    }

    async fn apply_remove(&self, request: RemoveLiquidityRequest) -> LedgerResult<RemoveLiquidityReceipt> {
        let latency = self.latency().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut book = self.book.lock().await;
        if let Some(reason) = book.reject_next_remove.take() {
            return Err(LedgerError::Rejected(reason));
        }
        if book.remove_gas > request.gas_budget {
            return Err(LedgerError::Rejected(format!(
                "gas budget {} below required {}",
                request.gas_budget, book.remove_gas
            )));
        }

        let sqrt_price = book.pool_sqrt_price(&request.pool_id)?;
        let position = book
            .positions
            .get(&request.position_id)
            .ok_or_else(|| LedgerError::NotFound(format!("position {}", request.position_id)))?
            .clone();

        if position.pool_id != request.pool_id {
            return Err(LedgerError::Rejected(format!(
                "position {} does not belong to pool {}",
                request.position_id, request.pool_id
            )));
        }
        if request.liquidity > position.liquidity {
            return Err(LedgerError::Rejected(format!(
                "cannot remove {} liquidity from a position holding {}",
                request.liquidity, position.liquidity
            )));
        }

        let (amount_a, amount_b) = range_amounts(request.liquidity, sqrt_price, position.tick_range)?;
        if amount_a < request.min_amount_a || amount_b < request.min_amount_b {
            return Err(LedgerError::Rejected(format!(
                "slippage check failed: got {} / {}, minimum {} / {}",
                amount_a, amount_b, request.min_amount_a, request.min_amount_b
            )));
        }

        if let Some(stored) = book.positions.get_mut(&request.position_id) {
            stored.liquidity -= request.liquidity;
        }

        let gas_cost = book.remove_gas;
        Ok(RemoveLiquidityReceipt {
            tx_id: book.next_tx_id(),
            gas_cost,
            amount_a,
            amount_b,
        })
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn range_amounts(liquidity: u128, sqrt_price: u128, tick_range: TickRange) -> LedgerResult<(u128, u128)> {
    let lower = tick_to_sqrt_price(tick_range.lower).map_err(|e| LedgerError::Rejected(e.to_string()))?;
    let upper = tick_to_sqrt_price(tick_range.upper).map_err(|e| LedgerError::Rejected(e.to_string()))?;
    reconstruct_token_amounts(liquidity, sqrt_price, lower, upper).map_err(|e| LedgerError::Rejected(e.to_string()))
}

/// Liquidity minted for a deposit. Inside the range the pool swaps the
/// deposit into the right ratio, so the whole value counts.
fn zap_liquidity(
    sqrt_price: u128,
    lower: u128,
    upper: u128,
    amount_a: u128,
    amount_b: u128,
) -> RebalancerResult<u128> {
    if sqrt_price <= lower || sqrt_price >= upper {
        return liquidity_for_amounts(sqrt_price, lower, upper, amount_a, amount_b);
    }

    // Value in token B of one Q64 unit of liquidity and of the deposit
    let unit_a = amount_a_delta(Q64, sqrt_price, upper)?;
    let unit_b = amount_b_delta(Q64, lower, sqrt_price)?;
    let unit_value = value_in_b(unit_a, sqrt_price)?.saturating_add(unit_b);
    let deposit_value = value_in_b(amount_a, sqrt_price)?.saturating_add(amount_b);

    mul_div_floor(deposit_value, Q64, unit_value)
}

fn value_in_b(amount_a: u128, sqrt_price: u128) -> RebalancerResult<u128> {
    mul_div_floor(mul_div_floor(amount_a, sqrt_price, Q64)?, sqrt_price, Q64)
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn fetch_position(&self, position_id: &PositionId) -> LedgerResult<PositionSnapshot> {
        self.journal.position_fetches.fetch_add(1, Ordering::SeqCst);

        let mut book = self.book.lock().await;
        book.take_fetch_failure()?;

        let position = book
            .positions
            .get(position_id)
            .ok_or_else(|| LedgerError::NotFound(format!("position {}", position_id)))?
            .clone();

        let drift = book.drift_ticks_per_fetch;
        let pool = book
            .pools
            .get_mut(&position.pool_id)
            .ok_or_else(|| LedgerError::NotFound(format!("pool {}", position.pool_id)))?;
        pool.current_tick = pool.current_tick.saturating_add(drift).clamp(MIN_TICK, MAX_TICK);
        let pool = pool.clone();

        let current_sqrt_price =
            tick_to_sqrt_price(pool.current_tick).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let (amount_a, amount_b) = range_amounts(position.liquidity, current_sqrt_price, position.tick_range)?;

        Ok(PositionSnapshot {
            position_id: position_id.clone(),
            pool_id: position.pool_id,
            token_a: pool.token_a,
            token_b: pool.token_b,
            liquidity: position.liquidity,
            tick_range: position.tick_range,
            current_tick: pool.current_tick,
            current_sqrt_price,
            amount_a,
            amount_b,
        })
    }

    async fn fetch_pool(&self, pool_id: &PoolId) -> LedgerResult<PoolSnapshot> {
        self.journal.pool_fetches.fetch_add(1, Ordering::SeqCst);

        let mut book = self.book.lock().await;
        book.take_fetch_failure()?;

        let current_sqrt_price = book.pool_sqrt_price(pool_id)?;
        let pool = book.pool(pool_id)?.clone();
        let liquidity = book
            .positions
            .values()
            .filter(|position| &position.pool_id == pool_id && position.tick_range.contains(pool.current_tick))
            .fold(0u128, |total, position| total.saturating_add(position.liquidity));

        Ok(PoolSnapshot {
            pool_id: pool_id.clone(),
            tick_spacing: pool.tick_spacing,
            fee_rate: pool.fee_rate,
            current_tick: pool.current_tick,
            current_sqrt_price,
            liquidity,
            token_a: pool.token_a,
            token_b: pool.token_b,
        })
    }

    async fn remove_liquidity(&self, request: RemoveLiquidityRequest) -> LedgerResult<RemoveLiquidityReceipt> {
        let in_flight = self.journal.removes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.max_concurrent_removes.fetch_max(in_flight, Ordering::SeqCst);

        let result = self.apply_remove(request).await;

        self.journal.removes_in_flight.fetch_sub(1, Ordering::SeqCst);
        if result.is_ok() {
            self.journal.removes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn open_and_fund_position(&self, request: OpenPositionRequest) -> LedgerResult<OpenPositionReceipt> {
        let latency = self.latency().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut book = self.book.lock().await;
        if let Some(reason) = book.reject_next_open.take() {
            return Err(LedgerError::Rejected(reason));
        }
        if book.open_gas > request.gas_budget {
            return Err(LedgerError::Rejected(format!(
                "gas budget {} below required {}",
                request.gas_budget, book.open_gas
            )));
        }

        let pool = book.pool(&request.pool_id)?.clone();
        let range = request.tick_range;
        if range.lower >= range.upper || !range.is_aligned(pool.tick_spacing) {
            return Err(LedgerError::Rejected(format!(
                "range {} invalid for tick spacing {}",
                range, pool.tick_spacing
            )));
        }
        if request.amount_a < request.min_amount_a || request.amount_b < request.min_amount_b {
            return Err(LedgerError::Rejected("deposit below requested minimum".to_string()));
        }

        let sqrt_price = book.pool_sqrt_price(&request.pool_id)?;
        let lower = tick_to_sqrt_price(range.lower).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let upper = tick_to_sqrt_price(range.upper).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let liquidity = zap_liquidity(sqrt_price, lower, upper, request.amount_a, request.amount_b)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        if liquidity == 0 {
            return Err(LedgerError::Rejected("deposit too small to mint liquidity".to_string()));
        }

        book.next_position += 1;
        let position_id = PositionId::new(format!("sim-position-{}", book.next_position));
        book.positions.insert(
            position_id.clone(),
            SimPosition {
                pool_id: request.pool_id,
                liquidity,
                tick_range: range,
            },
        );

        let gas_cost = book.open_gas;
        let tx_id = book.next_tx_id();
        self.journal.opens.fetch_add(1, Ordering::SeqCst);

        Ok(OpenPositionReceipt {
            new_position_id: Some(position_id),
            tx_id,
            gas_cost,
        })
    }
}
