use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};

use lp_rebalancer_types::{
    ConfigUpdate, LedgerError, PositionId, PositionSnapshot, RebalanceCheck, RebalanceConfig,
    RebalanceResult,
};

use crate::config::RetryConfig;
use crate::error::{KeeperError, KeeperResult};
use crate::executor::RebalanceExecutor;
use crate::gate;
use crate::ledger::LedgerClient;
use crate::observer::Observer;
use crate::state::BotState;

/// What a single monitoring cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle or API call held the bot
    Skipped,

    /// No position is being monitored
    NoPosition,

    /// Snapshot fetch failed after retries; recorded in the error log
    FetchFailed(LedgerError),

    /// Gate said no
    Checked(RebalanceCheck),

    /// Rebalance needed but `auto_rebalance` is off
    Deferred(RebalanceCheck),

    Executed(RebalanceResult),
}

/// State guarded by the bot's single mutual-exclusion boundary
struct BotCore {
    state: BotState,
    config: RebalanceConfig,
}

struct BotInner {
    core: Mutex<BotCore>,
    running: AtomicBool,
    shutdown: std::sync::Mutex<Option<watch::Sender<bool>>>,
    ledger: Arc<dyn LedgerClient>,
    executor: RebalanceExecutor,
    observer: Observer,
    retry: RetryConfig,
}

/// Keeps one concentrated-liquidity position centered on the current price
pub struct RebalanceBot {
    inner: Arc<BotInner>,
}

/// Builder for [`RebalanceBot`]
pub struct BotBuilder {
    ledger: Arc<dyn LedgerClient>,
    config: RebalanceConfig,
    observer: Observer,
    retry: RetryConfig,
    dry_run: bool,
    position_id: Option<PositionId>,
}

impl BotBuilder {
    pub fn config(mut self, config: RebalanceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Monitor this position before `start` is called
    pub fn position(mut self, position_id: PositionId) -> Self {
        self.position_id = Some(position_id);
        self
    }

    pub fn build(self) -> KeeperResult<RebalanceBot> {
        self.config.validate()?;

        let mut state = BotState::new();
        state.position_id = self.position_id;

        Ok(RebalanceBot {
            inner: Arc::new(BotInner {
                core: Mutex::new(BotCore {
                    state,
                    config: self.config,
                }),
                running: AtomicBool::new(false),
                shutdown: std::sync::Mutex::new(None),
                executor: RebalanceExecutor::new(self.ledger.clone(), self.dry_run),
                ledger: self.ledger,
                observer: self.observer,
                retry: self.retry,
            }),
        })
    }
}

impl RebalanceBot {
    pub fn builder(ledger: Arc<dyn LedgerClient>) -> BotBuilder {
        BotBuilder {
            ledger,
            config: RebalanceConfig::default(),
            observer: Observer::default(),
            retry: RetryConfig::default(),
            dry_run: false,
            position_id: None,
        }
    }

    /// Bot with default retry policy and no observer
    pub fn new(ledger: Arc<dyn LedgerClient>, config: RebalanceConfig) -> KeeperResult<Self> {
        Self::builder(ledger).config(config).build()
    }

    /// Start monitoring `position_id`.
    ///
    /// Runs one cycle immediately, then schedules a cycle every
    /// `check_interval` until `stop` is called. Returns the outcome of the
    /// immediate cycle.
    pub async fn start(&self, position_id: PositionId, check_interval: Duration) -> KeeperResult<CycleOutcome> {
        if check_interval.is_zero() {
            return Err(KeeperError::InvalidConfig("check interval must be greater than 0".to_string()));
        }

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(KeeperError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.inner.shutdown_slot() = Some(shutdown_tx);

        let outcome = {
            let mut core = self.inner.core.lock().await;
            core.state.position_id = Some(position_id.clone());

            log::info!(
                "Monitoring position {} every {}s{}",
                position_id,
                check_interval.as_secs_f64(),
                if self.inner.executor.is_dry_run() { " (dry run)" } else { "" }
            );
            self.inner.observer.status(&format!("Bot started for position {}", position_id));

            self.inner.cycle(&mut core).await
        };

        // stop() may have landed during the first cycle
        if self.inner.running.load(Ordering::SeqCst) {
            tokio::spawn(run_loop(self.inner.clone(), check_interval, shutdown_rx));
        }

        Ok(outcome)
    }

    /// Cancel the schedule. An in-flight cycle still completes and reports.
    pub fn stop(&self) {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);

        if let Some(shutdown) = self.inner.shutdown_slot().take() {
            let _ = shutdown.send(true);
        }

        if was_running {
            log::info!("Bot stopped");
            self.inner.observer.status("Bot stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run one scheduled cycle now, skipping it if the bot is busy
    pub async fn tick(&self) -> CycleOutcome {
        self.inner.scheduled_cycle().await
    }

    /// Execute a rebalance immediately, outside the schedule and the
    /// interval gate. Waits for any in-flight cycle first.
    pub async fn trigger_rebalance(&self) -> KeeperResult<RebalanceResult> {
        let mut guard = self.inner.core.lock().await;
        let core = &mut *guard;

        let position_id = core.state.position_id.clone().ok_or(KeeperError::NoMonitoredPosition)?;
        log::info!("Manual rebalance triggered for {}", position_id);

        let result = self.inner.executor.execute(&position_id, &core.config, &mut core.state).await;
        self.inner.report(&result);

        Ok(result)
    }

    /// Merge `update` into the live config. Invalid updates leave the config
    /// untouched.
    pub async fn update_config(&self, update: ConfigUpdate) -> KeeperResult<RebalanceConfig> {
        let mut core = self.inner.core.lock().await;
        if update.is_empty() {
            log::debug!("Empty configuration update ignored");
            return Ok(core.config.clone());
        }

        let next = core.config.merged(&update)?;

        log::info!("Configuration updated: {:?}", update);
        core.config = next.clone();
        Ok(next)
    }

    /// Copy of the current state, with `is_running` taken from the
    /// lifecycle flag
    pub async fn state(&self) -> BotState {
        let core = self.inner.core.lock().await;
        let mut state = core.state.clone();
        state.is_running = self.is_running();
        state
    }

    pub async fn config(&self) -> RebalanceConfig {
        self.inner.core.lock().await.config.clone()
    }

    /// One-line status for a dashboard or log
    pub async fn status_summary(&self) -> String {
        let state = self.state().await;

        let position = state
            .position_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let last_rebalance = state
            .last_rebalance_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "{} | position {} | rebalances {} | gas spent {} | last rebalance {} | errors {}",
            if state.is_running { "running" } else { "stopped" },
            position,
            state.rebalance_count,
            state.total_gas_spent,
            last_rebalance,
            state.errors.len()
        )
    }

    /// State snapshot as pretty JSON
    pub async fn state_json(&self) -> KeeperResult<String> {
        let state = self.state().await;
        Ok(serde_json::to_string_pretty(&state)?)
    }
}

impl Drop for RebalanceBot {
    fn drop(&mut self) {
        self.stop();
    }
}

impl BotInner {
    fn shutdown_slot(&self) -> std::sync::MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.shutdown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn scheduled_cycle(&self) -> CycleOutcome {
        match self.core.try_lock() {
            Ok(mut core) => self.cycle(&mut core).await,
            Err(_) => {
                log::warn!("Previous cycle still in flight, skipping this tick");
                CycleOutcome::Skipped
            }
        }
    }

    async fn cycle(&self, core: &mut BotCore) -> CycleOutcome {
        let Some(position_id) = core.state.position_id.clone() else {
            log::debug!("No monitored position, nothing to check");
            return CycleOutcome::NoPosition;
        };

        let position = match self.fetch_position(&position_id).await {
            Ok(position) => position,
            Err(e) => {
                let message = format!("Failed to fetch position {}: {}", position_id, e);
                log::error!("{}", message);
                core.state.record_error(message.clone(), Utc::now());
                self.observer.status(&message);
                return CycleOutcome::FetchFailed(e);
            }
        };

        let check = gate::check_rebalance_needed(&position, &core.state, &core.config, Utc::now());
        log::debug!("Position {}: {}", position_id, check);

        if !check.needed {
            self.observer.status(&check.reason);
            return CycleOutcome::Checked(check);
        }

        if !core.config.auto_rebalance {
            self.observer.status(&format!("{} (auto-rebalance disabled)", check.reason));
            return CycleOutcome::Deferred(check);
        }

        self.observer.status(&check.reason);
        let result = self.executor.execute(&position_id, &core.config, &mut core.state).await;
        self.report(&result);

        CycleOutcome::Executed(result)
    }

    /// Fetch with retries on transient errors
    async fn fetch_position(&self, position_id: &PositionId) -> Result<PositionSnapshot, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.ledger.fetch_position(position_id).await {
                Ok(position) => return Ok(position),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    log::warn!(
                        "Fetching position {} failed (attempt {}): {}; retrying in {}ms",
                        position_id,
                        attempt + 1,
                        e,
                        delay
                    );
                    time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn report(&self, result: &RebalanceResult) {
        self.observer.rebalance(result);
        self.observer.status(&result.to_string());
    }
}

async fn run_loop(inner: Arc<BotInner>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let outcome = inner.scheduled_cycle().await;
                log::debug!("Cycle finished: {:?}", outcome);
            }
        }
    }

    log::debug!("Monitoring loop exited");
}
