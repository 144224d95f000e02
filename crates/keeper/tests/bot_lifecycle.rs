//! # Rebalance Bot Lifecycle Tests
//!
//! Drives `RebalanceBot` against the simulated ledger: start/stop, the
//! scheduled loop, manual triggers, failure handling and overlap.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use lp_rebalancer_keeper::*;
    use lp_rebalancer_types::{
        ConfigUpdate, LedgerStep, PoolId, PositionId, RebalanceConfig, RebalanceFailure,
        RebalanceResult, TickRange, TokenInfo,
    };
    use num_bigint::BigUint;

    const POOL: &str = "pool-sui-usdc";
    const POSITION: &str = "position-0";

    async fn ledger_with_spacing(current_tick: i32, tick_spacing: u32) -> Arc<SimulatedLedger> {
        let ledger = SimulatedLedger::new();
        ledger
            .add_pool(
                PoolId::new(POOL),
                tick_spacing,
                2500,
                current_tick,
                TokenInfo::new("0x2::sui::SUI", "SUI", 9),
                TokenInfo::new("0xdba3::usdc::USDC", "USDC", 6),
            )
            .await
            .unwrap();
        ledger
            .add_position(PositionId::new(POSITION), &PoolId::new(POOL), TickRange::new(1020, 1980), 1_000_000_000)
            .await
            .unwrap();
        Arc::new(ledger)
    }

    async fn ledger_at(current_tick: i32) -> Arc<SimulatedLedger> {
        ledger_with_spacing(current_tick, 60).await
    }

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        }
    }

    fn bot_for(ledger: &Arc<SimulatedLedger>) -> RebalanceBot {
        RebalanceBot::builder(ledger.clone())
            .position(PositionId::new(POSITION))
            .retry(no_retry())
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<String>>,
        results: Mutex<Vec<RebalanceResult>>,
    }

    impl BotEventHandler for Recorder {
        fn on_status_update(&self, message: &str) {
            self.statuses.lock().unwrap().push(message.to_string());
        }

        fn on_rebalance(&self, result: &RebalanceResult) {
            self.results.lock().unwrap().push(result.clone());
        }
    }

    #[tokio::test]
    async fn test_start_rejects_second_start_and_stop_is_idempotent() {
        let ledger = ledger_at(1500).await;
        let bot = RebalanceBot::new(ledger.clone(), RebalanceConfig::default()).unwrap();

        let outcome = bot.start(PositionId::new(POSITION), Duration::from_secs(3600)).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Checked(ref check) if !check.needed));
        assert!(bot.is_running());
        assert!(bot.state().await.is_running);

        let second = bot.start(PositionId::new(POSITION), Duration::from_secs(3600)).await;
        assert!(matches!(second, Err(KeeperError::AlreadyRunning)));

        bot.stop();
        assert!(!bot.is_running());
        bot.stop();
        assert!(!bot.state().await.is_running);

        // Restart after stop is allowed
        assert!(bot.start(PositionId::new(POSITION), Duration::from_secs(3600)).await.is_ok());
        bot.stop();
    }

    #[tokio::test]
    async fn test_start_rejects_zero_interval() {
        let ledger = ledger_at(1500).await;
        let bot = bot_for(&ledger);
        assert!(matches!(
            bot.start(PositionId::new(POSITION), Duration::ZERO).await,
            Err(KeeperError::InvalidConfig(_))
        ));
        assert!(!bot.is_running());
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_recentered() {
        let ledger = ledger_at(2500).await;
        let bot = RebalanceBot::new(ledger.clone(), RebalanceConfig::default()).unwrap();

        let outcome = bot.start(PositionId::new(POSITION), Duration::from_secs(3600)).await.unwrap();
        let CycleOutcome::Executed(RebalanceResult::Success(receipt)) = outcome else {
            panic!("expected an executed rebalance, got {:?}", outcome);
        };

        assert_eq!(receipt.new_range, TickRange::new(1980, 3000));
        assert_eq!(receipt.gas_cost, 6_500_000);
        assert_eq!(receipt.new_position_id, Some(PositionId::new("sim-position-1")));

        let state = bot.state().await;
        assert_eq!(state.rebalance_count, 1);
        assert_eq!(state.total_gas_spent, BigUint::from(6_500_000u64));
        assert_eq!(state.position_id, Some(PositionId::new("sim-position-1")));
        assert!(state.last_rebalance_time.is_some());
        assert!(state.errors.is_empty());

        let (range, liquidity) = ledger.position(&PositionId::new("sim-position-1")).await.unwrap();
        assert_eq!(range, TickRange::new(1980, 3000));
        assert!(liquidity > 0);
        assert_eq!(ledger.position(&PositionId::new(POSITION)).await.unwrap().1, 0);

        // The new position is in range
        assert!(matches!(bot.tick().await, CycleOutcome::Checked(ref check) if !check.needed));
        bot.stop();
    }

    #[tokio::test]
    async fn test_min_interval_defers_next_rebalance() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);
        assert!(bot.trigger_rebalance().await.unwrap().is_success());

        ledger.set_pool_tick(&PoolId::new(POOL), 5000).await.unwrap();
        match bot.tick().await {
            CycleOutcome::Checked(check) => {
                assert!(!check.needed);
                assert!(check.reason.contains("remaining"), "{}", check.reason);
            }
            other => panic!("expected a deferred check, got {:?}", other),
        }
        assert_eq!(bot.state().await.rebalance_count, 1);
    }

    #[tokio::test]
    async fn test_gas_accumulates_across_rebalances() {
        let ledger = ledger_at(2500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .position(PositionId::new(POSITION))
            .config(RebalanceConfig {
                min_rebalance_interval: 0,
                ..RebalanceConfig::default()
            })
            .build()
            .unwrap();

        ledger.set_gas_costs(40, 60).await;
        assert!(matches!(bot.tick().await, CycleOutcome::Executed(RebalanceResult::Success(_))));

        ledger.set_pool_tick(&PoolId::new(POOL), 5000).await.unwrap();
        ledger.set_gas_costs(100, 150).await;
        let outcome = bot.tick().await;
        assert!(matches!(outcome, CycleOutcome::Executed(RebalanceResult::Success(_))), "{:?}", outcome);

        let state = bot.state().await;
        assert_eq!(state.rebalance_count, 2);
        assert_eq!(state.total_gas_spent, BigUint::from(350u32));
        assert_eq!(state.position_id, Some(PositionId::new("sim-position-2")));
    }

    #[tokio::test]
    async fn test_step_gas_is_summed_without_clamping() {
        let ledger = ledger_at(2500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .position(PositionId::new(POSITION))
            .config(RebalanceConfig {
                min_rebalance_interval: 0,
                gas_budget: u64::MAX,
                ..RebalanceConfig::default()
            })
            .build()
            .unwrap();

        ledger.set_gas_costs(u64::MAX, 1000).await;
        let result = bot.trigger_rebalance().await.unwrap();
        let expected = u128::from(u64::MAX) + 1000;
        assert_eq!(result.receipt().unwrap().gas_cost, expected);

        let state = bot.state().await;
        assert_eq!(state.total_gas_spent, BigUint::from(expected));
        assert_eq!(state.total_gas_spent.to_string(), "18446744073709552615");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded_and_skipped() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);

        ledger.fail_next_fetches(1).await;
        let outcome = bot.tick().await;
        assert!(matches!(outcome, CycleOutcome::FetchFailed(ref e) if e.is_transient()));

        let state = bot.state().await;
        assert_eq!(state.errors.len(), 1);
        assert!(state.last_error().unwrap().message.contains("Failed to fetch position"));
        assert_eq!(state.rebalance_count, 0);
        assert_eq!(ledger.journal().removes, 0);

        // Next cycle proceeds normally
        assert!(matches!(bot.tick().await, CycleOutcome::Executed(RebalanceResult::Success(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fetch_errors_are_retried() {
        let ledger = ledger_at(1500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .position(PositionId::new(POSITION))
            .retry(RetryConfig {
                max_retries: 2,
                base_delay_ms: 10,
                max_delay_ms: 100,
                backoff_multiplier: 2.0,
            })
            .build()
            .unwrap();

        ledger.fail_next_fetches(2).await;
        assert!(matches!(bot.tick().await, CycleOutcome::Checked(_)));
        assert!(bot.state().await.errors.is_empty());
        assert_eq!(ledger.journal().position_fetches, 3);
    }

    #[tokio::test]
    async fn test_unknown_position_is_not_retried() {
        let ledger = ledger_at(1500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .position(PositionId::new("missing"))
            .build()
            .unwrap();

        assert!(matches!(bot.tick().await, CycleOutcome::FetchFailed(lp_rebalancer_types::LedgerError::NotFound(_))));
        assert_eq!(ledger.journal().position_fetches, 1);
    }

    #[tokio::test]
    async fn test_rejected_removal_leaves_counters_untouched() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);

        ledger.reject_next_remove("insufficient balance").await;
        let result = bot.trigger_rebalance().await.unwrap();
        match result.failure() {
            Some(RebalanceFailure::Ledger { step, .. }) => assert_eq!(*step, LedgerStep::RemoveLiquidity),
            other => panic!("expected a ledger failure, got {:?}", other),
        }

        let state = bot.state().await;
        assert_eq!(state.rebalance_count, 0);
        assert_eq!(state.total_gas_spent, BigUint::default());
        assert!(state.last_rebalance_time.is_none());
        assert_eq!(state.position_id, Some(PositionId::new(POSITION)));
        assert_eq!(state.errors.len(), 1);

        // The original position is still monitored and can be retried
        assert!(bot.trigger_rebalance().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_failed_open_reports_open_step() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);

        ledger.reject_next_open("pool paused").await;
        let result = bot.trigger_rebalance().await.unwrap();
        assert!(matches!(
            result.failure(),
            Some(RebalanceFailure::Ledger { step: LedgerStep::OpenPosition, .. })
        ));
        assert_eq!(bot.state().await.rebalance_count, 0);
        assert_eq!(ledger.journal().removes, 1);
        assert_eq!(ledger.journal().opens, 0);
    }

    #[tokio::test]
    async fn test_malformed_pool_is_bad_data() {
        let ledger = ledger_with_spacing(2500, 0).await;
        let bot = bot_for(&ledger);

        let result = bot.trigger_rebalance().await.unwrap();
        assert!(matches!(result.failure(), Some(RebalanceFailure::BadData { .. })));
        assert!(result.to_string().starts_with("Bad data"));
        assert_eq!(ledger.journal().removes, 0);
    }

    #[tokio::test]
    async fn test_manual_trigger_rechecks_range() {
        let ledger = ledger_at(1500).await;
        let bot = bot_for(&ledger);

        let result = bot.trigger_rebalance().await.unwrap();
        assert!(matches!(result.failure(), Some(RebalanceFailure::NotNeeded { .. })));
        assert_eq!(ledger.journal().removes, 0);
        assert_eq!(bot.state().await.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_without_position_is_rejected() {
        let ledger = ledger_at(2500).await;
        let bot = RebalanceBot::new(ledger.clone(), RebalanceConfig::default()).unwrap();

        assert!(matches!(bot.trigger_rebalance().await, Err(KeeperError::NoMonitoredPosition)));
        assert_eq!(bot.tick().await, CycleOutcome::NoPosition);
        assert_eq!(bot.state().await, BotState::new());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let ledger = ledger_at(2500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .position(PositionId::new(POSITION))
            .dry_run(true)
            .build()
            .unwrap();

        let result = bot.trigger_rebalance().await.unwrap();
        let RebalanceResult::DryRun(plan) = result else {
            panic!("expected a dry-run plan, got {:?}", result);
        };
        assert_eq!(plan.new_range, TickRange::new(1980, 3000));
        assert_eq!(plan.expected_amount_a, 0);
        assert!(plan.min_amount_b <= plan.expected_amount_b);

        let state = bot.state().await;
        assert_eq!(state.rebalance_count, 0);
        assert!(state.last_rebalance_time.is_none());
        assert!(state.errors.is_empty());
        assert_eq!(ledger.journal().removes, 0);
        assert_eq!(ledger.journal().opens, 0);
    }

    #[tokio::test]
    async fn test_auto_rebalance_off_defers() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);

        bot.update_config(ConfigUpdate {
            auto_rebalance: Some(false),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

        assert!(matches!(bot.tick().await, CycleOutcome::Deferred(ref check) if check.needed));
        assert_eq!(ledger.journal().removes, 0);

        // Manual trigger still executes
        assert!(bot.trigger_rebalance().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_update_config_validates() {
        let ledger = ledger_at(1500).await;
        let bot = bot_for(&ledger);

        let rejected = bot
            .update_config(ConfigUpdate {
                slippage_tolerance: Some(-1.0),
                range_width_percent: Some(20.0),
                ..ConfigUpdate::default()
            })
            .await;
        assert!(matches!(rejected, Err(KeeperError::InvalidConfig(_))));
        assert_eq!(bot.config().await, RebalanceConfig::default());

        let updated = bot
            .update_config(ConfigUpdate {
                range_width_percent: Some(20.0),
                min_rebalance_interval: Some(0),
                ..ConfigUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.range_width_percent, 20.0);
        assert_eq!(updated.min_rebalance_interval, 0);
        assert_eq!(bot.config().await, updated);
    }

    #[tokio::test]
    async fn test_empty_config_update_is_a_no_op() {
        let ledger = ledger_at(1500).await;
        let bot = bot_for(&ledger);

        let unchanged = bot.update_config(ConfigUpdate::default()).await.unwrap();
        assert_eq!(unchanged, RebalanceConfig::default());
        assert_eq!(bot.config().await, RebalanceConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_initial_config_is_rejected() {
        let ledger = ledger_at(1500).await;
        let config = RebalanceConfig {
            gas_budget: 0,
            ..RebalanceConfig::default()
        };
        assert!(matches!(RebalanceBot::new(ledger, config), Err(KeeperError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_while_trigger_in_flight() {
        let ledger = ledger_at(2500).await;
        ledger.set_latency(Duration::from_secs(5)).await;
        let bot = Arc::new(bot_for(&ledger));

        let background = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.trigger_rebalance().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(bot.tick().await, CycleOutcome::Skipped);

        let result = background.await.unwrap().unwrap();
        assert!(result.is_success());
        assert_eq!(ledger.journal().removes, 1);
        assert_eq!(ledger.journal().max_concurrent_removes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_triggers_never_overlap() {
        let ledger = ledger_at(2500).await;
        ledger.set_latency(Duration::from_secs(1)).await;
        let bot = Arc::new(bot_for(&ledger));

        let first = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.trigger_rebalance().await })
        };
        let second = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.trigger_rebalance().await })
        };

        let results = [first.await.unwrap().unwrap(), second.await.unwrap().unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r.failure(), Some(RebalanceFailure::NotNeeded { .. }))));

        let journal = ledger.journal();
        assert_eq!(journal.removes, 1);
        assert_eq!(journal.max_concurrent_removes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_loop_runs_until_stopped() {
        let ledger = ledger_at(1500).await;
        let bot = RebalanceBot::builder(ledger.clone())
            .config(RebalanceConfig {
                min_rebalance_interval: 0,
                ..RebalanceConfig::default()
            })
            .build()
            .unwrap();

        bot.start(PositionId::new(POSITION), Duration::from_secs(10)).await.unwrap();
        assert_eq!(bot.state().await.rebalance_count, 0);

        ledger.set_pool_tick(&PoolId::new(POOL), 2500).await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(bot.state().await.rebalance_count, 1);

        bot.stop();
        let fetches = ledger.journal().position_fetches;
        ledger.set_pool_tick(&PoolId::new(POOL), 8000).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ledger.journal().position_fetches, fetches);
        assert_eq!(bot.state().await.rebalance_count, 1);
    }

    #[tokio::test]
    async fn test_observer_receives_status_and_results() {
        let ledger = ledger_at(2500).await;
        let recorder = Arc::new(Recorder::default());
        let bot = RebalanceBot::builder(ledger.clone())
            .observer(Observer::attached(recorder.clone()))
            .build()
            .unwrap();

        bot.start(PositionId::new(POSITION), Duration::from_secs(3600)).await.unwrap();
        bot.stop();

        let statuses = recorder.statuses.lock().unwrap().clone();
        assert!(statuses.iter().any(|s| s.contains("Bot started")));
        assert!(statuses.iter().any(|s| s.contains("out of range")));
        assert_eq!(statuses.last().map(String::as_str), Some("Bot stopped"));

        let results = recorder.results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
    }

    #[tokio::test]
    async fn test_status_summary_and_json() {
        let ledger = ledger_at(2500).await;
        let bot = bot_for(&ledger);
        bot.trigger_rebalance().await.unwrap();

        let summary = bot.status_summary().await;
        assert!(summary.starts_with("stopped"));
        assert!(summary.contains("position sim-position-1"));
        assert!(summary.contains("rebalances 1"));
        assert!(summary.contains("gas spent 6500000"));

        let json: serde_json::Value = serde_json::from_str(&bot.state_json().await.unwrap()).unwrap();
        assert_eq!(json["rebalance_count"], 1);
        assert_eq!(json["position_id"], "sim-position-1");
    }
}
