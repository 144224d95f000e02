use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use lp_rebalancer_keeper::{
    create_example_config, KeeperConfig, LogObserver, Observer, RebalanceBot, SimulatedLedger,
};
use lp_rebalancer_types::PositionId;

#[derive(Parser, Debug)]
#[command(name = "lp-rebalancer")]
#[command(about = "Keeps a concentrated-liquidity position centered on the current price")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "rebalancer.toml")]
    config: String,

    /// Position to monitor, overrides the configuration file
    #[arg(short, long)]
    position: Option<String>,

    /// Check interval in seconds, overrides the configuration file
    #[arg(short, long)]
    interval: Option<u64>,

    /// Dry run mode - compute but don't submit transactions
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write an example configuration to --config and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "info" })
    ).init();

    if args.init_config {
        create_example_config(&args.config)
            .with_context(|| format!("writing example config to {}", args.config))?;
        log::info!("Example configuration written to {}", args.config);
        return Ok(());
    }

    let mut config = KeeperConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config))?;

    if let Some(interval) = args.interval {
        config.check_interval_secs = interval;
    }
    if let Some(position) = &args.position {
        config.position_id = Some(PositionId::new(position.as_str()));
    }
    config.dry_run |= args.dry_run;
    config.validate()?;

    let Some(position_id) = config.target_position() else {
        bail!("no position to monitor: pass --position or set position_id in {}", args.config);
    };
    let Some(simulation) = &config.simulation else {
        bail!("no ledger adapter linked: add a [simulation] section to {}", args.config);
    };

    log::info!("Starting LP rebalancer");
    log::info!("Check interval: {}s", config.check_interval_secs);
    if config.dry_run {
        log::warn!("Running in DRY RUN mode - no transactions will be submitted");
    }

    let ledger = Arc::new(SimulatedLedger::from_config(simulation).await?);
    log::info!("Using simulated ledger with pool {}", simulation.pool_id);

    let bot = RebalanceBot::builder(ledger)
        .config(config.rebalance.clone())
        .retry(config.retry.clone())
        .dry_run(config.dry_run)
        .observer(Observer::attached(Arc::new(LogObserver)))
        .build()?;

    bot.start(position_id, Duration::from_secs(config.check_interval_secs)).await?;

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    log::info!("Shutdown requested");
    bot.stop();

    log::info!("{}", bot.status_summary().await);
    log::debug!("Final state: {}", bot.state_json().await?);

    Ok(())
}
