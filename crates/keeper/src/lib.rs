pub mod config;
pub mod error;
pub mod executor;
pub mod gate;
pub mod keeper;
pub mod ledger;
pub mod observer;
pub mod simulation;
pub mod state;

pub use config::{create_example_config, KeeperConfig, RetryConfig, SimulationConfig};
pub use error::{KeeperError, KeeperResult};
pub use executor::{build_plan, RebalanceExecutor};
pub use gate::{can_rebalance, check_rebalance_needed, is_out_of_range, remaining_wait_secs};
pub use keeper::{BotBuilder, CycleOutcome, RebalanceBot};
pub use ledger::{
    LedgerClient, OpenPositionReceipt, OpenPositionRequest, RemoveLiquidityReceipt, RemoveLiquidityRequest,
};
pub use observer::{BotEventHandler, LogObserver, Observer};
pub use simulation::{LedgerJournal, SimulatedLedger};
pub use state::{BotState, ErrorEntry};
