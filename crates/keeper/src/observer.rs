use std::fmt;
use std::sync::Arc;

use lp_rebalancer_types::RebalanceResult;

/// Consumer of bot events. Called synchronously from the cycle that
/// produced the event, so implementations must return promptly.
pub trait BotEventHandler: Send + Sync {
    fn on_status_update(&self, message: &str);

    fn on_rebalance(&self, result: &RebalanceResult);
}

/// Event sink attached to a bot
#[derive(Clone, Default)]
pub enum Observer {
    /// Events are dropped
    #[default]
    Detached,
    Attached(Arc<dyn BotEventHandler>),
}

impl Observer {
    pub fn attached(handler: Arc<dyn BotEventHandler>) -> Self {
        Observer::Attached(handler)
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, Observer::Attached(_))
    }

    pub fn status(&self, message: &str) {
        if let Observer::Attached(handler) = self {
            handler.on_status_update(message);
        }
    }

    pub fn rebalance(&self, result: &RebalanceResult) {
        if let Observer::Attached(handler) = self {
            handler.on_rebalance(result);
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Detached => f.write_str("Observer::Detached"),
            Observer::Attached(_) => f.write_str("Observer::Attached"),
        }
    }
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BotEventHandler for LogObserver {
    fn on_status_update(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_rebalance(&self, result: &RebalanceResult) {
        match result {
            RebalanceResult::Failure(_) => log::warn!("Rebalance result: {}", result),
            _ => log::info!("Rebalance result: {}", result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_rebalancer_types::RebalanceFailure;
    use std::sync::Mutex;

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

    #[test]
    fn test_detached_observer_drops_events() {
        let observer = Observer::default();
        assert!(!observer.is_attached());
        observer.status("ignored");
    }

    #[test]
    fn test_attached_observer_receives_events() {
        let recorder = Arc::new(Recorder::default());
        let observer = Observer::attached(recorder.clone());

        observer.status("checking");
        observer.rebalance(&RebalanceResult::Failure(RebalanceFailure::NotNeeded {
            reason: "in range".into(),
        }));

        assert_eq!(*recorder.statuses.lock().unwrap(), vec!["checking".to_string()]);
        assert_eq!(recorder.results.lock().unwrap().len(), 1);
    }
}
