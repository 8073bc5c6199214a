//! Reference Ticker
//!
//! Background task that keeps the reference time on the system clock and
//! raises out-of-sync alerts on every tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::state::AppState;

/// Spawn the ticker; it runs until the returned handle is aborted
pub fn spawn_reference_ticker(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sync.tick_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = period.as_secs(),
            follow_system_clock = state.follows_system_clock(),
            "Reference ticker started"
        );

        loop {
            interval.tick().await;
            if let Some(report) = state.tick().await {
                tracing::debug!(reference = %report.reference_time, "Reference time advanced");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockRegistry;
    use crate::config::Config;

    #[tokio::test]
    async fn test_ticker_publishes_alerts() {
        let mut config = Config::default();
        config.sync.reference_time = Some("15:00".to_string());
        let state = Arc::new(AppState::new(ClockRegistry::default(), config));
        let mut listener = state.ws_hub.subscribe_broadcast();

        let handle = spawn_reference_ticker(Arc::clone(&state));
        let event = listener.recv().await.unwrap();
        handle.abort();

        assert_eq!(event.topic, crate::websocket::Topic::System);
    }
}
