//! Application State
//!
//! Shared state accessible by all API and WebSocket handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.
//!
//! Every registry mutation goes through one of the methods here, so that
//! the fresh report is pushed to WebSocket subscribers and the state file
//! is rewritten in one place.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::api::dto::{normalize_clock_name, require_name_and_time};
use crate::api::error::{ApiError, ApiResult};
use crate::clock::{
    current_time, AnalysisReport, ClockError, ClockRecord, ClockRegistry, NewClock,
    RegistryState, TimeOfDay,
};
use crate::config::Config;
use crate::store;
use crate::websocket::{ConnectionHub, HubConfig, WsEvent};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// The single clock registry; all access is serialized by this lock
    pub registry: Arc<Mutex<ClockRegistry>>,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for real-time streaming
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(registry: ClockRegistry, config: Config) -> Self {
        Self::with_ws_config(registry, config, HubConfig::default())
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(registry: ClockRegistry, config: Config, hub_config: HubConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(hub_config)),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }

    /// Check a supplied admin password against the configured one
    pub fn authenticate(&self, password: Option<&str>) -> ApiResult<()> {
        match password {
            Some(p) if p == self.config.sync.admin_password => Ok(()),
            Some(_) => Err(ApiError::Unauthorized("invalid admin password".to_string())),
            None => Err(ApiError::Unauthorized("admin password required".to_string())),
        }
    }

    /// Current wall-clock time at the configured UTC offset
    pub fn current_time(&self) -> TimeOfDay {
        current_time(self.config.sync.utc_offset_minutes)
    }

    /// Latest analysis, served from the registry cache when possible
    pub async fn analysis(&self) -> Arc<AnalysisReport> {
        self.registry.lock().await.analyze(true)
    }

    /// Register a clock with the next free id and a normalized name
    pub async fn add_clock(&self, mut request: NewClock) -> ApiResult<(ClockRecord, Arc<AnalysisReport>)> {
        require_name_and_time(&request.name, &request.time)?;
        request.name = normalize_clock_name(&request.name);

        let mut registry = self.registry.lock().await;
        let clock = registry.add_clock(request)?.clone();
        tracing::info!(clock_id = clock.id(), clock = %clock.name(), "Clock added");

        let report = self.commit(&mut registry).await;
        Ok((clock, report))
    }

    /// Rename a clock and set its time
    pub async fn update_clock(
        &self,
        id: u32,
        name: &str,
        time: &str,
    ) -> ApiResult<(ClockRecord, Arc<AnalysisReport>)> {
        require_name_and_time(name, time)?;
        let name = normalize_clock_name(name);

        let mut registry = self.registry.lock().await;
        let clock = registry.update_clock(id, &name, time)?.clone();
        tracing::info!(clock_id = id, time = %clock.time(), "Clock updated");

        let report = self.commit(&mut registry).await;
        Ok((clock, report))
    }

    /// Remove a clock
    pub async fn remove_clock(&self, id: u32) -> ApiResult<Arc<AnalysisReport>> {
        let mut registry = self.registry.lock().await;
        if !registry.remove_clock(id).success {
            return Err(ClockError::ClockNotFound(id).into());
        }
        tracing::info!(clock_id = id, "Clock removed");

        Ok(self.commit(&mut registry).await)
    }

    /// Set the reference time explicitly
    pub async fn set_reference_time(&self, time: &str) -> ApiResult<Arc<AnalysisReport>> {
        let mut registry = self.registry.lock().await;
        registry.set_reference_time(time)?;
        tracing::info!(reference = %time, "Reference time set");

        Ok(self.commit(&mut registry).await)
    }

    /// Move the reference time to the current time
    pub async fn sync_to_current_time(&self) -> ApiResult<Arc<AnalysisReport>> {
        let now = self.current_time();
        self.set_reference_time(&now.to_string()).await
    }

    /// Shift clocks by minute deltas
    pub async fn simulate_drift(
        &self,
        drift: &BTreeMap<u32, i64>,
    ) -> ApiResult<(Vec<u32>, Arc<AnalysisReport>)> {
        let mut registry = self.registry.lock().await;
        let shifted = registry.simulate_drift(drift);
        tracing::info!(shifted = ?shifted, "Drift simulated");

        let report = self.commit(&mut registry).await;
        Ok((shifted, report))
    }

    /// Export the registry state
    pub async fn export_state(&self) -> RegistryState {
        self.registry.lock().await.export_state()
    }

    /// Replace the registry state
    pub async fn import_state(&self, state: RegistryState) -> ApiResult<Arc<AnalysisReport>> {
        let mut registry = self.registry.lock().await;
        registry.import_state(state)?;

        Ok(self.commit(&mut registry).await)
    }

    /// Reference ticker step: follow the system clock and raise alerts
    ///
    /// The report is only pushed when the reference time actually moved.
    pub async fn tick(&self) -> Option<Arc<AnalysisReport>> {
        let now = self.current_time();
        let mut registry = self.registry.lock().await;

        let report = if self.follows_system_clock() && registry.reference_time() != now {
            if let Err(e) = registry.set_reference_time(&now.to_string()) {
                tracing::error!(error = %e, "Failed to follow system clock");
                return None;
            }
            Some(self.commit(&mut registry).await)
        } else {
            None
        };

        for clock in registry.out_of_sync(self.config.sync.alert_tolerance) {
            self.ws_hub.broadcast(&WsEvent::out_of_sync(&clock)).await;
        }
        report
    }

    /// Whether the reference tracks the system clock
    pub fn follows_system_clock(&self) -> bool {
        self.config.sync.follow_system_clock && self.config.sync.reference_time.is_none()
    }

    fn state_file(&self) -> Option<PathBuf> {
        self.config.sync.state_file.as_ref().map(PathBuf::from)
    }

    /// Analyze, push the report to subscribers and persist the state
    ///
    /// Called with the registry lock held so pushed reports and saved files
    /// both follow mutation order.
    async fn commit(&self, registry: &mut ClockRegistry) -> Arc<AnalysisReport> {
        let report = registry.analyze(true);
        self.ws_hub
            .broadcast(&WsEvent::analysis(Arc::clone(&report)))
            .await;

        if let Some(path) = self.state_file() {
            let state = registry.export_state();
            let saved =
                tokio::task::spawn_blocking(move || store::save_state(&path, &state)).await;
            match saved {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Failed to save registry state"),
                Err(e) => tracing::error!(error = %e, "State save task failed"),
            }
        }

        report
    }
}
