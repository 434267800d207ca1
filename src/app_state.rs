// =============================================================================
// Central Application State — Tech Stock Monitor
// =============================================================================
//
// Holds the configuration, the market-data provider and the most recently
// published dashboard snapshot. Snapshots are immutable `Arc`s swapped in
// wholesale at the end of each refresh cycle; request handlers clone the Arc
// and build their view from it without holding any lock.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the config, snapshot pointer and error log.
//   - tokio::sync::Mutex serialises refresh cycles so they never overlap.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::provider::MarketDataProvider;
use crate::refresh::{refresh_all, DashboardSnapshot};
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded per-symbol error notice for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Symbol the error belongs to, when there is one.
    pub symbol: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Shared application state, passed to handlers and background tasks as
/// `Arc<AppState>`.
pub struct AppState {
    /// Incremented whenever a new snapshot is published or config changes.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    pub provider: Arc<dyn MarketDataProvider>,

    latest: RwLock<Option<Arc<DashboardSnapshot>>>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    refresh_lock: tokio::sync::Mutex<()>,

    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            provider,
            latest: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error notice. The log is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted first.
    pub fn push_error(&self, msg: String, symbol: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            symbol,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// The most recently published snapshot, if any cycle has completed.
    pub fn latest_snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        self.latest.read().clone()
    }

    /// Run one refresh cycle and publish its snapshot.
    ///
    /// Concurrent callers queue behind the running cycle; each still gets a
    /// fresh snapshot of its own.
    pub async fn run_refresh(&self) -> Arc<DashboardSnapshot> {
        let _guard = self.refresh_lock.lock().await;

        let config = self.runtime_config.read().clone();
        let snapshot = Arc::new(refresh_all(self.provider.clone(), &config).await);

        for (symbol, reason) in snapshot.failures() {
            self.push_error(reason.to_string(), Some(symbol.to_string()));
        }

        *self.latest.write() = Some(snapshot.clone());
        self.increment_version();
        snapshot
    }

    /// Background loop: refresh every `refresh_interval_secs` while
    /// auto-refresh is enabled. The interval is re-read on every pass so
    /// config changes apply without a restart.
    pub async fn auto_refresh_loop(self: Arc<Self>) {
        info!("auto-refresh loop started");
        loop {
            let secs = self.runtime_config.read().refresh_interval_secs;
            tokio::time::sleep(Duration::from_secs(secs)).await;

            let enabled = self.runtime_config.read().auto_refresh;
            if !enabled {
                debug!("auto-refresh disabled; skipping cycle");
                continue;
            }
            self.run_refresh().await;
        }
    }

    pub fn set_auto_refresh(&self, enabled: bool) -> bool {
        let previous = {
            let mut cfg = self.runtime_config.write();
            std::mem::replace(&mut cfg.auto_refresh, enabled)
        };
        if previous != enabled {
            info!(enabled, "auto-refresh toggled");
            self.increment_version();
        }
        previous
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;
    use crate::refresh::tests::{config_for, fixture_provider};

    fn state(symbols: &[&str]) -> AppState {
        AppState::new(config_for(symbols), Arc::new(fixture_provider()))
    }

    #[tokio::test]
    async fn refresh_publishes_snapshot_and_bumps_version() {
        let state = state(&["AAPL", "TSLA"]);
        assert!(state.latest_snapshot().is_none());
        let before = state.current_state_version();

        let snapshot = state.run_refresh().await;

        assert_eq!(state.latest_snapshot().unwrap().cycle_id, snapshot.cycle_id);
        assert!(state.current_state_version() > before);
    }

    #[tokio::test]
    async fn failures_land_in_error_log() {
        let state = state(&["AAPL", "TSLA"]);
        state.run_refresh().await;

        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol.as_deref(), Some("TSLA"));
    }

    #[tokio::test]
    async fn each_refresh_replaces_the_snapshot() {
        let state = state(&["AAPL"]);
        let first = state.run_refresh().await;
        let second = state.run_refresh().await;
        assert_ne!(first.cycle_id, second.cycle_id);
        assert_eq!(state.latest_snapshot().unwrap().cycle_id, second.cycle_id);
    }

    #[tokio::test]
    async fn concurrent_refreshes_do_not_overlap() {
        let provider = Arc::new(
            ScriptedProvider::new(fixture_provider())
                .with_delay("AAPL", 20)
                .with_delay("MSFT", 10)
                .with_delay("NVDA", 5),
        );
        let state = AppState::new(config_for(&["AAPL", "MSFT", "NVDA"]), provider.clone());

        let (first, second) = tokio::join!(state.run_refresh(), state.run_refresh());

        assert_ne!(first.cycle_id, second.cycle_id);
        // One cycle's worth of fetches at most; two overlapping cycles would reach six.
        assert_eq!(provider.max_in_flight(), 3);

        let latest = state.latest_snapshot().unwrap();
        assert!(latest.cycle_id == first.cycle_id || latest.cycle_id == second.cycle_id);
    }

    #[test]
    fn error_log_is_capped() {
        let state = state(&["AAPL"]);
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("err {i}"), None);
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "err 5");
    }

    #[test]
    fn auto_refresh_toggle_reports_previous_value() {
        let state = state(&["AAPL"]);
        assert!(!state.set_auto_refresh(true));
        assert!(state.runtime_config.read().auto_refresh);
        assert!(state.set_auto_refresh(false));
    }
}
