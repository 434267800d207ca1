// =============================================================================
// Refresh Cycle — per-symbol fan-out joined into one ordered snapshot
// =============================================================================
//
// Every watched symbol gets its own tokio task (fetch history + metadata,
// compute metrics). Handles are awaited in configured order, so the snapshot
// is deterministic whatever order the tasks finish in. A failure inside one
// task (provider error, empty history, panic) becomes a `NoData` report for
// that symbol and never aborts the cycle.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::MonitorError;
use crate::indicators::golden_cross::CrossoverParams;
use crate::market_data::{PriceSeries, SymbolMetadata};
use crate::metrics::{compute_metrics, SymbolMetrics};
use crate::provider::MarketDataProvider;
use crate::runtime_config::{RuntimeConfig, WatchedSymbol};

// =============================================================================
// Snapshot types
// =============================================================================

/// Result of one refresh cycle. Immutable once published.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub cycle_id: Uuid,
    pub refreshed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// One report per watched symbol, in configured order.
    pub reports: Vec<SymbolReport>,
}

impl DashboardSnapshot {
    pub fn report(&self, symbol: &str) -> Option<&SymbolReport> {
        self.reports
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn ready_count(&self) -> usize {
        self.reports.iter().filter(|r| r.data().is_some()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.reports.iter().filter_map(|r| match &r.status {
            ReportStatus::NoData { reason } => Some((r.symbol.as_str(), reason.as_str())),
            ReportStatus::Ready(_) => None,
        })
    }
}

/// Outcome for one symbol in a refresh cycle.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub company: String,
    pub status: ReportStatus,
}

impl SymbolReport {
    pub fn data(&self) -> Option<&SymbolData> {
        match &self.status {
            ReportStatus::Ready(data) => Some(data),
            ReportStatus::NoData { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReportStatus {
    Ready(Box<SymbolData>),
    NoData { reason: String },
}

/// Everything computed for a symbol with usable history.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub metrics: SymbolMetrics,
    pub metadata: SymbolMetadata,
    pub series: Arc<PriceSeries>,
}

/// Compact cycle summary returned by the refresh endpoint and logged.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub refreshed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub symbols: usize,
    pub ready: usize,
    pub no_data: Vec<String>,
}

impl From<&DashboardSnapshot> for CycleSummary {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        Self {
            cycle_id: snapshot.cycle_id,
            refreshed_at: snapshot.refreshed_at,
            elapsed_ms: snapshot.elapsed_ms,
            symbols: snapshot.reports.len(),
            ready: snapshot.ready_count(),
            no_data: snapshot.failures().map(|(s, _)| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Refresh
// =============================================================================

/// Run one refresh cycle over every symbol in `config`.
pub async fn refresh_all(
    provider: Arc<dyn MarketDataProvider>,
    config: &RuntimeConfig,
) -> DashboardSnapshot {
    let started = Instant::now();
    let refreshed_at = Utc::now();
    let cycle_id = Uuid::new_v4();

    let handles: Vec<_> = config
        .symbols
        .iter()
        .map(|watched| {
            let provider = provider.clone();
            let watched = watched.clone();
            let history_days = config.history_days;
            let params = config.crossover;
            tokio::spawn(async move {
                analyze_symbol(provider.as_ref(), &watched, history_days, &params, refreshed_at).await
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (watched, handle) in config.symbols.iter().zip(handles) {
        let report = match handle.await {
            Ok(report) => report,
            Err(e) => {
                warn!(symbol = %watched.symbol, error = %e, "symbol task aborted");
                no_data(watched, None, format!("refresh task failed: {e}"))
            }
        };
        reports.push(report);
    }

    let snapshot = DashboardSnapshot {
        cycle_id,
        refreshed_at,
        elapsed_ms: started.elapsed().as_millis() as u64,
        reports,
    };

    info!(
        cycle_id = %snapshot.cycle_id,
        symbols = snapshot.reports.len(),
        ready = snapshot.ready_count(),
        elapsed_ms = snapshot.elapsed_ms,
        "refresh cycle complete"
    );

    snapshot
}

/// Fetch and compute a single symbol. Never fails: errors become `NoData`.
pub async fn analyze_symbol(
    provider: &dyn MarketDataProvider,
    watched: &WatchedSymbol,
    history_days: usize,
    params: &CrossoverParams,
    computed_at: DateTime<Utc>,
) -> SymbolReport {
    let symbol = watched.symbol.as_str();

    let (history, metadata) = tokio::join!(
        provider.fetch_history(symbol, history_days),
        provider.fetch_metadata(symbol),
    );

    let metadata = match metadata {
        Ok(m) => m,
        Err(e) => {
            debug!(symbol, error = %e, "metadata unavailable; fields will show N/A");
            SymbolMetadata::default()
        }
    };

    let series = match history {
        Ok(series) => series,
        Err(e) => {
            let err = MonitorError::ProviderUnavailable {
                symbol: symbol.to_string(),
                reason: format!("{e:#}"),
            };
            warn!(symbol, error = %err, "history fetch failed");
            return no_data(watched, Some(&metadata), err.to_string());
        }
    };

    match compute_metrics(&series, metadata.previous_close, params, computed_at) {
        Ok(metrics) => {
            debug!(
                symbol,
                bars = series.len(),
                golden_cross = metrics.golden_cross(),
                "symbol metrics computed"
            );
            SymbolReport {
                symbol: symbol.to_string(),
                company: company_name(watched, Some(&metadata)),
                status: ReportStatus::Ready(Box::new(SymbolData {
                    metrics,
                    metadata,
                    series: Arc::new(series),
                })),
            }
        }
        Err(e) => {
            warn!(symbol, error = %e, "no usable history");
            no_data(watched, Some(&metadata), e.to_string())
        }
    }
}

fn no_data(watched: &WatchedSymbol, metadata: Option<&SymbolMetadata>, reason: String) -> SymbolReport {
    SymbolReport {
        symbol: watched.symbol.clone(),
        company: company_name(watched, metadata),
        status: ReportStatus::NoData { reason },
    }
}

/// Configured name, else the provider's long name, else the ticker.
fn company_name(watched: &WatchedSymbol, metadata: Option<&SymbolMetadata>) -> String {
    watched
        .company
        .clone()
        .or_else(|| metadata.and_then(|m| m.long_name.clone()))
        .unwrap_or_else(|| watched.symbol.clone())
}
