// =============================================================================
// Metrics Engine — point-in-time metrics for one symbol
// =============================================================================
//
// Turns a daily price series into the snapshot shown on the dashboard:
// latest OHLCV, change versus the previous close, trailing 50/200-day SMAs
// and the golden-cross signal.
//
// Previous-close rule:
//   1. close of the second-most-recent bar, when the series has >= 2 bars;
//   2. otherwise the provider's reported previous close, when available;
//   3. otherwise the current price (zero change).
//
// A zero previous close yields a 0 % change instead of a division by zero.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::indicators::golden_cross::{self, CrossoverParams, CrossoverSignal};
use crate::indicators::sma::trailing_sma;
use crate::market_data::PriceSeries;

/// Read-only metrics snapshot for one symbol, rebuilt every refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub daily_change: f64,
    pub percentage_change: f64,
    /// Present iff the series holds at least `fast_period` bars.
    pub ma_50d: Option<f64>,
    /// Present iff the series holds at least `slow_period` bars.
    pub ma_200d: Option<f64>,
    #[serde(flatten)]
    pub crossover: CrossoverSignal,
    pub bars_used: usize,
    pub computed_at: DateTime<Utc>,
}

impl SymbolMetrics {
    pub fn golden_cross(&self) -> bool {
        self.crossover.golden_cross
    }
}

/// Compute the metrics snapshot for `series`.
///
/// `fallback_previous_close` is only consulted when the series has a single
/// bar. Fails with [`MonitorError::NoData`] on an empty series; short series
/// simply leave the moving averages and crossover fields absent.
pub fn compute_metrics(
    series: &PriceSeries,
    fallback_previous_close: Option<f64>,
    params: &CrossoverParams,
    computed_at: DateTime<Utc>,
) -> Result<SymbolMetrics> {
    let latest = series
        .last()
        .ok_or_else(|| MonitorError::NoData(series.symbol().to_string()))?;

    let current_price = latest.close;
    let previous_close = series
        .nth_from_end(1)
        .map(|bar| bar.close)
        .or(fallback_previous_close)
        .unwrap_or(current_price);

    let daily_change = current_price - previous_close;
    let percentage_change = percent_change(daily_change, previous_close);

    let closes = series.closes();

    Ok(SymbolMetrics {
        symbol: series.symbol().to_string(),
        current_price,
        previous_close,
        open: latest.open,
        high: latest.high,
        low: latest.low,
        volume: latest.volume,
        daily_change,
        percentage_change,
        ma_50d: trailing_sma(&closes, params.fast_period),
        ma_200d: trailing_sma(&closes, params.slow_period),
        crossover: golden_cross::detect(series, params),
        bars_used: series.len(),
        computed_at,
    })
}

/// `change / reference * 100`, or 0 when the reference is zero.
pub fn percent_change(change: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        change / reference * 100.0
    }
}
