// =============================================================================
// Detail card — one symbol with its price chart
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::dashboard::format::{format_price, format_signed};
use crate::dashboard::summary::{Cell, SummaryRow};
use crate::indicators::golden_cross::CrossoverParams;
use crate::indicators::sma::aligned_sma;
use crate::refresh::SymbolReport;

/// One chart point: close plus both moving averages once defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub ma_50d: Option<f64>,
    pub ma_200d: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    #[serde(flatten)]
    pub row: SummaryRow,
    /// `+1.23 (+0.45%)`
    pub change_display: Option<String>,
    pub open: Option<Cell>,
    pub high: Option<Cell>,
    pub low: Option<Cell>,
    pub crossover_price: Option<Cell>,
    pub chart: Vec<ChartPoint>,
}

pub fn build_detail(report: &SymbolReport, params: &CrossoverParams) -> DetailView {
    let row = SummaryRow::from_report(report);

    let Some(data) = report.data() else {
        return DetailView {
            row,
            change_display: None,
            open: None,
            high: None,
            low: None,
            crossover_price: None,
            chart: Vec::new(),
        };
    };

    let m = &data.metrics;
    let bars = data.series.bars();
    let closes = data.series.closes();
    let fast = aligned_sma(&closes, params.fast_period);
    let slow = aligned_sma(&closes, params.slow_period);

    let chart = bars
        .iter()
        .zip(fast)
        .zip(slow)
        .map(|((bar, ma_50d), ma_200d)| ChartPoint {
            date: bar.date,
            close: bar.close,
            ma_50d,
            ma_200d,
        })
        .collect();

    DetailView {
        row,
        change_display: Some(format!(
            "{} ({}%)",
            format_signed(m.daily_change),
            format_signed(m.percentage_change)
        )),
        open: Some(Cell::new(Some(m.open), format_price)),
        high: Some(Cell::new(Some(m.high), format_price)),
        low: Some(Cell::new(Some(m.low), format_price)),
        crossover_price: m
            .crossover
            .crossover_price
            .map(|p| Cell::new(Some(p), format_price)),
        chart,
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MarketDataProvider;
    use crate::refresh::refresh_all;
    use crate::refresh::tests::{config_for, fixture_provider};
    use std::sync::Arc;

    #[tokio::test]
    async fn chart_aligns_averages_with_bars() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(fixture_provider());
        let snapshot = refresh_all(provider, &config_for(&["AAPL"])).await;
        let view = build_detail(&snapshot.reports[0], &CrossoverParams::default());

        assert_eq!(view.chart.len(), 230);
        assert!(view.chart[48].ma_50d.is_none());
        assert_eq!(view.chart[49].ma_50d, Some(100.0));
        assert!(view.chart[198].ma_200d.is_none());
        assert_eq!(view.chart[199].ma_200d, Some(100.0));

        let last = view.chart.last().unwrap();
        assert_eq!(last.close, 111.0);
        assert_eq!(Some(last.ma_50d.unwrap()), view.row.ma_50d.as_ref().unwrap().raw);

        assert_eq!(view.change_display.as_deref(), Some("+1.00 (+0.91%)"));
        assert_eq!(view.crossover_price.as_ref().unwrap().display, "$101.00");
        assert_eq!(view.open.as_ref().unwrap().display, "$111.00");
    }

    #[tokio::test]
    async fn no_data_detail_is_empty() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(fixture_provider());
        let snapshot = refresh_all(provider, &config_for(&["NVDA"])).await;
        let view = build_detail(&snapshot.reports[0], &CrossoverParams::default());

        assert!(!view.row.has_data);
        assert!(view.chart.is_empty());
        assert!(view.change_display.is_none());
    }
}
