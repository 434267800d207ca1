// =============================================================================
// Summary table — one row per watched symbol
// =============================================================================
//
// Each numeric cell carries both the raw value (used for sorting) and its
// display string. Absent values sort after present ones in either direction,
// and symbols without data always sort after symbols with data.
// =============================================================================

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dashboard::format::{
    format_currency, format_fraction_percent, format_percent, format_price, format_ratio,
    format_signed, format_volume,
};
use crate::refresh::{DashboardSnapshot, ReportStatus, SymbolReport};
use crate::types::SortOrder;

/// A numeric value paired with its rendered form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub raw: Option<f64>,
    pub display: String,
}

impl Cell {
    pub fn new(raw: Option<f64>, render: impl FnOnce(Option<f64>) -> String) -> Self {
        Self {
            raw,
            display: render(raw),
        }
    }

    /// Cell for a value that is always present but formatted without `Option`.
    pub fn signed(raw: f64, render: fn(f64) -> String) -> Self {
        Self {
            raw: Some(raw),
            display: render(raw),
        }
    }
}

/// One summary-table row. Metric fields are `None` when the symbol had no
/// data this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub symbol: String,
    pub company: String,
    pub has_data: bool,
    pub error: Option<String>,
    pub price: Option<Cell>,
    pub daily_change: Option<Cell>,
    pub percentage_change: Option<Cell>,
    pub trailing_pe: Option<Cell>,
    pub forward_pe: Option<Cell>,
    pub eps: Option<Cell>,
    pub peg_ratio: Option<Cell>,
    pub price_to_book: Option<Cell>,
    pub short_percent_float: Option<Cell>,
    pub golden_cross: bool,
    pub crossover_date: Option<NaiveDate>,
    pub ma_50d: Option<Cell>,
    pub ma_200d: Option<Cell>,
    pub volume: Option<Cell>,
    pub market_cap: Option<Cell>,
}

impl SummaryRow {
    pub fn from_report(report: &SymbolReport) -> Self {
        let mut row = Self {
            symbol: report.symbol.clone(),
            company: report.company.clone(),
            has_data: false,
            error: None,
            price: None,
            daily_change: None,
            percentage_change: None,
            trailing_pe: None,
            forward_pe: None,
            eps: None,
            peg_ratio: None,
            price_to_book: None,
            short_percent_float: None,
            golden_cross: false,
            crossover_date: None,
            ma_50d: None,
            ma_200d: None,
            volume: None,
            market_cap: None,
        };

        let data = match &report.status {
            ReportStatus::Ready(data) => data,
            ReportStatus::NoData { reason } => {
                row.error = Some(reason.clone());
                return row;
            }
        };

        let m = &data.metrics;
        let meta = &data.metadata;

        row.has_data = true;
        row.price = Some(Cell::new(Some(m.current_price), format_price));
        row.daily_change = Some(Cell::signed(m.daily_change, format_signed));
        row.percentage_change = Some(Cell::signed(m.percentage_change, format_percent));
        row.trailing_pe = Some(Cell::new(meta.trailing_pe, format_ratio));
        row.forward_pe = Some(Cell::new(meta.forward_pe, format_ratio));
        row.eps = Some(Cell::new(meta.eps, format_ratio));
        row.peg_ratio = Some(Cell::new(meta.peg_ratio, format_ratio));
        row.price_to_book = Some(Cell::new(meta.price_to_book, format_ratio));
        row.short_percent_float = Some(Cell::new(meta.short_percent_float, format_fraction_percent));
        row.golden_cross = m.golden_cross();
        row.crossover_date = m.crossover.crossover_date;
        row.ma_50d = Some(Cell::new(m.ma_50d, format_price));
        row.ma_200d = Some(Cell::new(m.ma_200d, format_price));
        row.volume = Some(Cell::new(Some(m.volume), format_volume));
        row.market_cap = Some(Cell::new(meta.market_cap, format_currency));
        row
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Columns the summary table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    /// Configured watch-list order.
    #[default]
    Default,
    Symbol,
    Company,
    Price,
    DailyChange,
    PercentageChange,
    TrailingPe,
    ForwardPe,
    Eps,
    PegRatio,
    PriceToBook,
    ShortPercentFloat,
    GoldenCross,
    Ma50d,
    Ma200d,
    Volume,
    MarketCap,
}

enum SortKey<'a> {
    Position,
    Text(&'a str),
    Number(Option<f64>),
    Flag(bool),
}

impl SortColumn {
    fn key<'a>(&self, row: &'a SummaryRow) -> SortKey<'a> {
        let num = |cell: &Option<Cell>| SortKey::Number(cell.as_ref().and_then(|c| c.raw));
        match self {
            Self::Default => SortKey::Position,
            Self::Symbol => SortKey::Text(&row.symbol),
            Self::Company => SortKey::Text(&row.company),
            Self::Price => num(&row.price),
            Self::DailyChange => num(&row.daily_change),
            Self::PercentageChange => num(&row.percentage_change),
            Self::TrailingPe => num(&row.trailing_pe),
            Self::ForwardPe => num(&row.forward_pe),
            Self::Eps => num(&row.eps),
            Self::PegRatio => num(&row.peg_ratio),
            Self::PriceToBook => num(&row.price_to_book),
            Self::ShortPercentFloat => num(&row.short_percent_float),
            Self::GoldenCross => SortKey::Flag(row.golden_cross),
            Self::Ma50d => num(&row.ma_50d),
            Self::Ma200d => num(&row.ma_200d),
            Self::Volume => num(&row.volume),
            Self::MarketCap => num(&row.market_cap),
        }
    }
}

fn compare_rows(a: &SummaryRow, b: &SummaryRow, column: SortColumn, order: SortOrder) -> Ordering {
    match (a.has_data, b.has_data) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) if column != SortColumn::Symbol && column != SortColumn::Company => {
            return Ordering::Equal
        }
        _ => {}
    }

    match (column.key(a), column.key(b)) {
        (SortKey::Text(x), SortKey::Text(y)) => order.apply(x.cmp(y)),
        (SortKey::Flag(x), SortKey::Flag(y)) => order.apply(x.cmp(&y)),
        (SortKey::Number(x), SortKey::Number(y)) => match (x, y) {
            (Some(x), Some(y)) => order.apply(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

/// Sort rows in place. The sort is stable, so ties keep watch-list order.
pub fn sort_rows(rows: &mut [SummaryRow], column: SortColumn, order: SortOrder) {
    if column == SortColumn::Default {
        if order == SortOrder::Desc {
            rows.reverse();
        }
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, column, order));
}

// =============================================================================
// View
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub cycle_id: Uuid,
    pub refreshed_at: DateTime<Utc>,
    pub sort: SortColumn,
    pub order: SortOrder,
    pub rows: Vec<SummaryRow>,
}

pub fn build_summary(snapshot: &DashboardSnapshot, sort: SortColumn, order: SortOrder) -> SummaryView {
    let mut rows: Vec<SummaryRow> = snapshot.reports.iter().map(SummaryRow::from_report).collect();
    sort_rows(&mut rows, sort, order);

    SummaryView {
        cycle_id: snapshot.cycle_id,
        refreshed_at: snapshot.refreshed_at,
        sort,
        order,
        rows,
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SymbolMetadata;
    use crate::provider::MarketDataProvider;
    use crate::refresh::refresh_all;
    use crate::refresh::tests::{config_for, fixture_provider, series_from};
    use std::sync::Arc;

    fn symbols(view: &SummaryView) -> Vec<&str> {
        view.rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    async fn snapshot() -> DashboardSnapshot {
        let provider = fixture_provider()
            .with_series(series_from("AMD", &vec![150.0; 210]))
            .with_metadata(
                "AMD",
                SymbolMetadata {
                    trailing_pe: Some(45.0),
                    market_cap: Some(240e9),
                    ..SymbolMetadata::default()
                },
            );
        let provider: Arc<dyn MarketDataProvider> = Arc::new(provider);
        refresh_all(provider, &config_for(&["TSLA", "MSFT", "AAPL", "AMD"])).await
    }

    #[tokio::test]
    async fn rows_render_values_and_na() {
        let view = build_summary(&snapshot().await, SortColumn::Default, SortOrder::Asc);
        assert_eq!(symbols(&view), vec!["TSLA", "MSFT", "AAPL", "AMD"]);

        let tsla = &view.rows[0];
        assert!(!tsla.has_data);
        assert!(tsla.price.is_none());
        assert!(tsla.error.as_deref().unwrap().contains("TSLA"));

        let msft = &view.rows[1];
        assert_eq!(msft.price.as_ref().unwrap().display, "$400.00");
        assert_eq!(msft.daily_change.as_ref().unwrap().display, "+0.00");
        assert_eq!(msft.percentage_change.as_ref().unwrap().display, "+0.00%");
        assert_eq!(msft.ma_50d.as_ref().unwrap().display, "$400.00");
        assert_eq!(msft.ma_200d.as_ref().unwrap().display, "N/A");
        assert_eq!(msft.trailing_pe.as_ref().unwrap().display, "N/A");
        assert_eq!(msft.volume.as_ref().unwrap().display, "2.50M");

        let aapl = &view.rows[2];
        assert!(aapl.golden_cross);
        assert_eq!(aapl.market_cap.as_ref().unwrap().display, "$2.90T");
        assert_eq!(aapl.percentage_change.as_ref().unwrap().display, "+0.91%");
    }

    #[tokio::test]
    async fn numeric_sort_puts_absent_last_both_ways() {
        let snap = snapshot().await;

        let asc = build_summary(&snap, SortColumn::TrailingPe, SortOrder::Asc);
        assert_eq!(symbols(&asc), vec!["AAPL", "AMD", "MSFT", "TSLA"]);

        let desc = build_summary(&snap, SortColumn::TrailingPe, SortOrder::Desc);
        assert_eq!(symbols(&desc), vec!["AMD", "AAPL", "MSFT", "TSLA"]);
    }

    #[tokio::test]
    async fn text_and_flag_sorts() {
        let snap = snapshot().await;

        let by_symbol = build_summary(&snap, SortColumn::Symbol, SortOrder::Asc);
        assert_eq!(symbols(&by_symbol), vec!["AAPL", "AMD", "MSFT", "TSLA"]);

        let by_flag = build_summary(&snap, SortColumn::GoldenCross, SortOrder::Desc);
        assert_eq!(by_flag.rows[0].symbol, "AAPL");
        assert_eq!(by_flag.rows[3].symbol, "TSLA");
    }

    #[tokio::test]
    async fn default_desc_reverses_watch_list() {
        let view = build_summary(&snapshot().await, SortColumn::Default, SortOrder::Desc);
        assert_eq!(symbols(&view), vec!["AMD", "AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn sort_column_parses_snake_case() {
        let col: SortColumn = serde_json::from_str("\"percentage_change\"").unwrap();
        assert_eq!(col, SortColumn::PercentageChange);
        let col: SortColumn = serde_json::from_str("\"ma50d\"").unwrap();
        assert_eq!(col, SortColumn::Ma50d);
    }
}
