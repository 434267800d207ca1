// =============================================================================
// Golden-cross view — symbols currently flagged, newest crossover first
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::dashboard::format::format_price;
use crate::dashboard::summary::Cell;
use crate::refresh::DashboardSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct GoldenCrossEntry {
    pub symbol: String,
    pub company: String,
    pub crossover_date: NaiveDate,
    pub crossover_price: Cell,
    pub current_price: Cell,
    /// Trading days since the crossover bar (0 when it is the latest bar).
    pub sessions_since: usize,
    pub ma_50d: Cell,
    pub ma_200d: Cell,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoldenCrossView {
    pub cycle_id: Uuid,
    pub refreshed_at: DateTime<Utc>,
    pub entries: Vec<GoldenCrossEntry>,
}

pub fn build_golden_cross(snapshot: &DashboardSnapshot) -> GoldenCrossView {
    let mut entries: Vec<GoldenCrossEntry> = snapshot
        .reports
        .iter()
        .filter_map(|report| {
            let data = report.data()?;
            let m = &data.metrics;
            let date = m.crossover.crossover_date.filter(|_| m.golden_cross())?;
            let sessions_since = data
                .series
                .bars()
                .iter()
                .filter(|bar| bar.date > date)
                .count();

            Some(GoldenCrossEntry {
                symbol: report.symbol.clone(),
                company: report.company.clone(),
                crossover_date: date,
                crossover_price: Cell::new(m.crossover.crossover_price, format_price),
                current_price: Cell::new(Some(m.current_price), format_price),
                sessions_since,
                ma_50d: Cell::new(m.ma_50d, format_price),
                ma_200d: Cell::new(m.ma_200d, format_price),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.crossover_date
            .cmp(&a.crossover_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    GoldenCrossView {
        cycle_id: snapshot.cycle_id,
        refreshed_at: snapshot.refreshed_at,
        entries,
    }
}
