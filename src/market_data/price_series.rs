use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// ---------------------------------------------------------------------------
// PriceSeries -- immutable, chronologically ordered bars for one symbol
// ---------------------------------------------------------------------------

/// Daily price history for one symbol, oldest bar first.
///
/// The series is normalised once at construction and never mutated
/// afterwards: bars are sorted by date and a repeated date keeps the last bar
/// received for it. Everything downstream (metrics, crossover scan, charts)
/// reads it through shared references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from provider output in any order.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        // Stable sort keeps arrival order within a date, so the dedup below
        // retains the most recently received bar.
        bars.sort_by_key(|b| b.date);

        let mut normalised: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match normalised.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => normalised.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            bars: normalised,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar, if any.
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Bar `n` positions before the most recent one (`0` is the last bar).
    pub fn nth_from_end(&self, n: usize) -> Option<&PriceBar> {
        self.bars.len().checked_sub(n + 1).map(|i| &self.bars[i])
    }

    /// All closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Keep only the most recent `count` bars.
    pub fn tail(&self, count: usize) -> Self {
        let start = self.bars.len().saturating_sub(count);
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[start..].to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
