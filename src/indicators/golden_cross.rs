// =============================================================================
// Golden Cross Detector
// =============================================================================
//
// A golden cross is the day the fast SMA (50) closes strictly above the slow
// SMA (200) after having been at or below it the previous day:
//
//   fast[i] > slow[i]  AND  fast[i-1] <= slow[i-1]
//
// Only the trailing `lookback_days` bars on which both averages exist are
// examined, newest first, and the first hit wins. The day before a candidate
// may fall outside the lookback window; it only needs both averages defined.
// The very first day with both averages therefore can never be a crossover.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::sma::calculate_sma;
use crate::market_data::{PriceBar, PriceSeries};

fn default_fast_period() -> usize {
    50
}

fn default_slow_period() -> usize {
    200
}

fn default_lookback_days() -> usize {
    30
}

/// Window lengths for the crossover scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverParams {
    #[serde(default = "default_fast_period")]
    pub fast_period: usize,

    #[serde(default = "default_slow_period")]
    pub slow_period: usize,

    /// Trailing trading days examined for a crossover.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: default_fast_period(),
            slow_period: default_slow_period(),
            lookback_days: default_lookback_days(),
        }
    }
}

/// Outcome of a crossover scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossoverSignal {
    pub golden_cross: bool,
    pub crossover_date: Option<NaiveDate>,
    /// Close on the day the crossover completed.
    pub crossover_price: Option<f64>,
}

impl CrossoverSignal {
    pub fn none() -> Self {
        Self::default()
    }

    fn at(bar: &PriceBar) -> Self {
        Self {
            golden_cross: true,
            crossover_date: Some(bar.date),
            crossover_price: Some(bar.close),
        }
    }
}

/// Scan `series` for the most recent golden cross inside the lookback window.
///
/// Series shorter than the slow period, zero periods and a zero lookback all
/// report no crossover rather than an error.
pub fn detect(series: &PriceSeries, params: &CrossoverParams) -> CrossoverSignal {
    let CrossoverParams {
        fast_period,
        slow_period,
        lookback_days,
    } = *params;

    let bars = series.bars();
    let longest = fast_period.max(slow_period);
    if fast_period == 0 || slow_period == 0 || lookback_days == 0 || bars.len() < longest {
        return CrossoverSignal::none();
    }

    let closes = series.closes();
    let fast = calculate_sma(&closes, fast_period);
    let slow = calculate_sma(&closes, slow_period);

    // Rolling series start at index `period - 1` of the bars.
    let fast_at = |i: usize| fast[i + 1 - fast_period];
    let slow_at = |i: usize| slow[i + 1 - slow_period];

    let first_defined = longest - 1;
    let last = bars.len() - 1;
    let window_start = bars.len().saturating_sub(lookback_days).max(first_defined);

    for i in (window_start.max(first_defined + 1)..=last).rev() {
        let above_now = fast_at(i) > slow_at(i);
        let at_or_below_before = fast_at(i - 1) <= slow_at(i - 1);
        if above_now && at_or_below_before {
            debug!(
                symbol = series.symbol(),
                date = %bars[i].date,
                close = bars[i].close,
                "golden cross detected"
            );
            return CrossoverSignal::at(&bars[i]);
        }
    }

    CrossoverSignal::none()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Days::new(i as u64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000_000.0,
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    fn date_of(series: &PriceSeries, index: usize) -> NaiveDate {
        series.bars()[index].date
    }

    /// 219 flat bars then a linear rise of 11 bars: the fast SMA lifts off
    /// the slow SMA on index 219, ten bars before the last one.
    fn rise_ten_days_ago() -> Vec<f64> {
        let mut closes = vec![100.0; 219];
        closes.extend((1..=11).map(|k| 100.0 + k as f64));
        closes
    }

    #[test]
    fn short_series_reports_nothing() {
        let series = series_from(&vec![100.0; 199]);
        assert_eq!(detect(&series, &CrossoverParams::default()), CrossoverSignal::none());
    }

    #[test]
    fn flat_series_never_crosses() {
        let series = series_from(&vec![100.0; 200]);
        assert!(!detect(&series, &CrossoverParams::default()).golden_cross);

        let longer = series_from(&vec![100.0; 260]);
        assert!(!detect(&longer, &CrossoverParams::default()).golden_cross);
    }

    #[test]
    fn detects_cross_ten_days_before_last_bar() {
        let closes = rise_ten_days_ago();
        let series = series_from(&closes);
        let signal = detect(&series, &CrossoverParams::default());

        assert!(signal.golden_cross);
        assert_eq!(signal.crossover_date, Some(date_of(&series, 219)));
        assert_eq!(signal.crossover_price, Some(101.0));
        assert_eq!(series.len() - 1 - 219, 10);
    }

    #[test]
    fn equal_then_above_counts_as_cross() {
        // Day 199 has fast == slow == 100 exactly; day 200 lifts fast above.
        let mut closes = vec![100.0; 200];
        closes.push(101.0);
        let series = series_from(&closes);
        let signal = detect(&series, &CrossoverParams::default());

        assert!(signal.golden_cross);
        assert_eq!(signal.crossover_date, Some(date_of(&series, 200)));
    }

    #[test]
    fn first_defined_day_is_never_a_cross() {
        // Fast is above slow from the very first day both exist.
        let mut closes = vec![50.0; 150];
        closes.extend(vec![150.0; 50]);
        let series = series_from(&closes);
        assert!(!detect(&series, &CrossoverParams::default()).golden_cross);
    }

    #[test]
    fn reports_most_recent_of_several_crosses() {
        // Cross up at 200, fall below at 205, cross up again at 206.
        let mut closes = vec![100.0; 200];
        closes.extend(vec![101.0; 5]);
        closes.push(50.0);
        closes.push(200.0);
        closes.extend(vec![100.0; 3]);
        let series = series_from(&closes);
        let signal = detect(&series, &CrossoverParams::default());

        assert!(signal.golden_cross);
        assert_eq!(signal.crossover_date, Some(date_of(&series, 206)));
        assert_eq!(signal.crossover_price, Some(200.0));
    }

    #[test]
    fn crossover_older_than_lookback_is_ignored() {
        let mut closes = vec![100.0; 200];
        closes.extend(vec![101.0; 60]);
        let series = series_from(&closes);
        assert!(!detect(&series, &CrossoverParams::default()).golden_cross);

        let wide = CrossoverParams {
            lookback_days: 61,
            ..CrossoverParams::default()
        };
        assert_eq!(
            detect(&series, &wide).crossover_date,
            Some(date_of(&series, 200))
        );
    }

    #[test]
    fn prior_day_may_sit_outside_the_window() {
        let series = series_from(&rise_ten_days_ago());

        let ten = CrossoverParams {
            lookback_days: 10,
            ..CrossoverParams::default()
        };
        assert!(!detect(&series, &ten).golden_cross);

        let eleven = CrossoverParams {
            lookback_days: 11,
            ..CrossoverParams::default()
        };
        assert_eq!(
            detect(&series, &eleven).crossover_date,
            Some(date_of(&series, 219))
        );
    }

    #[test]
    fn zero_lookback_reports_nothing() {
        let series = series_from(&rise_ten_days_ago());
        let params = CrossoverParams {
            lookback_days: 0,
            ..CrossoverParams::default()
        };
        assert!(!detect(&series, &params).golden_cross);
    }

    #[test]
    fn detection_is_idempotent() {
        let series = series_from(&rise_ten_days_ago());
        let params = CrossoverParams::default();
        let first = detect(&series, &params);
        let second = detect(&series, &params);
        assert_eq!(first, second);
    }
}
