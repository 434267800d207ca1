// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA is the unweighted arithmetic mean of the most recent `period` closes:
//   SMA_t = (close_{t-period+1} + ... + close_t) / period
//
// Every window is summed directly rather than through a running sum, so the
// last value of `calculate_sma` is bit-identical to `trailing_sma` and two
// series built from identical closes compare exactly equal.
// =============================================================================

/// Compute the rolling SMA series for `closes` and look-back `period`.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to a close starting at index `period - 1`.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    closes.windows(period).map(|w| mean(w, period)).collect()
}

/// Mean of the most recent `period` closes.
///
/// Returns `None` when fewer than `period` closes exist or the period is zero.
pub fn trailing_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    Some(mean(&closes[closes.len() - period..], period))
}

/// Rolling SMA aligned to the input: `None` until enough history exists.
///
/// Used by the chart series where every bar needs a slot.
pub fn aligned_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let series = calculate_sma(closes, period);
    let warmup = closes.len() - series.len();
    std::iter::repeat(None)
        .take(warmup)
        .chain(series.into_iter().map(Some))
        .collect()
}

fn mean(window: &[f64], period: usize) -> f64 {
    window.iter().sum::<f64>() / period as f64
}
