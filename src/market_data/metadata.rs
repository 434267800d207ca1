use serde::{Deserialize, Serialize};

/// Supplementary per-symbol fundamentals reported by the provider.
///
/// Every field is optional: an absent value means the provider did not
/// report it and is rendered as `N/A`, never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub long_name: Option<String>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    /// Fraction of float sold short (0.05 == 5 %).
    pub short_percent_float: Option<f64>,
    pub market_cap: Option<f64>,
    pub previous_close: Option<f64>,
}
