pub mod metadata;
pub mod price_series;

// Re-export for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use metadata::SymbolMetadata;
pub use price_series::{PriceBar, PriceSeries};
