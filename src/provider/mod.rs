// =============================================================================
// Market-data providers
// =============================================================================
//
// The refresh cycle only talks to the `MarketDataProvider` trait, so the
// Yahoo adapter can be swapped for an in-memory source in tests. Methods
// return boxed futures to keep the trait object safe (`Arc<dyn ...>`).

pub mod yahoo;

use anyhow::Result;
use futures_util::future::BoxFuture;

use crate::market_data::{PriceSeries, SymbolMetadata};

pub use yahoo::YahooClient;

pub trait MarketDataProvider: Send + Sync {
    /// Daily OHLCV history covering roughly the last `days` trading days.
    fn fetch_history<'a>(&'a self, symbol: &'a str, days: usize) -> BoxFuture<'a, Result<PriceSeries>>;

    /// Fundamentals and previous close. Absent fields stay `None`.
    fn fetch_metadata<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<SymbolMetadata>>;
}

// -----------------------------------------------------------------------------
// In-memory provider for tests
// -----------------------------------------------------------------------------
