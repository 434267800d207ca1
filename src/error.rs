use thiserror::Error as ThisError;

/// Domain errors surfaced per symbol or at configuration time.
///
/// Insufficient history is deliberately absent: missing moving averages are a
/// normal state, not a failure.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("no price data for {0}")]
    NoData(String),

    #[error("provider unavailable for {symbol}: {reason}")]
    ProviderUnavailable { symbol: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
