// =============================================================================
// Runtime Configuration — watch list, refresh cadence and indicator windows
// =============================================================================
//
// Loaded from JSON at startup; the auto-refresh flag can be flipped at runtime
// through the API and is persisted on shutdown. A file that exists but cannot
// be parsed is never overwritten, and an environment override of the watch
// list only lasts for the current run.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::error::MonitorError;
use crate::indicators::golden_cross::CrossoverParams;
use crate::provider::yahoo::DEFAULT_BASE_URL;

/// Shortest auto-refresh interval accepted, in seconds.
const MIN_REFRESH_INTERVAL_SECS: u64 = 5;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<WatchedSymbol> {
    [
        ("AAPL", "Apple Inc."),
        ("AMD", "Advanced Micro Devices Inc."),
        ("AMZN", "Amazon.com Inc."),
        ("AVGO", "Broadcom Inc."),
        ("CDNS", "Cadence Design Systems Inc."),
        ("GOOGL", "Alphabet Inc. (Class A)"),
        ("INTU", "Intuit Inc."),
        ("LCID", "Lucid Group Inc."),
        ("META", "Meta Platforms Inc."),
        ("MSFT", "Microsoft Corporation"),
        ("NFLX", "Netflix Inc."),
        ("NVDA", "NVIDIA Corporation"),
        ("QCOM", "Qualcomm Inc."),
        ("RIVN", "Rivian Automotive Inc."),
        ("SNOW", "Snowflake Inc."),
        ("SNPS", "Synopsys Inc."),
        ("TSLA", "Tesla Inc."),
        ("TSM", "Taiwan Semiconductor Manufacturing Co. Ltd."),
    ]
    .into_iter()
    .map(|(symbol, company)| WatchedSymbol::new(symbol, Some(company)))
    .collect()
}

fn default_history_days() -> usize {
    250
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_provider_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// WatchedSymbol
// =============================================================================

/// A ticker on the dashboard plus an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedSymbol {
    #[serde(deserialize_with = "normalised_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub company: Option<String>,
}

impl WatchedSymbol {
    pub fn new(symbol: &str, company: Option<&str>) -> Self {
        Self {
            symbol: normalise(symbol),
            company: company.map(str::to_string),
        }
    }
}

fn normalise(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn normalised_symbol<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalise(&raw))
}

// =============================================================================
// Persistence policy
// =============================================================================

/// Where the startup configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from the config file.
    File,
    /// No file yet; defaults in use.
    Missing,
    /// A file exists but could not be read or parsed; defaults in use.
    Unreadable,
}

/// Decides what, if anything, is written back to the config file on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownPersistence {
    origin: ConfigOrigin,
    /// Watch list as it was before an environment override replaced it.
    file_symbols: Option<Vec<WatchedSymbol>>,
}

impl ShutdownPersistence {
    pub fn new(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            file_symbols: None,
        }
    }

    /// Record the file-backed watch list before a run-only override.
    pub fn remember_file_symbols(&mut self, config: &RuntimeConfig) {
        if self.file_symbols.is_none() {
            self.file_symbols = Some(config.symbols.clone());
        }
    }

    /// The configuration to save, or `None` when the file must be left alone.
    pub fn to_save(&self, live: &RuntimeConfig) -> Option<RuntimeConfig> {
        if self.origin == ConfigOrigin::Unreadable {
            return None;
        }
        let mut config = live.clone();
        if let Some(symbols) = &self.file_symbols {
            config.symbols = symbols.clone();
        }
        Some(config)
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols shown on the dashboard, in display order.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<WatchedSymbol>,

    /// Trading days of history requested per symbol. Must cover the slow
    /// moving average.
    #[serde(default = "default_history_days")]
    pub history_days: usize,

    /// Moving-average windows and crossover lookback.
    #[serde(default)]
    pub crossover: CrossoverParams,

    /// Re-run the refresh cycle periodically.
    #[serde(default)]
    pub auto_refresh: bool,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            history_days: default_history_days(),
            crossover: CrossoverParams::default(),
            auto_refresh: false,
            refresh_interval_secs: default_refresh_interval_secs(),
            provider_base_url: default_provider_base_url(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = config.symbols.len(),
            auto_refresh = config.auto_refresh,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Load `path`, falling back to defaults. The returned origin tells a
    /// missing file apart from a broken one.
    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, ConfigOrigin) {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no runtime config file; using defaults");
            return (Self::default(), ConfigOrigin::Missing);
        }
        match Self::load(path) {
            Ok(config) => (config, ConfigOrigin::File),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "runtime config unreadable; using defaults and leaving the file untouched"
                );
                (Self::default(), ConfigOrigin::Unreadable)
            }
        }
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Replace the watch list from a comma-separated override such as
    /// `MONITOR_SYMBOLS=AAPL,msft`. Known symbols keep their company names.
    pub fn apply_symbol_override(&mut self, list: &str) {
        let symbols: Vec<WatchedSymbol> = list
            .split(',')
            .map(normalise)
            .filter(|s| !s.is_empty())
            .map(|symbol| {
                self.symbols
                    .iter()
                    .chain(default_symbols().iter())
                    .find(|w| w.symbol == symbol)
                    .cloned()
                    .unwrap_or_else(|| WatchedSymbol::new(&symbol, None))
            })
            .collect();

        if !symbols.is_empty() {
            self.symbols = symbols;
        }
    }

    /// Reject configurations the refresh cycle cannot honour.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let invalid = |msg: String| Err(MonitorError::InvalidConfig(msg));
        let CrossoverParams {
            fast_period,
            slow_period,
            lookback_days,
        } = self.crossover;

        if self.symbols.is_empty() {
            return invalid("symbol list is empty".into());
        }
        if let Some(dup) = self
            .symbols
            .iter()
            .enumerate()
            .find(|(i, w)| {
                self.symbols[..*i]
                    .iter()
                    .any(|o| o.symbol.eq_ignore_ascii_case(&w.symbol))
            })
        {
            return invalid(format!("duplicate symbol {}", dup.1.symbol));
        }
        if fast_period == 0 || fast_period >= slow_period {
            return invalid(format!(
                "fast period ({fast_period}) must be positive and shorter than slow period ({slow_period})"
            ));
        }
        if lookback_days == 0 {
            return invalid("lookback_days must be positive".into());
        }
        if self.history_days < slow_period {
            return invalid(format!(
                "history_days ({}) must cover the slow period ({slow_period})",
                self.history_days
            ));
        }
        if self.refresh_interval_secs < MIN_REFRESH_INTERVAL_SECS {
            return invalid(format!(
                "refresh_interval_secs must be at least {MIN_REFRESH_INTERVAL_SECS}"
            ));
        }
        Ok(())
    }
}
