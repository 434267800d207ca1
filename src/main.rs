// =============================================================================
// Tech Stock Monitor — Main Entry Point
// =============================================================================
//
// Fetches daily history and fundamentals for a watch list of equities,
// computes change, 50/200-day moving averages and the golden-cross signal,
// and serves the results as JSON view models for a browser dashboard.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod dashboard;
mod error;
mod indicators;
mod market_data;
mod metrics;
mod provider;
mod refresh;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::YahooClient;
use crate::refresh::CycleSummary;
use crate::runtime_config::{RuntimeConfig, ShutdownPersistence};

const CONFIG_PATH: &str = "monitor_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tech Stock Monitor starting up");

    let (mut config, origin) = RuntimeConfig::load_or_default(CONFIG_PATH);
    let mut persistence = ShutdownPersistence::new(origin);

    if let Ok(syms) = std::env::var("MONITOR_SYMBOLS") {
        persistence.remember_file_symbols(&config);
        config.apply_symbol_override(&syms);
    }

    config.validate().context("refusing to start with invalid configuration")?;

    info!(
        symbols = ?config.symbols.iter().map(|w| w.symbol.as_str()).collect::<Vec<_>>(),
        history_days = config.history_days,
        lookback_days = config.crossover.lookback_days,
        auto_refresh = config.auto_refresh,
        "Watch list configured"
    );

    // ── 2. Provider & shared state ───────────────────────────────────────
    let provider = Arc::new(YahooClient::new(config.provider_base_url.clone())?);
    let state = Arc::new(AppState::new(config, provider));

    // ── 3. Initial refresh ───────────────────────────────────────────────
    let snapshot = state.run_refresh().await;
    let summary = CycleSummary::from(snapshot.as_ref());
    if !summary.no_data.is_empty() {
        warn!(symbols = ?summary.no_data, "Some symbols have no data this cycle");
    }

    // ── 4. Auto-refresh loop ─────────────────────────────────────────────
    tokio::spawn(state.clone().auto_refresh_loop());

    // ── 5. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("MONITOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        warn!("Shutdown signal received — stopping gracefully");
    });

    if let Err(e) = server.await {
        error!(error = %e, "API server failed");
    }

    // ── 6. Shutdown ──────────────────────────────────────────────────────
    let to_save = persistence.to_save(&state.runtime_config.read());
    match to_save {
        Some(config) => {
            if let Err(e) = config.save(CONFIG_PATH) {
                error!(error = %e, "Failed to save runtime config on shutdown");
            }
        }
        None => warn!("Config file was unreadable at startup; not overwriting it"),
    }

    info!("Tech Stock Monitor shut down complete.");
    Ok(())
}
