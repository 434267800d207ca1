// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Every view is built per request from
// the latest published snapshot; until the first refresh cycle completes the
// views answer 503.
//
// CORS is configured permissively so a browser dashboard served from another
// origin can read the API.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::dashboard::{
    build_detail, build_golden_cross, build_summary, DetailView, GoldenCrossView, SortColumn,
    SummaryView,
};
use crate::refresh::{CycleSummary, DashboardSnapshot};
use crate::types::SortOrder;

type ApiError = (StatusCode, Json<serde_json::Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        // ── Views ───────────────────────────────────────────────────
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/symbols/:symbol", get(symbol_detail))
        .route("/api/v1/golden-cross", get(golden_cross))
        .route("/api/v1/errors", get(recent_errors))
        // ── Control ─────────────────────────────────────────────────
        .route("/api/v1/refresh", post(refresh_now))
        .route("/api/v1/config", get(config))
        .route("/api/v1/control/auto-refresh", post(control_auto_refresh))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn require_snapshot(state: &AppState) -> Result<Arc<DashboardSnapshot>, ApiError> {
    state.latest_snapshot().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": "No data yet: the first refresh cycle has not completed",
            })),
        )
    })
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    last_refresh: Option<chrono::DateTime<chrono::Utc>>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        last_refresh: state.latest_snapshot().map(|s| s.refreshed_at),
    };
    Json(resp)
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    sort: Option<SortColumn>,
    #[serde(default)]
    order: Option<SortOrder>,
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryView>, ApiError> {
    let snapshot = require_snapshot(&state)?;
    let view = build_summary(
        &snapshot,
        query.sort.unwrap_or_default(),
        query.order.unwrap_or_default(),
    );
    Ok(Json(view))
}

async fn symbol_detail(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<DetailView>, ApiError> {
    let snapshot = require_snapshot(&state)?;
    let report = snapshot.report(&symbol).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("Symbol '{}' is not on the watch list", symbol),
            })),
        )
    })?;

    let params = state.runtime_config.read().crossover;
    Ok(Json(build_detail(report, &params)))
}

async fn golden_cross(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GoldenCrossView>, ApiError> {
    let snapshot = require_snapshot(&state)?;
    Ok(Json(build_golden_cross(&snapshot)))
}

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// Control
// =============================================================================

async fn refresh_now(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Refresh requested via API");
    let snapshot = state.run_refresh().await;
    Json(CycleSummary::from(snapshot.as_ref()))
}

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read().clone();
    Json(config)
}

#[derive(Deserialize)]
struct AutoRefreshRequest {
    enabled: bool,
}

#[derive(Serialize)]
struct AutoRefreshResponse {
    auto_refresh: bool,
    previous: bool,
    refresh_interval_secs: u64,
}

async fn control_auto_refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutoRefreshRequest>,
) -> impl IntoResponse {
    let previous = state.set_auto_refresh(req.enabled);
    let refresh_interval_secs = state.runtime_config.read().refresh_interval_secs;

    Json(AutoRefreshResponse {
        auto_refresh: req.enabled,
        previous,
        refresh_interval_secs,
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::tests::{config_for, fixture_provider};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            config_for(&["AAPL", "MSFT", "TSLA"]),
            Arc::new(fixture_provider()),
        ))
    }

    async fn call(
        state: Arc<AppState>,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_is_always_available() {
        let (status, body) = call(app_state(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["last_refresh"].is_null());
    }

    #[tokio::test]
    async fn views_wait_for_first_refresh() {
        let (status, body) = call(app_state(), Method::GET, "/api/v1/summary", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("No data yet"));
    }

    #[tokio::test]
    async fn refresh_then_summary_sorted() {
        let state = app_state();

        let (status, body) = call(state.clone(), Method::POST, "/api/v1/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbols"], 3);
        assert_eq!(body["ready"], 2);
        assert_eq!(body["no_data"][0], "TSLA");

        let (status, body) = call(
            state,
            Method::GET,
            "/api/v1/summary?sort=price&order=desc",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows[0]["symbol"], "MSFT");
        assert_eq!(rows[1]["symbol"], "AAPL");
        assert_eq!(rows[2]["symbol"], "TSLA");
        assert_eq!(rows[2]["has_data"], false);
        assert_eq!(rows[1]["golden_cross"], true);
        assert_eq!(rows[0]["ma_200d"]["display"], "N/A");
    }

    #[tokio::test]
    async fn unknown_sort_column_is_rejected() {
        let state = app_state();
        state.run_refresh().await;
        let (status, _) = call(state, Method::GET, "/api/v1/summary?sort=bogus", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn symbol_detail_and_not_found() {
        let state = app_state();
        state.run_refresh().await;

        let (status, body) = call(state.clone(), Method::GET, "/api/v1/symbols/aapl", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["chart"].as_array().unwrap().len(), 230);
        assert_eq!(body["crossover_price"]["display"], "$101.00");

        let (status, _) = call(state, Method::GET, "/api/v1/symbols/ZZZZ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn golden_cross_view_lists_flagged() {
        let state = app_state();
        state.run_refresh().await;

        let (status, body) = call(state, Method::GET, "/api/v1/golden-cross", None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["symbol"], "AAPL");
        assert_eq!(entries[0]["sessions_since"], 10);
    }

    #[tokio::test]
    async fn errors_endpoint_reports_failed_symbols() {
        let state = app_state();
        state.run_refresh().await;

        let (status, body) = call(state, Method::GET, "/api/v1/errors", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["symbol"], "TSLA");
    }

    #[tokio::test]
    async fn auto_refresh_toggle() {
        let state = app_state();
        let (status, body) = call(
            state.clone(),
            Method::POST,
            "/api/v1/control/auto-refresh",
            Some(r#"{"enabled": true}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["auto_refresh"], true);
        assert_eq!(body["previous"], false);

        let (_, config) = call(state, Method::GET, "/api/v1/config", None).await;
        assert_eq!(config["auto_refresh"], true);
    }
}
