// =============================================================================
// Yahoo Finance REST client — daily history and quote summary
// =============================================================================
//
// History comes from the v8 chart endpoint (`interval=1d`), fundamentals from
// the v10 quoteSummary endpoint. Bars whose close is null (halts, provider
// gaps) are dropped rather than zero-filled so they cannot drag the moving
// averages down.
//
// quoteSummary only answers requests carrying a session cookie plus the
// matching crumb. The client keeps a cookie jar, obtains the crumb lazily on
// the first metadata call and re-negotiates it once when Yahoo answers 401.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::DateTime;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::market_data::{PriceBar, PriceSeries, SymbolMetadata};
use crate::provider::MarketDataProvider;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Visiting this host sets the session cookie the crumb is bound to.
const SESSION_COOKIE_URL: &str = "https://fc.yahoo.com";

const QUOTE_SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics";

/// Yahoo Finance client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    crumb: Arc<RwLock<Option<String>>>,
    /// Serialises crumb negotiation so concurrent symbols share one session.
    session_lock: Arc<tokio::sync::Mutex<()>>,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        // Yahoo rejects requests without a browser-like agent.
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) tech-stock-monitor"),
        );

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self {
            base_url,
            client,
            crumb: Arc::new(RwLock::new(None)),
            session_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    // -------------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol}
    #[instrument(skip(self), name = "yahoo::history")]
    pub async fn history(&self, symbol: &str, days: usize) -> Result<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}d&interval=1d",
            self.base_url, symbol, days
        );
        let body: ChartEnvelope = self.get_json(&url).await?;
        let series = chart_to_series(symbol, body)?.tail(days);
        debug!(symbol, bars = series.len(), "history retrieved");
        Ok(series)
    }

    /// GET /v10/finance/quoteSummary/{symbol}?modules=..&crumb=..
    #[instrument(skip(self), name = "yahoo::metadata")]
    pub async fn metadata(&self, symbol: &str) -> Result<SymbolMetadata> {
        let crumb = self.crumb(false).await?;
        let mut url = self.quote_summary_url(symbol, &crumb)?;
        let mut resp = self.send(url.as_str()).await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(symbol, "crumb rejected; renegotiating Yahoo session");
            let crumb = self.crumb(true).await?;
            url = self.quote_summary_url(symbol, &crumb)?;
            resp = self.send(url.as_str()).await?;
        }

        let body: QuoteSummaryEnvelope = decode_json(url.as_str(), resp).await?;
        summary_to_metadata(symbol, body)
    }

    fn quote_summary_url(&self, symbol: &str, crumb: &str) -> Result<Url> {
        let endpoint = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        Url::parse_with_params(
            &endpoint,
            &[("modules", QUOTE_SUMMARY_MODULES), ("crumb", crumb)],
        )
        .with_context(|| format!("invalid quoteSummary URL for {symbol}"))
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// The cached crumb, negotiating a new session when there is none or
    /// when `renew` is set.
    async fn crumb(&self, renew: bool) -> Result<String> {
        let seen = self.crumb.read().clone();
        if let (Some(crumb), false) = (&seen, renew) {
            return Ok(crumb.clone());
        }

        let _guard = self.session_lock.lock().await;

        // Another task may have negotiated while we waited on the lock.
        let current = self.crumb.read().clone();
        if let Some(crumb) = current.filter(|c| Some(c) != seen.as_ref()) {
            return Ok(crumb);
        }

        // The cookie host answers 404 but still sets the cookie.
        if let Err(e) = self.client.get(SESSION_COOKIE_URL).send().await {
            debug!(error = %e, "session cookie request failed; trying crumb anyway");
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let resp = self.send(&url).await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read crumb from {url}"))?;
        let crumb = parse_crumb(status, &body)?;

        info!("Yahoo session established");
        *self.crumb.write() = Some(crumb.clone());
        Ok(crumb)
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    async fn send(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.send(url).await?;
        decode_json(url, resp).await
    }
}

async fn decode_json<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Yahoo GET {} returned {}: {}", url, status, body);
    }

    resp.json()
        .await
        .with_context(|| format!("failed to parse response from {url}"))
}

/// A crumb is a short opaque token; anything else (an HTML consent page, an
/// error body) means the session was not established.
fn parse_crumb(status: StatusCode, body: &str) -> Result<String> {
    let crumb = body.trim();
    if !status.is_success() {
        anyhow::bail!("Yahoo crumb request returned {}: {}", status, crumb);
    }
    if crumb.is_empty() || crumb.contains('<') || crumb.contains(char::is_whitespace) {
        anyhow::bail!("Yahoo crumb response was not a crumb");
    }
    Ok(crumb.to_string())
}

impl MarketDataProvider for YahooClient {
    fn fetch_history<'a>(&'a self, symbol: &'a str, days: usize) -> BoxFuture<'a, Result<PriceSeries>> {
        self.history(symbol, days).boxed()
    }

    fn fetch_metadata<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<SymbolMetadata>> {
        self.metadata(symbol).boxed()
    }
}

// =============================================================================
// Chart schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn chart_to_series(symbol: &str, envelope: ChartEnvelope) -> Result<PriceSeries> {
    if let Some(err) = envelope.chart.error {
        anyhow::bail!("Yahoo chart error for {}: {} ({})", symbol, err.description, err.code);
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        warn!(symbol, "chart response carried no result; treating as empty history");
        return Ok(PriceSeries::new(symbol, Vec::new()));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = at(&quote.close, i) else {
            continue;
        };
        let Some(dt) = DateTime::from_timestamp(ts, 0) else {
            warn!(symbol, ts, "skipping bar with out-of-range timestamp");
            continue;
        };
        bars.push(PriceBar {
            date: dt.date_naive(),
            open: at(&quote.open, i).unwrap_or(close),
            high: at(&quote.high, i).unwrap_or(close),
            low: at(&quote.low, i).unwrap_or(close),
            close,
            volume: at(&quote.volume, i).unwrap_or(0.0).max(0.0),
        });
    }

    Ok(PriceSeries::new(symbol, bars))
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

// =============================================================================
// Quote summary schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: PriceModule,
    #[serde(default)]
    summary_detail: SummaryDetail,
    #[serde(default)]
    default_key_statistics: KeyStatistics,
}

/// Yahoo wraps numbers as `{ "raw": 1.5, "fmt": "1.50" }`; missing values
/// arrive as `{}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(v: Option<RawValue>) -> Option<f64> {
    v.and_then(|v| v.raw).filter(|x| x.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_previous_close: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    market_cap: Option<RawValue>,
    previous_close: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    trailing_eps: Option<RawValue>,
    peg_ratio: Option<RawValue>,
    price_to_book: Option<RawValue>,
    short_percent_of_float: Option<RawValue>,
}

fn summary_to_metadata(symbol: &str, envelope: QuoteSummaryEnvelope) -> Result<SymbolMetadata> {
    if let Some(err) = envelope.quote_summary.error {
        anyhow::bail!("Yahoo quoteSummary error for {}: {} ({})", symbol, err.description, err.code);
    }

    let result = envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .with_context(|| format!("quoteSummary for {symbol} carried no result"))?;

    let QuoteSummaryResult {
        price,
        summary_detail,
        default_key_statistics,
    } = result;

    let previous_close = raw(summary_detail.previous_close).or(raw(price.regular_market_previous_close));

    Ok(SymbolMetadata {
        long_name: price.long_name.or(price.short_name),
        trailing_pe: raw(summary_detail.trailing_pe),
        forward_pe: raw(summary_detail.forward_pe),
        eps: raw(default_key_statistics.trailing_eps),
        peg_ratio: raw(default_key_statistics.peg_ratio),
        price_to_book: raw(default_key_statistics.price_to_book),
        short_percent_float: raw(default_key_statistics.short_percent_of_float),
        market_cap: raw(summary_detail.market_cap),
        previous_close,
    })
}
