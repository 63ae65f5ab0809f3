use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::{HistoryPeriod, PricePoint};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use url::Url;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        // Yahoo rejects requests without a browser-like user agent
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; predictify/0.1)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Pair timestamps with closes, dropping missing closes; result is oldest first.
fn points_from_chart(symbol: &str, body: YahooChartResponse) -> Result<Vec<PricePoint>, PriceProviderError> {
    if let Some(error) = body.chart.error.filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown symbol");
        return Err(PriceProviderError::NotFound(format!(
            "No price data for {}: {}",
            symbol, description
        )));
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| PriceProviderError::NotFound(format!("No price data for {}", symbol)))?;

    // timestamp aligns with close list by index
    let closes = &result
        .indicators
        .quote
        .first()
        .ok_or_else(|| PriceProviderError::BadResponse("missing quote".into()))?
        .close;

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else { continue };

        let date = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| PriceProviderError::Parse("bad timestamp".into()))?
            .date_naive();

        out.push(PricePoint::new(date, close));
    }

    out.sort_by_key(|p| p.date);

    if out.is_empty() {
        return Err(PriceProviderError::NotFound(format!("No price data for {}", symbol)));
    }
    Ok(out)
}

/// Chart endpoint for `symbol`; the symbol is percent-encoded as one path segment.
fn chart_url(base_url: &str, symbol: &str, period: HistoryPeriod) -> Result<Url, PriceProviderError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| PriceProviderError::BadResponse(format!("invalid chart URL {}: {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| PriceProviderError::BadResponse(format!("chart URL {} cannot take a path", base_url)))?
        .push(symbol);
    url.query_pairs_mut()
        .append_pair("range", period.as_str())
        .append_pair("interval", "1d");

    Ok(url)
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        let url = chart_url(&self.base_url, symbol, period)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => {
                return Err(PriceProviderError::NotFound(format!("No price data for {}", symbol)))
            }
            status if !status.is_success() => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {}", status)))
            }
            _ => {}
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        points_from_chart(symbol, body)
    }
}
