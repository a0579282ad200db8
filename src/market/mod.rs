//! Market-data provider client
//!
//! One HTTP client covers all structured lookups (ticker, sector,
//! industry, market summary) plus news search. Field shapes are
//! provider-defined and passed through largely unmodified. No retries,
//! no rate limiting; failures are absorbed at the orchestrator boundary.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Articles fetched per news search term.
pub const NEWS_COUNT: usize = 10;

/// Seam for the market-data provider; mockable in tests.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_ticker(&self, symbol: &str) -> Result<Map<String, Value>, FetchError>;
    async fn fetch_sector(&self, sector: &str) -> Result<Map<String, Value>, FetchError>;
    async fn fetch_industry(&self, industry: &str) -> Result<Map<String, Value>, FetchError>;
    async fn fetch_market_summary(&self, region: &str) -> Result<Map<String, Value>, FetchError>;
    async fn fetch_news(&self, term: &str, count: usize) -> Result<Vec<Value>, FetchError>;
}

/// Yahoo Finance REST client (no credential required)
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; finance-assistant)")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Honors `MARKET_DATA_BASE_URL` for endpoint overrides.
    pub fn from_env() -> Self {
        match std::env::var("MARKET_DATA_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::new(),
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        debug!(path, "Market data request");

        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the top-level object out of a provider payload.
fn as_object(value: Value, what: &str) -> Result<Map<String, Value>, FetchError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FetchError::Payload(format!(
            "{} response was not an object: {}",
            what, other
        ))),
    }
}

#[async_trait]
impl MarketData for YahooFinanceClient {
    async fn fetch_ticker(&self, symbol: &str) -> Result<Map<String, Value>, FetchError> {
        let path = format!("/v8/finance/chart/{}", symbol);
        let body = self
            .get_json(&path, &[("range", "1d"), ("interval", "1m")])
            .await?;

        let result = body
            .pointer("/chart/result/0")
            .cloned()
            .ok_or_else(|| FetchError::Payload(format!("no chart result for {}", symbol)))?;

        let info = result.get("meta").cloned().unwrap_or(Value::Null);
        let latest_price = info.get("regularMarketPrice").cloned().unwrap_or(Value::Null);
        let history = result.get("indicators").cloned().unwrap_or(Value::Null);

        let mut fields = Map::new();
        fields.insert("info".to_string(), info);
        fields.insert("latest_price".to_string(), latest_price);
        fields.insert("history".to_string(), history);
        Ok(fields)
    }

    async fn fetch_sector(&self, sector: &str) -> Result<Map<String, Value>, FetchError> {
        let path = format!("/v1/finance/sectors/{}", sector);
        as_object(self.get_json(&path, &[]).await?, "sector")
    }

    async fn fetch_industry(&self, industry: &str) -> Result<Map<String, Value>, FetchError> {
        let path = format!("/v1/finance/industries/{}", industry);
        as_object(self.get_json(&path, &[]).await?, "industry")
    }

    async fn fetch_market_summary(&self, region: &str) -> Result<Map<String, Value>, FetchError> {
        let body = self
            .get_json("/v6/finance/quote/marketSummary", &[("region", region)])
            .await?;

        let summary = body
            .pointer("/marketSummaryResponse/result")
            .cloned()
            .unwrap_or(Value::Null);

        let mut fields = Map::new();
        fields.insert("summary".to_string(), summary);
        Ok(fields)
    }

    async fn fetch_news(&self, term: &str, count: usize) -> Result<Vec<Value>, FetchError> {
        let count = count.to_string();
        let body = self
            .get_json(
                "/v1/finance/search",
                &[("q", term), ("newsCount", &count), ("quotesCount", "0")],
            )
            .await?;

        Ok(body
            .get("news")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}
