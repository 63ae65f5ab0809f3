use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::Headline;

const SERPER_NEWS_URL: &str = "https://google.serper.dev/news";
const MAX_HEADLINES: usize = 10;

/// Configuration for the headline source
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: Option<String>,
}

impl NewsConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("NEWS_ENABLED")
                .ok()
                .and_then(|s| s.parse::<bool>().ok())
                .unwrap_or(false),
            provider: std::env::var("NEWS_PROVIDER").unwrap_or_else(|_| "serper".to_string()),
            api_key: std::env::var("NEWS_API_KEY").ok(),
        }
    }
}

/// Source of recent headlines about a symbol
#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, AppError>;
}

/// Canned headlines, one per sentiment bucket
pub struct MockHeadlineProvider;

#[async_trait]
impl NewsProvider for MockHeadlineProvider {
    fn name(&self) -> &'static str {
        "mock headlines"
    }

    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, AppError> {
        Ok(vec![
            Headline::new(format!("{} shows strong growth potential!", symbol), "mock"),
            Headline::new(format!("Mixed opinions on {} stock today.", symbol), "mock"),
            Headline::new(format!("Investors worry about Q3 earnings for {}", symbol), "mock"),
        ])
    }
}

/// Serper API provider (uses Google's news search)
pub struct SerperProvider {
    api_key: String,
    client: Client,
}

impl SerperProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    news: Option<Vec<SerperNewsItem>>,
}

#[derive(Debug, Deserialize)]
struct SerperNewsItem {
    title: String,
    #[serde(default)]
    source: String,
}

#[async_trait]
impl NewsProvider for SerperProvider {
    fn name(&self) -> &'static str {
        "Serper news"
    }

    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, AppError> {
        info!("Fetching headlines from Serper for {}", symbol);

        let request_body = serde_json::json!({
            "q": format!("{} stock news", symbol),
            "type": "news",
            "num": MAX_HEADLINES,
        });

        let response = self
            .client
            .post(SERPER_NEWS_URL)
            .header("X-API-KEY", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!("Serper API request failed: {}", e);
                AppError::External(format!("News API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Serper API error {}", status);
            return Err(AppError::External(format!("News API returned error {}", status)));
        }

        let serper_response: SerperResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Serper response: {}", e);
            AppError::External(format!("Failed to parse news response: {}", e))
        })?;

        let headlines: Vec<Headline> = serper_response
            .news
            .unwrap_or_default()
            .into_iter()
            .take(MAX_HEADLINES)
            .map(|item| Headline::new(item.title, item.source))
            .collect();

        info!("Fetched {} headlines from Serper", headlines.len());
        Ok(headlines)
    }
}

/// Pick the configured headline source, falling back to canned headlines.
pub fn build_news_provider(config: &NewsConfig) -> Arc<dyn NewsProvider> {
    if !config.enabled {
        info!("News provider disabled, using mock headlines");
        return Arc::new(MockHeadlineProvider);
    }

    match (config.provider.as_str(), &config.api_key) {
        ("serper", Some(api_key)) => {
            info!("Initializing Serper news provider");
            Arc::new(SerperProvider::new(api_key.clone()))
        }
        ("serper", None) => {
            warn!("News enabled but no API key provided, using mock headlines");
            Arc::new(MockHeadlineProvider)
        }
        (other, _) => {
            warn!("Unknown news provider: {}, using mock headlines", other);
            Arc::new(MockHeadlineProvider)
        }
    }
}
