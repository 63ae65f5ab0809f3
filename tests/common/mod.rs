#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use predictify::errors::AppError;
use predictify::external::price_provider::{PriceProvider, PriceProviderError};
use predictify::models::{Headline, HistoryPeriod, PricePoint};
use predictify::services::failure_cache::FailureCache;
use predictify::services::news_service::NewsProvider;
use predictify::services::prediction_service::PredictionService;
use predictify::services::prediction_store::InMemoryPredictionStore;
use predictify::services::short_horizon_service::ShortHorizonConfig;

/// Serves the same closes for every symbol and period, counting calls.
pub struct FixedPriceProvider {
    closes: Vec<f64>,
    pub calls: AtomicUsize,
}

impl FixedPriceProvider {
    pub fn new(closes: Vec<f64>) -> Self {
        Self {
            closes,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for FixedPriceProvider {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        _period: HistoryPeriod,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.closes.is_empty() {
            return Err(PriceProviderError::NotFound(format!("No price data for {}", symbol)));
        }

        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        Ok(self
            .closes
            .iter()
            .enumerate()
            .map(|(i, price)| PricePoint::new(start + Duration::days(i as i64), *price))
            .collect())
    }
}

/// Always fails at the transport level.
pub struct BrokenPriceProvider;

#[async_trait]
impl PriceProvider for BrokenPriceProvider {
    async fn fetch_daily_history(
        &self,
        _symbol: &str,
        _period: HistoryPeriod,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        Err(PriceProviderError::Network("connection refused".to_string()))
    }
}

pub struct FixedNewsProvider(pub Vec<&'static str>);

#[async_trait]
impl NewsProvider for FixedNewsProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<Headline>, AppError> {
        Ok(self.0.iter().map(|t| Headline::new(t.to_string(), "test")).collect())
    }
}

pub struct BrokenNewsProvider;

#[async_trait]
impl NewsProvider for BrokenNewsProvider {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<Headline>, AppError> {
        Err(AppError::External("news search unavailable".to_string()))
    }
}

pub fn fast_short_horizon() -> ShortHorizonConfig {
    ShortHorizonConfig {
        time_budget: std::time::Duration::from_secs(2),
        ..ShortHorizonConfig::default()
    }
}

pub fn service_with(
    prices: Arc<dyn PriceProvider>,
    news: Arc<dyn NewsProvider>,
) -> (PredictionService, Arc<InMemoryPredictionStore>) {
    let store = Arc::new(InMemoryPredictionStore::new());
    let service = PredictionService::new(prices, news, store.clone(), FailureCache::new(), fast_short_horizon());
    (service, store)
}

/// Gently trending series with a weekly wobble.
pub fn trending_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + i as f64 * 0.15 + (i as f64 * 0.9).sin() * 1.5)
        .collect()
}
