use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CurrentPriceSnapshot, HistoryPeriod, PricePoint};

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("{0}")]
    NotFound(String),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily closes for `symbol`, oldest first.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<PricePoint>, PriceProviderError>;

    /// Latest close and its move from the previous close.
    async fn fetch_current_snapshot(&self, symbol: &str) -> Result<CurrentPriceSnapshot, PriceProviderError> {
        let history = self.fetch_daily_history(symbol, HistoryPeriod::OneMonth).await?;
        let closes: Vec<f64> = history
            .iter()
            .filter(|p| p.is_usable())
            .map(|p| p.price)
            .collect();

        CurrentPriceSnapshot::from_closes(&closes)
            .ok_or_else(|| PriceProviderError::NotFound(format!("No current price for {}", symbol)))
    }
}
