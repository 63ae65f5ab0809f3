use std::sync::Arc;
use chrono::{DateTime, Utc, Duration};
use dashmap::DashMap;

use crate::external::price_provider::PriceProviderError;

/// A recent provider failure for a symbol
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub error_type: FailureType,
    pub ttl_hours: i64,
    pub message: String,
}

impl FailureInfo {
    pub fn retry_after(&self) -> DateTime<Utc> {
        self.failed_at + Duration::hours(self.ttl_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureType {
    NotFound,       // Symbol doesn't exist at the provider
    RateLimited,    // Temporary rate limit
    ApiError,       // Other provider errors
}

impl FailureType {
    pub fn ttl_hours(&self) -> i64 {
        match self {
            FailureType::NotFound => 24,
            FailureType::RateLimited => 1,
            FailureType::ApiError => 6,
        }
    }
}

impl From<&PriceProviderError> for FailureType {
    fn from(err: &PriceProviderError) -> Self {
        match err {
            PriceProviderError::NotFound(_) => FailureType::NotFound,
            PriceProviderError::RateLimited => FailureType::RateLimited,
            _ => FailureType::ApiError,
        }
    }
}

/// Thread-safe cache of symbols whose history fetch recently failed.
/// Prevents hammering the provider for symbols we know will fail.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded failure for `symbol`, if it is still within its TTL
    pub fn is_failed(&self, symbol: &str) -> Option<FailureInfo> {
        self.is_failed_at(symbol, Utc::now())
    }

    fn is_failed_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<FailureInfo> {
        let entry = self.cache.get(symbol)?;
        let info = entry.value().clone();

        if now < info.retry_after() {
            return Some(info);
        }

        // TTL expired
        drop(entry); // Release the read lock
        self.cache.remove(symbol);
        None
    }

    pub fn record_failure(&self, symbol: &str, err: &PriceProviderError) {
        self.record_failure_at(symbol, err, Utc::now());
    }

    fn record_failure_at(&self, symbol: &str, err: &PriceProviderError, failed_at: DateTime<Utc>) {
        let error_type = FailureType::from(err);
        let info = FailureInfo {
            failed_at,
            error_type,
            ttl_hours: error_type.ttl_hours(),
            message: err.to_string(),
        };

        self.cache.insert(symbol.to_string(), info);
    }

    /// Forget a symbol (e.g., after a successful fetch)
    pub fn clear(&self, symbol: &str) {
        self.cache.remove(symbol);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
