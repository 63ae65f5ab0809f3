use tracing::{error, info};

use crate::errors::AppError;
use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::{CurrentPriceSnapshot, HistoryPeriod, PricePoint};
use crate::services::failure_cache::{FailureCache, FailureInfo, FailureType};

fn cached_failure_error(symbol: &str, failure: &FailureInfo) -> AppError {
    let message = format!(
        "Symbol {} recently failed ({}). Will retry after {}",
        symbol,
        failure.message,
        failure.retry_after().format("%Y-%m-%d %H:%M UTC")
    );

    match failure.error_type {
        FailureType::NotFound => AppError::DataUnavailable(message),
        _ => AppError::External(message),
    }
}

/// Skip the provider for symbols that failed recently.
fn check_failure_cache(failure_cache: &FailureCache, symbol: &str) -> Result<(), AppError> {
    match failure_cache.is_failed(symbol) {
        Some(failure) => {
            info!("Skipping provider call for {} - symbol is in failure cache", symbol);
            Err(cached_failure_error(symbol, &failure))
        }
        None => Ok(()),
    }
}

fn record_outcome<T>(
    failure_cache: &FailureCache,
    symbol: &str,
    outcome: Result<T, PriceProviderError>,
) -> Result<T, AppError> {
    match outcome {
        Ok(value) => {
            failure_cache.clear(symbol);
            Ok(value)
        }
        Err(e) => {
            error!("Failed to fetch price data for {}: {}", symbol, e);
            failure_cache.record_failure(symbol, &e);
            Err(AppError::from(e))
        }
    }
}

/// Daily history for `symbol`, oldest first, restricted to usable closes.
pub async fn fetch_history(
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    symbol: &str,
    period: HistoryPeriod,
) -> Result<Vec<PricePoint>, AppError> {
    check_failure_cache(failure_cache, symbol)?;

    let outcome = provider.fetch_daily_history(symbol, period).await;
    let points = record_outcome(failure_cache, symbol, outcome)?;

    let usable: Vec<PricePoint> = points.into_iter().filter(PricePoint::is_usable).collect();
    info!("Fetched {} usable closes for {} ({})", usable.len(), symbol, period);
    Ok(usable)
}

pub async fn fetch_snapshot(
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    symbol: &str,
) -> Result<CurrentPriceSnapshot, AppError> {
    check_failure_cache(failure_cache, symbol)?;

    let outcome = provider.fetch_current_snapshot(symbol).await;
    record_outcome(failure_cache, symbol, outcome)
}

pub fn closes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.price).collect()
}
