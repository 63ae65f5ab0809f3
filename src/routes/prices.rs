use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{HistoryPeriod, PriceHistory};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:ticker", get(get_prices))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// One of 1mo, 3mo, 6mo, 1y (default: 1mo)
    period: Option<String>,
}

pub async fn get_prices(
    Path(ticker): Path<String>,
    Query(query): Query<PriceQuery>,
    State(state): State<AppState>,
) -> Result<Json<PriceHistory>, AppError> {
    let period = match query.period.as_deref() {
        None => HistoryPeriod::OneMonth,
        Some(raw) => HistoryPeriod::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Invalid period '{}'. Must be one of 1mo, 3mo, 6mo, 1y", raw))
        })?,
    };
    info!("GET /api/prices/{} - Getting {} price history", ticker, period);

    let history = state.predictions.price_history(&ticker, period).await.map_err(|e| {
        match &e {
            AppError::External(_) => warn!("Provider error for {}: {}", ticker, e),
            _ => error!("Failed to get price history for {}: {}", ticker, e),
        }
        e
    })?;

    Ok(Json(history))
}
