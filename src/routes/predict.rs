use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::PredictionBundle;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_prediction))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    /// Ticker symbol (default: AAPL)
    stock: Option<String>,

    /// Trading days ahead, 1-90 (default: 1). Kept as text so a
    /// malformed value is reported like any other validation error.
    days_ahead: Option<String>,
}

fn parse_days_ahead(raw: Option<&str>) -> Result<i64, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| AppError::Validation(format!("Invalid days_ahead '{}': must be an integer", value))),
    }
}

/// Forecast a stock's close `days_ahead` trading days out.
///
/// # Example
/// ```text
/// GET /api/predict?stock=AAPL&days_ahead=3
/// ```
pub async fn get_prediction(
    Query(query): Query<PredictQuery>,
    State(state): State<AppState>,
) -> Result<Json<PredictionBundle>, AppError> {
    let stock = query.stock.unwrap_or_else(|| "AAPL".to_string());
    let days_ahead = parse_days_ahead(query.days_ahead.as_deref())?;
    info!("GET /api/predict - {} +{}d", stock, days_ahead);

    let bundle = state.predictions.forecast(&stock, days_ahead).await.map_err(|e| {
        error!("Prediction failed for {} +{}d: {}", stock, days_ahead, e);
        e
    })?;

    Ok(Json(bundle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days_ahead() {
        assert_eq!(parse_days_ahead(None).unwrap(), 1);
        assert_eq!(parse_days_ahead(Some(" ")).unwrap(), 1);
        assert_eq!(parse_days_ahead(Some("30")).unwrap(), 30);
        assert_eq!(parse_days_ahead(Some("-4")).unwrap(), -4);
        assert!(matches!(parse_days_ahead(Some("ten")), Err(AppError::Validation(_))));
    }
}
