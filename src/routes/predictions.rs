use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::models::PredictionRecord;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_predictions))
}

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    /// Restrict to one symbol
    stock: Option<String>,

    /// Maximum number of records (default: 20, capped at 100)
    limit: Option<usize>,
}

/// Recently issued predictions, newest first.
pub async fn list_predictions(
    Query(query): Query<PredictionsQuery>,
    State(state): State<AppState>,
) -> Json<Vec<PredictionRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let stock = query.stock.as_deref().filter(|s| !s.trim().is_empty());
    info!("GET /api/predictions - stock={:?} limit={}", stock, limit);

    Json(state.predictions.recent_predictions(stock, limit))
}
