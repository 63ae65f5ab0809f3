use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

/// Errors that are visible to callers of the prediction pipeline.
///
/// Modelling failures never show up here: they are absorbed by the fallback
/// ladders and only leave a trace in `PredictionResult::method`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    DataUnavailable(String),
    #[error("External error: {0}")]
    External(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DataUnavailable(_) => StatusCode::NOT_FOUND,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        match value {
            PriceProviderError::NotFound(msg) => AppError::DataUnavailable(msg),
            other => AppError::External(other.to_string()),
        }
    }
}

/// Internal failure of a single forecasting rung.
///
/// Each rung of a forecaster returns `Result<_, ModelFailure>` so the next rung
/// can be tried with `or_else`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelFailure {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("degenerate series: {0}")]
    Degenerate(String),
    #[error("model fit failed: {0}")]
    FitFailed(String),
    #[error("forecast failed: {0}")]
    ForecastFailed(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
