use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::price_point::PricePoint;
use crate::models::sentiment::Sentiment;
use crate::models::trading::{TimelinePoint, TradingInfo};
use crate::models::volatility::VolatilityClass;

pub const MIN_DAYS_AHEAD: u32 = 1;
pub const MAX_DAYS_AHEAD: u32 = 90;
/// Horizons up to and including this many trading days use the time-series model.
pub const SHORT_HORIZON_MAX_DAYS: u32 = 7;

/// Validated prediction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub symbol: String,
    pub days_ahead: u32,
}

impl PredictionRequest {
    /// Normalize the symbol and reject horizons outside 1..=90.
    pub fn new(symbol: &str, days_ahead: i64) -> Result<Self, AppError> {
        if days_ahead < MIN_DAYS_AHEAD as i64 || days_ahead > MAX_DAYS_AHEAD as i64 {
            return Err(AppError::Validation(format!(
                "Days ahead must be between {} and {}",
                MIN_DAYS_AHEAD, MAX_DAYS_AHEAD
            )));
        }

        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AppError::Validation("Stock symbol is required".to_string()));
        }

        Ok(Self {
            symbol,
            days_ahead: days_ahead as u32,
        })
    }
}

/// Which forecaster handles a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastStrategy {
    ShortHorizon,
    LongHorizon,
}

impl ForecastStrategy {
    pub fn for_horizon(days_ahead: u32) -> Self {
        if days_ahead <= SHORT_HORIZON_MAX_DAYS {
            ForecastStrategy::ShortHorizon
        } else {
            ForecastStrategy::LongHorizon
        }
    }
}

/// Which rung of a forecasting ladder produced a prediction.
///
/// The serialized names are the tags reported to clients in `method_used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastMethod {
    #[serde(rename = "ARIMA_success")]
    ArimaSuccess,
    #[serde(rename = "ARIMA_minimal_data")]
    ArimaMinimalData,
    #[serde(rename = "ARIMA_fitted_trend")]
    ArimaFittedTrend,
    #[serde(rename = "statistical_fallback_after_arima_failed")]
    StatisticalFallback,
    #[serde(rename = "insufficient_data_fallback")]
    InsufficientDataFallback,
    #[serde(rename = "RandomForest")]
    RandomForest,
    #[serde(rename = "trend_fallback")]
    TrendFallback,
    #[serde(rename = "minimal_data_fallback")]
    MinimalDataFallback,
    #[serde(rename = "no_change_fallback")]
    NoChangeFallback,
    #[serde(rename = "emergency_fallback")]
    EmergencyFallback,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::ArimaSuccess => "ARIMA_success",
            ForecastMethod::ArimaMinimalData => "ARIMA_minimal_data",
            ForecastMethod::ArimaFittedTrend => "ARIMA_fitted_trend",
            ForecastMethod::StatisticalFallback => "statistical_fallback_after_arima_failed",
            ForecastMethod::InsufficientDataFallback => "insufficient_data_fallback",
            ForecastMethod::RandomForest => "RandomForest",
            ForecastMethod::TrendFallback => "trend_fallback",
            ForecastMethod::MinimalDataFallback => "minimal_data_fallback",
            ForecastMethod::NoChangeFallback => "no_change_fallback",
            ForecastMethod::EmergencyFallback => "emergency_fallback",
        }
    }

    /// Tags that the short-horizon (ARIMA) ladder can produce.
    pub fn is_short_horizon_tag(&self) -> bool {
        matches!(
            self,
            ForecastMethod::ArimaSuccess
                | ForecastMethod::ArimaMinimalData
                | ForecastMethod::ArimaFittedTrend
                | ForecastMethod::StatisticalFallback
                | ForecastMethod::InsufficientDataFallback
                | ForecastMethod::EmergencyFallback
        )
    }
}

impl std::fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (p, d, q) order of an ARIMA model; serialized as `[p, d, q]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder(pub usize, pub usize, pub usize);

impl ArimaOrder {
    pub fn ar(&self) -> usize {
        self.0
    }

    pub fn diff(&self) -> usize {
        self.1
    }

    pub fn ma(&self) -> usize {
        self.2
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.0, self.1, self.2)
    }
}

/// Descriptor of the model behind a prediction, for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    Arima {
        order: ArimaOrder,
        aic: Option<f64>,
        total_time_secs: Option<f64>,
        attempts: usize,
    },
    Ensemble {
        training_samples: usize,
        trees: usize,
        r2_score: f64,
        max_allowed_change: f64,
    },
    Fallback {
        label: String,
        data_points: usize,
    },
}

impl ModelParams {
    pub fn fallback(label: &str, data_points: usize) -> Self {
        ModelParams::Fallback {
            label: label.to_string(),
            data_points,
        }
    }
}

/// Output of one forecaster run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub confidence: u8, // 0-100 heuristic, not a probability
    pub method: ForecastMethod,
    pub model_params: ModelParams,
}

impl PredictionResult {
    pub fn new(predicted_price: f64, confidence: u8, method: ForecastMethod, model_params: ModelParams) -> Self {
        Self {
            predicted_price,
            confidence: confidence.min(100),
            method,
            model_params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
}

/// Prediction plus the market context it was made in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub stock: String,
    pub predicted_price: f64,
    pub confidence: u8,
    pub volatility: VolatilityClass,
    pub trend: Trend,
    pub sentiment: Sentiment,
    pub sentiment_reason: String,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartInfo {
    pub title: String,
    pub timeframe_days: u32,
    pub data_period: String,
}

/// Human-facing description of the model family plus what actually ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_code: String,
    pub algorithm: String,
    pub description: String,
    pub timeframe: String,
    pub approach: String,
    pub best_for: String,
    pub confidence_range: String,
    pub method_used: ForecastMethod,
    pub model_params: ModelParams,
}

/// Everything returned for a single `forecast` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionBundle {
    pub prediction: Prediction,
    pub historical_data: Vec<PricePoint>,
    pub prediction_timeline: Vec<TimelinePoint>,
    pub chart_info: ChartInfo,
    pub trading_info: TradingInfo,
    pub model_info: ModelInfo,
}

/// Persisted summary of an issued prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub symbol: String,
    pub days_ahead: u32,
    pub predicted_price: f64,
    pub current_price: f64,
    pub confidence: u8,
    pub method: ForecastMethod,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn from_bundle(bundle: &PredictionBundle) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: bundle.prediction.stock.clone(),
            days_ahead: bundle.trading_info.trading_days_ahead,
            predicted_price: bundle.prediction.predicted_price,
            current_price: bundle.prediction.current_price,
            confidence: bundle.prediction.confidence,
            method: bundle.model_info.method_used,
            created_at: bundle.prediction.timestamp,
        }
    }
}
