use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{
    ChartInfo, CurrentPriceSnapshot, ForecastStrategy, HistoryPeriod, ModelInfo, Prediction, PredictionBundle,
    PredictionRecord, PredictionRequest, PredictionResult, PriceHistory, Trend,
};
use crate::services::failure_cache::FailureCache;
use crate::services::news_service::NewsProvider;
use crate::services::prediction_store::PredictionStore;
use crate::services::short_horizon_service::ShortHorizonConfig;
use crate::services::{
    long_horizon_service, price_service, sentiment_service, short_horizon_service, timeline_service,
    trading_calendar, volatility_service,
};

/// Fewer usable closes than this and no forecast is attempted.
pub const MIN_USABLE_PRICES: usize = 10;

/// How much history to fetch for a horizon.
pub fn determine_period(days_ahead: u32) -> HistoryPeriod {
    match days_ahead {
        0..=3 => HistoryPeriod::OneMonth,
        4..=10 => HistoryPeriod::ThreeMonths,
        11..=30 => HistoryPeriod::SixMonths,
        _ => HistoryPeriod::OneYear,
    }
}

/// Number of trailing history points to chart for a horizon.
pub fn chart_timeframe(days_ahead: u32) -> u32 {
    match days_ahead {
        0..=3 => 30,
        4..=10 => 60,
        11..=30 => 90,
        31..=90 => 180,
        _ => 365,
    }
}

pub fn chart_title(days_ahead: u32) -> &'static str {
    match days_ahead {
        0..=3 => "📊 Recent Price History (30 Days)",
        4..=10 => "📊 Price History (2 Months)",
        11..=30 => "📊 Price History (3 Months)",
        31..=90 => "📊 Price History (6 Months)",
        _ => "📊 Price History (1 Year)",
    }
}

/// Describe the model family for `strategy` together with what actually ran.
pub fn model_info(strategy: ForecastStrategy, result: &PredictionResult) -> ModelInfo {
    let (model_name, model_code, algorithm, description, timeframe, approach, best_for, confidence_range) = match strategy {
        ForecastStrategy::ShortHorizon => (
            "Short-term Pattern Analysis",
            "ARIMA-S",
            "ARIMA Time Series Analysis",
            "Analyzes recent price movements and patterns",
            "1-7 days",
            "Time series forecasting with autocorrelation analysis",
            "Short-term predictions based on recent trends",
            "60-75%",
        ),
        ForecastStrategy::LongHorizon => (
            "Long-term Pattern Recognition",
            "RF-L",
            "Random Forest Machine Learning",
            "Machine learning analysis of historical patterns",
            "8+ days",
            "Ensemble learning with technical indicators",
            "Longer predictions using historical data patterns",
            "55-70%",
        ),
    };

    ModelInfo {
        model_name: model_name.to_string(),
        model_code: model_code.to_string(),
        algorithm: algorithm.to_string(),
        description: description.to_string(),
        timeframe: timeframe.to_string(),
        approach: approach.to_string(),
        best_for: best_for.to_string(),
        confidence_range: confidence_range.to_string(),
        method_used: result.method,
        model_params: result.model_params.clone(),
    }
}

/// Run the forecaster selected for a horizon.
pub fn run_forecaster(
    strategy: ForecastStrategy,
    prices: &[f64],
    days_ahead: u32,
    current_price: f64,
    short_horizon: &ShortHorizonConfig,
) -> PredictionResult {
    match strategy {
        ForecastStrategy::ShortHorizon => short_horizon_service::predict(prices, days_ahead, current_price, short_horizon),
        ForecastStrategy::LongHorizon => long_horizon_service::predict(prices, days_ahead, current_price),
    }
}

/// The forecast path reports every provider problem as missing data.
fn as_data_unavailable(symbol: &str, err: AppError) -> AppError {
    match err {
        AppError::External(msg) => {
            warn!("Price provider failed for {}: {}", symbol, msg);
            AppError::DataUnavailable(format!("Invalid stock symbol or unable to fetch data for {}", symbol))
        }
        other => other,
    }
}

#[derive(Clone)]
pub struct PredictionService {
    prices: Arc<dyn PriceProvider>,
    news: Arc<dyn NewsProvider>,
    store: Arc<dyn PredictionStore>,
    failure_cache: FailureCache,
    short_horizon: ShortHorizonConfig,
}

impl PredictionService {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        news: Arc<dyn NewsProvider>,
        store: Arc<dyn PredictionStore>,
        failure_cache: FailureCache,
        short_horizon: ShortHorizonConfig,
    ) -> Self {
        Self {
            prices,
            news,
            store,
            failure_cache,
            short_horizon,
        }
    }

    /// Predict the close of `symbol` in `days_ahead` trading days.
    ///
    /// Only validation and data-availability problems are returned as errors;
    /// modelling failures are absorbed by the forecasters and show up in
    /// `model_info.method_used`.
    pub async fn forecast(&self, symbol: &str, days_ahead: i64) -> Result<PredictionBundle, AppError> {
        let request = PredictionRequest::new(symbol, days_ahead)?;
        let symbol = request.symbol.as_str();
        let days_ahead = request.days_ahead;

        let trading_info = trading_calendar::trading_info(days_ahead);
        let period = determine_period(days_ahead);

        let history = price_service::fetch_history(self.prices.as_ref(), &self.failure_cache, symbol, period)
            .await
            .map_err(|e| as_data_unavailable(symbol, e))?;
        let snapshot = price_service::fetch_snapshot(self.prices.as_ref(), &self.failure_cache, symbol)
            .await
            .map_err(|e| as_data_unavailable(symbol, e))?;

        let prices = price_service::closes(&history);
        if prices.len() < MIN_USABLE_PRICES {
            return Err(AppError::DataUnavailable(
                "Insufficient historical data for prediction".to_string(),
            ));
        }

        let current_price = snapshot.current_price;
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AppError::DataUnavailable(format!("No current price available for {}", symbol)));
        }

        let strategy = ForecastStrategy::for_horizon(days_ahead);
        let result = run_forecaster(strategy, &prices, days_ahead, current_price, &self.short_horizon);
        info!(
            "{} +{}d: {:.2} -> {:.2} via {} (confidence {})",
            symbol, days_ahead, current_price, result.predicted_price, result.method, result.confidence
        );

        let sentiment = sentiment_service::analyze(self.news.as_ref(), symbol).await;
        let volatility = volatility_service::classify_volatility(&prices);
        let trend = if result.predicted_price > current_price {
            Trend::Uptrend
        } else {
            Trend::Downtrend
        };

        let prediction_timeline =
            timeline_service::generate_timeline(current_price, result.predicted_price, days_ahead, volatility);

        let chart_days = chart_timeframe(days_ahead) as usize;
        let historical_data = history[history.len().saturating_sub(chart_days)..].to_vec();

        let bundle = PredictionBundle {
            prediction: Prediction {
                stock: symbol.to_string(),
                predicted_price: result.predicted_price,
                confidence: result.confidence,
                volatility,
                trend,
                sentiment: sentiment.sentiment,
                sentiment_reason: sentiment.reason,
                timestamp: Utc::now(),
                current_price,
                price_change: snapshot.price_change,
                price_change_percent: snapshot.price_change_percent,
            },
            historical_data,
            prediction_timeline,
            chart_info: ChartInfo {
                title: chart_title(days_ahead).to_string(),
                timeframe_days: chart_timeframe(days_ahead),
                data_period: period.to_string(),
            },
            trading_info,
            model_info: model_info(strategy, &result),
        };

        self.store.save(PredictionRecord::from_bundle(&bundle));
        Ok(bundle)
    }

    /// Chart history for the prices route, with the latest move derived from it.
    pub async fn price_history(&self, symbol: &str, period: HistoryPeriod) -> Result<PriceHistory, AppError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AppError::Validation("Stock symbol is required".to_string()));
        }

        let history = price_service::fetch_history(self.prices.as_ref(), &self.failure_cache, &symbol, period).await?;
        let current = CurrentPriceSnapshot::from_closes(&price_service::closes(&history));

        Ok(PriceHistory {
            symbol,
            period,
            historical_data: history,
            current,
        })
    }

    pub fn recent_predictions(&self, symbol: Option<&str>, limit: usize) -> Vec<PredictionRecord> {
        self.store.recent(symbol, limit)
    }
}
