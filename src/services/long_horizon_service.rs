use ndarray::{Array1, Array2, ArrayView1};
use tracing::{info, warn};

use crate::errors::ModelFailure;
use crate::models::{ForecastMethod, ModelParams, PredictionResult};
use crate::services::fallback_service;
use crate::services::random_forest::{ForestParams, RandomForest};
use crate::services::volatility_service::{clamp_relative_change, max_allowed_change, mean, std_dev};

pub const WINDOW_SIZE: usize = 20;
pub const FEATURE_COUNT: usize = 8;
/// Minimum history before the ensemble is attempted at all.
pub const MIN_ENSEMBLE_PRICES: usize = 50;
const RETURN_LOOKBACK: usize = 252;
const MAX_ABS_RETURN: f64 = 0.5;
const MIN_VALID_RETURNS: usize = 20;
const MIN_TRAINING_SAMPLES: usize = 20;
/// Labels beyond ±100% are treated as data errors.
const MAX_ABS_LABEL: f64 = 1.0;

/// Predict the price `days_ahead` trading days out with the tree ensemble,
/// handing over to the fallback forecaster whenever the ensemble cannot run.
pub fn predict(prices: &[f64], days_ahead: u32, current_price: f64) -> PredictionResult {
    ensemble_prediction(prices, days_ahead, current_price, &ForestParams::default()).unwrap_or_else(|failure| {
        warn!("Random forest unavailable, using fallback: {}", failure);
        fallback_service::predict(prices, days_ahead, current_price)
    })
}

/// Daily returns over the last year of prices, without moves of 50% or more.
pub fn filtered_returns(prices: &[f64]) -> Vec<f64> {
    let recent = &prices[prices.len().saturating_sub(RETURN_LOOKBACK)..];
    recent
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|r| r.abs() < MAX_ABS_RETURN)
        .collect()
}

/// The eight features of a 20-price window whose last element is `anchor`.
///
/// Order: 5/10/20-day mean over anchor, 5-day and 10-day momentum, 10-day
/// coefficient of variation, total window return, range over mean.
pub fn window_features(window: &[f64], anchor: f64) -> Option<[f64; FEATURE_COUNT]> {
    if window.len() != WINDOW_SIZE || anchor <= 0.0 || window.iter().any(|p| *p <= 0.0) {
        return None;
    }

    let n = window.len();
    let last = window[n - 1];
    let last_10 = &window[n - 10..];
    let mean_10 = mean(last_10);
    let mean_all = mean(window);
    let (low, high) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(*p), hi.max(*p)));

    let features = [
        mean(&window[n - 5..]) / anchor,
        mean_10 / anchor,
        mean_all / anchor,
        (last - window[n - 5]) / window[n - 5],
        (last - window[n - 10]) / window[n - 10],
        std_dev(last_10) / mean_10,
        (last - window[0]) / window[0],
        (high - low) / mean_all,
    ];

    features.iter().all(|f| f.is_finite()).then_some(features)
}

/// Sliding-window training set: features of `prices[i-19..=i]` labelled with
/// the relative change from `prices[i]` to `prices[i + days_ahead]`.
pub fn build_training_set(prices: &[f64], days_ahead: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rows: Vec<f64> = Vec::new();
    let mut labels: Vec<f64> = Vec::new();

    let end = prices.len().saturating_sub(days_ahead);
    for i in WINDOW_SIZE..end {
        let anchor = prices[i];
        let future = prices[i + days_ahead];
        if future <= 0.0 {
            continue;
        }

        let Some(features) = window_features(&prices[i + 1 - WINDOW_SIZE..=i], anchor) else {
            continue;
        };

        let label = (future - anchor) / anchor;
        if !label.is_finite() || label.abs() > MAX_ABS_LABEL {
            continue;
        }

        rows.extend_from_slice(&features);
        labels.push(label);
    }

    let x = Array2::from_shape_vec((labels.len(), FEATURE_COUNT), rows)
        .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COUNT)));
    (x, Array1::from(labels))
}

/// Map in-sample R² to a confidence score, with a penalty past 30 days.
pub fn ensemble_confidence(r2_score: f64, days_ahead: u32) -> u8 {
    let mut confidence = (r2_score * 85.0).round().clamp(45.0, 70.0);

    if days_ahead > 30 {
        confidence -= ((days_ahead - 30) as f64 * 0.3).min(15.0);
    }

    confidence.max(40.0) as u8
}

fn ensemble_prediction(
    prices: &[f64],
    days_ahead: u32,
    current_price: f64,
    params: &ForestParams,
) -> Result<PredictionResult, ModelFailure> {
    if prices.len() < MIN_ENSEMBLE_PRICES {
        return Err(ModelFailure::InsufficientData(format!(
            "{} price points, need at least {}",
            prices.len(),
            MIN_ENSEMBLE_PRICES
        )));
    }
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(ModelFailure::InvalidValue(format!("current price {}", current_price)));
    }

    let returns = filtered_returns(prices);
    if returns.len() < MIN_VALID_RETURNS {
        return Err(ModelFailure::InsufficientData(format!(
            "{} valid daily returns, need {}",
            returns.len(),
            MIN_VALID_RETURNS
        )));
    }

    let historical_volatility = std_dev(&returns);
    if historical_volatility == 0.0 {
        return Err(ModelFailure::Degenerate("zero volatility".to_string()));
    }

    let horizon = days_ahead as usize;
    let min_data_needed = WINDOW_SIZE + horizon + 10;
    if prices.len() < min_data_needed {
        return Err(ModelFailure::InsufficientData(format!(
            "need {} prices for windowing, have {}",
            min_data_needed,
            prices.len()
        )));
    }

    let (x, y) = build_training_set(prices, horizon);
    if y.len() < MIN_TRAINING_SAMPLES {
        return Err(ModelFailure::InsufficientData(format!(
            "{} valid training samples, need {}",
            y.len(),
            MIN_TRAINING_SAMPLES
        )));
    }

    info!("Training Random Forest with {} samples", y.len());
    let forest = RandomForest::fit(&x, &y, params)?;

    let current_window = &prices[prices.len() - WINDOW_SIZE..];
    let features = window_features(current_window, current_price)
        .ok_or_else(|| ModelFailure::InvalidValue("current window features are not usable".to_string()))?;

    let raw_change = forest.predict_one(ArrayView1::from(&features[..]));
    if !raw_change.is_finite() {
        return Err(ModelFailure::ForecastFailed(format!("model returned {}", raw_change)));
    }

    let max_change = max_allowed_change(historical_volatility, days_ahead);
    let change = clamp_relative_change(raw_change, max_change);
    let r2 = forest.r2_score(&x, &y);

    Ok(PredictionResult::new(
        current_price * (1.0 + change),
        ensemble_confidence(r2, days_ahead),
        ForecastMethod::RandomForest,
        ModelParams::Ensemble {
            training_samples: y.len(),
            trees: forest.n_trees(),
            r2_score: r2,
            max_allowed_change: max_change,
        },
    ))
}
