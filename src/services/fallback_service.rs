use tracing::warn;

use crate::errors::ModelFailure;
use crate::models::{ForecastMethod, ModelParams, PredictionResult};
use crate::services::volatility_service::clamp_price;

const TREND_LOOKBACK: usize = 20;
/// Share of the full linear trend that is projected forward.
const TREND_DAMPING: f64 = 0.3;
const MINIMAL_DAMPING: f64 = 0.05;

/// Conservative forecast used whenever the ensemble cannot run.
///
/// Rungs: damped linear trend (> 10 prices), last-two-step change (>= 3
/// prices), unchanged price. A rung that produces a non-finite value drops to
/// the emergency result: current price unchanged, confidence 15.
pub fn predict(prices: &[f64], days_ahead: u32, current_price: f64) -> PredictionResult {
    run_ladder(prices, days_ahead, current_price).unwrap_or_else(|failure| {
        warn!("Even fallback prediction failed: {}", failure);
        PredictionResult::new(
            current_price,
            15,
            ForecastMethod::EmergencyFallback,
            ModelParams::fallback("emergency", prices.len()),
        )
    })
}

fn run_ladder(prices: &[f64], days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    if !current_price.is_finite() {
        return Err(ModelFailure::InvalidValue(format!("current price {}", current_price)));
    }

    if prices.len() > 10 {
        trend_prediction(prices, days_ahead, current_price)
    } else if prices.len() >= 3 {
        minimal_data_prediction(prices, days_ahead, current_price)
    } else {
        Ok(PredictionResult::new(
            current_price,
            20,
            ForecastMethod::NoChangeFallback,
            ModelParams::fallback("no_change", prices.len()),
        ))
    }
}

fn ensure_finite(projected: f64, rung: &str) -> Result<f64, ModelFailure> {
    if projected.is_finite() {
        Ok(projected)
    } else {
        Err(ModelFailure::InvalidValue(format!("{} projected {}", rung, projected)))
    }
}

/// Closed-form least-squares slope of `values` against their index.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = values.iter().enumerate().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), (i, y)| {
            let x = i as f64;
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        },
    );

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

fn trend_cap(days_ahead: u32) -> f64 {
    match days_ahead {
        0..=30 => 0.08,
        31..=60 => 0.12,
        _ => 0.15,
    }
}

fn trend_confidence(price_count: usize) -> u8 {
    if price_count > 30 {
        40
    } else if price_count > 20 {
        35
    } else {
        30
    }
}

fn trend_prediction(prices: &[f64], days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    let recent = &prices[prices.len().saturating_sub(TREND_LOOKBACK)..];
    let slope = linear_slope(recent);
    let projected = ensure_finite(current_price + slope * days_ahead as f64 * TREND_DAMPING, "trend")?;

    Ok(PredictionResult::new(
        clamp_price(projected, current_price, trend_cap(days_ahead)),
        trend_confidence(prices.len()),
        ForecastMethod::TrendFallback,
        ModelParams::fallback("linear_trend", recent.len()),
    ))
}

fn minimal_data_prediction(prices: &[f64], days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    let n = prices.len();
    let recent_change = (prices[n - 1] - prices[n - 3]) / 2.0;
    let projected = ensure_finite(current_price + recent_change * days_ahead as f64 * MINIMAL_DAMPING, "recent change")?;

    Ok(PredictionResult::new(
        clamp_price(projected, current_price, 0.05),
        25,
        ForecastMethod::MinimalDataFallback,
        ModelParams::fallback("recent_change", n),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_slope() {
        assert!((linear_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(linear_slope(&[7.0]), 0.0);
    }

    #[test]
    fn test_flat_series_predicts_no_change() {
        let prices = vec![50.0; 60];
        let result = predict(&prices, 10, 50.0);

        assert_eq!(result.method, ForecastMethod::TrendFallback);
        assert_eq!(result.predicted_price, 50.0);
        assert_eq!(result.confidence, 40);
    }

    #[test]
    fn test_trend_is_damped_and_capped() {
        // Slope of 1.0 per day over the last 20 prices
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let result = predict(&prices, 10, 139.0);
        assert!((result.predicted_price - 142.0).abs() < 1e-9);

        // A steep trend hits the 8% cap for horizons <= 30
        let steep: Vec<f64> = (0..40).map(|i| 100.0 + 10.0 * i as f64).collect();
        let result = predict(&steep, 30, 490.0);
        assert!((result.predicted_price - 490.0 * 1.08).abs() < 1e-9);
    }

    #[test]
    fn test_trend_caps_widen_with_horizon() {
        assert_eq!(trend_cap(30), 0.08);
        assert_eq!(trend_cap(31), 0.12);
        assert_eq!(trend_cap(60), 0.12);
        assert_eq!(trend_cap(61), 0.15);
    }

    #[test]
    fn test_confidence_scales_with_history() {
        let short: Vec<f64> = (0..15).map(|i| 100.0 + i as f64 * 0.1).collect();
        assert_eq!(predict(&short, 10, 101.4).confidence, 30);

        let medium: Vec<f64> = (0..25).map(|i| 100.0 + i as f64 * 0.1).collect();
        assert_eq!(predict(&medium, 10, 102.4).confidence, 35);
    }

    #[test]
    fn test_minimal_data_rung() {
        let result = predict(&[100.0, 102.0, 104.0, 106.0], 10, 106.0);

        assert_eq!(result.method, ForecastMethod::MinimalDataFallback);
        assert_eq!(result.confidence, 25);
        // (106 - 102) / 2 * 10 * 0.05 = 1.0
        assert!((result.predicted_price - 107.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_change_rung() {
        let result = predict(&[100.0, 101.0], 20, 101.0);
        assert_eq!(result.method, ForecastMethod::NoChangeFallback);
        assert_eq!(result.predicted_price, 101.0);
        assert_eq!(result.confidence, 20);
    }

    #[test]
    fn test_non_finite_input_is_emergency() {
        let mut prices = vec![100.0; 20];
        prices[19] = f64::INFINITY;
        let result = predict(&prices, 10, 100.0);

        assert_eq!(result.method, ForecastMethod::EmergencyFallback);
        assert_eq!(result.confidence, 15);
        assert_eq!(result.predicted_price, 100.0);
    }
}
