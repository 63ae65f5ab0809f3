use std::time::{Duration, Instant};

use rand_distr::{Distribution, Normal};
use tracing::{debug, info, warn};

use crate::errors::ModelFailure;
use crate::models::{ArimaOrder, ForecastMethod, ModelParams, PredictionResult};
use crate::services::arima::{self, ArimaFit, FitStrategy};
use crate::services::volatility_service::{clamp_price, compute_returns, mean, std_dev};

/// Number of most recent returns used for fitting.
const FIT_WINDOW: usize = 25;
/// Below this many returns the candidate search is skipped.
const MIN_SEARCH_RETURNS: usize = 10;
/// Below this many returns even the minimal fit is skipped.
const MIN_MINIMAL_FIT_RETURNS: usize = 5;

/// One entry of the ordered ARIMA retry policy.
#[derive(Debug, Clone, Copy)]
pub struct ArimaCandidate {
    pub order: ArimaOrder,
    pub strategy: FitStrategy,
    pub purpose: &'static str,
}

/// Candidates in order of likely success. The repeated orders are retries with
/// a different optimiser start, not accidental duplicates.
pub const ARIMA_CANDIDATES: [ArimaCandidate; 8] = [
    ArimaCandidate { order: ArimaOrder(1, 1, 1), strategy: FitStrategy::ZeroStart, purpose: "most common, fastest" },
    ArimaCandidate { order: ArimaOrder(0, 1, 1), strategy: FitStrategy::ZeroStart, purpose: "simple MA" },
    ArimaCandidate { order: ArimaOrder(1, 1, 0), strategy: FitStrategy::ZeroStart, purpose: "simple AR" },
    ArimaCandidate { order: ArimaOrder(2, 1, 1), strategy: FitStrategy::ZeroStart, purpose: "richer AR" },
    ArimaCandidate { order: ArimaOrder(1, 1, 2), strategy: FitStrategy::ZeroStart, purpose: "richer MA" },
    ArimaCandidate { order: ArimaOrder(1, 1, 1), strategy: FitStrategy::MomentStart, purpose: "retry from moment start" },
    ArimaCandidate { order: ArimaOrder(0, 1, 1), strategy: FitStrategy::MomentStart, purpose: "retry from moment start" },
    ArimaCandidate { order: ArimaOrder(2, 1, 2), strategy: FitStrategy::ZeroStart, purpose: "most complex" },
];

#[derive(Debug, Clone)]
pub struct ShortHorizonConfig {
    /// Soft budget across all candidate fits; only checked before starting one.
    pub time_budget: Duration,
    /// Stop searching once a model with negative AIC exists and this much time has passed.
    pub early_stop_after: Duration,
}

impl Default for ShortHorizonConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_millis(4500),
            early_stop_after: Duration::from_secs(3),
        }
    }
}

/// Outcome of walking the candidate list.
struct ModelSearch {
    best: Option<ArimaFit>,
    attempts: usize,
    total_time: Duration,
}

/// Predict the price `days_ahead` trading days out with the ARIMA ladder.
///
/// Never fails: every rung that cannot produce a prediction hands over to the
/// next one, down to a noisy no-change emergency estimate.
pub fn predict(prices: &[f64], days_ahead: u32, current_price: f64, config: &ShortHorizonConfig) -> PredictionResult {
    run_ladder(prices, days_ahead, current_price, config).unwrap_or_else(|failure| {
        warn!("Complete ARIMA failure: {}", failure);
        emergency_prediction(current_price)
    })
}

fn run_ladder(
    prices: &[f64],
    days_ahead: u32,
    current_price: f64,
    config: &ShortHorizonConfig,
) -> Result<PredictionResult, ModelFailure> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(ModelFailure::InvalidValue(format!("current price {}", current_price)));
    }
    if days_ahead == 0 {
        return Err(ModelFailure::InvalidValue("horizon must be at least one day".to_string()));
    }

    let returns = compute_returns(prices);
    let window = &returns[returns.len().saturating_sub(FIT_WINDOW)..];

    if window.len() < MIN_SEARCH_RETURNS {
        return Ok(minimal_data_prediction(window, days_ahead, current_price).unwrap_or_else(|failure| {
            warn!("Minimal-data ARIMA unavailable: {}", failure);
            insufficient_data_prediction(window, days_ahead, current_price)
        }));
    }

    let search = search_best_model(window, config);

    search
        .best
        .as_ref()
        .ok_or_else(|| ModelFailure::FitFailed(format!("none of {} ARIMA attempts fitted", search.attempts)))
        .and_then(|best| {
            forecast_with_model(best, &search, window.len(), days_ahead, current_price).or_else(|failure| {
                warn!("ARIMA forecast failed: {}", failure);
                fitted_trend_prediction(best, days_ahead, current_price)
            })
        })
        .or_else(|failure| {
            warn!("Falling back to statistical blend: {}", failure);
            statistical_prediction(window, days_ahead, current_price)
        })
}

fn search_best_model(window: &[f64], config: &ShortHorizonConfig) -> ModelSearch {
    let mut best: Option<ArimaFit> = None;
    let mut attempts = 0;
    let mut total_time = Duration::ZERO;

    for candidate in ARIMA_CANDIDATES.iter() {
        if total_time >= config.time_budget {
            info!("ARIMA time budget exhausted: {:.1}s", total_time.as_secs_f64());
            break;
        }

        let started = Instant::now();
        let outcome = arima::fit(window, candidate.order, candidate.strategy);
        let elapsed = started.elapsed();
        total_time += elapsed;
        attempts += 1;

        match outcome {
            Ok(model) => {
                if best.as_ref().map_or(true, |b| model.aic < b.aic) {
                    debug!(
                        "ARIMA{} ({}) succeeded in {:.2}s, AIC: {:.2}",
                        candidate.order,
                        candidate.purpose,
                        elapsed.as_secs_f64(),
                        model.aic
                    );
                    best = Some(model);
                }
            }
            Err(failure) => {
                debug!(
                    "ARIMA{} ({}) failed in {:.2}s: {}",
                    candidate.order,
                    candidate.purpose,
                    elapsed.as_secs_f64(),
                    failure
                );
            }
        }

        if best.as_ref().is_some_and(|b| b.aic < 0.0) && total_time > config.early_stop_after {
            info!("Good ARIMA model found, stopping early at {:.1}s", total_time.as_secs_f64());
            break;
        }
    }

    ModelSearch {
        best,
        attempts,
        total_time,
    }
}

fn compound(current_price: f64, returns: &[f64]) -> f64 {
    returns.iter().fold(current_price, |price, r| price * (1.0 + r))
}

fn ensure_finite(price: f64, rung: &str) -> Result<f64, ModelFailure> {
    if price.is_finite() {
        Ok(price)
    } else {
        Err(ModelFailure::InvalidValue(format!("{} produced {}", rung, price)))
    }
}

fn minimal_data_prediction(window: &[f64], days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    if window.len() < MIN_MINIMAL_FIT_RETURNS {
        return Err(ModelFailure::InsufficientData(format!(
            "{} returns, need {}",
            window.len(),
            MIN_MINIMAL_FIT_RETURNS
        )));
    }

    let order = ArimaOrder(1, 1, 1);
    let model = arima::fit(window, order, FitStrategy::ZeroStart)?;
    let forecast = model.forecast(days_ahead as usize)?;
    let raw = ensure_finite(compound(current_price, &forecast), "minimal ARIMA")?;

    let max_change = if days_ahead <= 3 { 0.10 } else { 0.15 };

    Ok(PredictionResult::new(
        clamp_price(raw, current_price, max_change),
        55,
        ForecastMethod::ArimaMinimalData,
        ModelParams::Arima {
            order,
            aic: Some(model.aic),
            total_time_secs: None,
            attempts: 1,
        },
    ))
}

fn insufficient_data_prediction(window: &[f64], days_ahead: u32, current_price: f64) -> PredictionResult {
    let avg_return = mean(window);
    let predicted = current_price * (1.0 + avg_return * days_ahead as f64 * 0.1);

    PredictionResult::new(
        predicted,
        40,
        ForecastMethod::InsufficientDataFallback,
        ModelParams::fallback("fallback", window.len()),
    )
}

fn arima_confidence(aic: f64, fit_returns: usize) -> u8 {
    let mut confidence: u8 = 60;
    if aic < -50.0 {
        confidence += 15;
    } else if aic < -20.0 {
        confidence += 10;
    } else if aic < 0.0 {
        confidence += 5;
    }

    if fit_returns > 20 {
        confidence += 5;
    }

    confidence.min(75)
}

fn forecast_with_model(
    model: &ArimaFit,
    search: &ModelSearch,
    fit_returns: usize,
    days_ahead: u32,
    current_price: f64,
) -> Result<PredictionResult, ModelFailure> {
    info!("Using ARIMA{} with AIC {:.2}", model.order, model.aic);

    let forecast = model.forecast(days_ahead as usize)?;
    let raw = ensure_finite(compound(current_price, &forecast), "ARIMA forecast")?;
    let max_change = if days_ahead <= 3 { 0.12 } else { 0.18 };

    Ok(PredictionResult::new(
        clamp_price(raw, current_price, max_change),
        arima_confidence(model.aic, fit_returns),
        ForecastMethod::ArimaSuccess,
        ModelParams::Arima {
            order: model.order,
            aic: Some(model.aic),
            total_time_secs: Some((search.total_time.as_secs_f64() * 100.0).round() / 100.0),
            attempts: search.attempts,
        },
    ))
}

fn fitted_trend_prediction(model: &ArimaFit, days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    let fitted = model.fitted_values();
    if fitted.is_empty() {
        return Err(ModelFailure::ForecastFailed("model has no fitted values".to_string()));
    }

    let recent_trend = mean(&fitted[fitted.len().saturating_sub(3)..]);
    let raw = ensure_finite(current_price * (1.0 + recent_trend * days_ahead as f64), "fitted trend")?;

    Ok(PredictionResult::new(
        clamp_price(raw, current_price, 0.10),
        55,
        ForecastMethod::ArimaFittedTrend,
        ModelParams::Arima {
            order: model.order,
            aic: Some(model.aic),
            total_time_secs: None,
            attempts: 1,
        },
    ))
}

/// Average of three return signals: exponential smoothing, a linearly
/// weighted recent average and a mean-reversion rule.
pub fn blended_return_signal(returns: &[f64]) -> Option<f64> {
    if returns.len() < MIN_MINIMAL_FIT_RETURNS {
        return None;
    }

    let alpha = 0.3;
    let smoothed = returns[1..]
        .iter()
        .fold(returns[0], |s, r| alpha * r + (1.0 - alpha) * s);

    let recent = &returns[returns.len() - 5..];
    let weights: Vec<f64> = (0..recent.len())
        .map(|i| 1.0 + 2.0 * i as f64 / (recent.len() - 1) as f64)
        .collect();
    let weight_sum: f64 = weights.iter().sum();
    let weighted_avg = recent.iter().zip(&weights).map(|(r, w)| r * w).sum::<f64>() / weight_sum;

    let last_return = returns[returns.len() - 1];
    let mean_reversion = if last_return.abs() > std_dev(returns) {
        -last_return * 0.2
    } else {
        mean(&returns[returns.len() - 3..])
    };

    Some((smoothed + weighted_avg + mean_reversion) / 3.0)
}

fn statistical_prediction(window: &[f64], days_ahead: u32, current_price: f64) -> Result<PredictionResult, ModelFailure> {
    let raw = match blended_return_signal(window) {
        Some(signal) => current_price * (1.0 + signal * days_ahead as f64 * 0.4),
        None => current_price * (1.0 + mean(window) * days_ahead as f64 * 0.2),
    };
    let raw = ensure_finite(raw, "statistical blend")?;
    let max_change = if days_ahead <= 3 { 0.08 } else { 0.12 };

    Ok(PredictionResult::new(
        clamp_price(raw, current_price, max_change),
        45,
        ForecastMethod::StatisticalFallback,
        ModelParams::fallback("stat_fallback", window.len()),
    ))
}

/// Current price with a little Gaussian noise (σ = 0.5% of price).
fn emergency_prediction(current_price: f64) -> PredictionResult {
    let noise = Normal::new(0.0, 0.005)
        .map(|normal| normal.sample(&mut rand::rng()))
        .unwrap_or(0.0);

    PredictionResult::new(
        current_price * (1.0 + noise),
        35,
        ForecastMethod::EmergencyFallback,
        ModelParams::fallback("emergency", 0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zigzag_prices() -> Vec<f64> {
        vec![100.0, 101.0, 99.0, 102.0, 98.0, 103.0, 97.0, 104.0, 96.0, 105.0]
    }

    fn random_walk(n: usize) -> Vec<f64> {
        let mut price = 100.0;
        (0..n)
            .map(|i| {
                let step = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
                price *= 1.0 + step * 0.03;
                price
            })
            .collect()
    }

    #[test]
    fn test_candidate_policy_keeps_retries() {
        assert_eq!(ARIMA_CANDIDATES.len(), 8);
        let retries = ARIMA_CANDIDATES
            .iter()
            .filter(|c| c.strategy == FitStrategy::MomentStart)
            .count();
        assert_eq!(retries, 2);
        assert_eq!(ARIMA_CANDIDATES[0].order, ARIMA_CANDIDATES[5].order);
        assert_eq!(ARIMA_CANDIDATES[1].order, ARIMA_CANDIDATES[6].order);
    }

    #[test]
    fn test_zigzag_scenario_stays_within_bounds() {
        let result = predict(&zigzag_prices(), 3, 105.0, &ShortHorizonConfig::default());

        assert!(result.predicted_price.is_finite());
        assert!((result.predicted_price / 105.0 - 1.0).abs() <= 0.12 + 1e-9);
        assert!((35..=75).contains(&result.confidence));
        assert!(result.method.is_short_horizon_tag());
    }

    #[test]
    fn test_tiny_series_uses_insufficient_data_fallback() {
        let result = predict(&[100.0, 101.0, 102.0], 2, 102.0, &ShortHorizonConfig::default());
        assert_eq!(result.method, ForecastMethod::InsufficientDataFallback);
        assert_eq!(result.confidence, 40);
    }

    #[test]
    fn test_five_returns_use_minimal_arima() {
        let prices = [100.0, 100.8, 101.1, 100.4, 101.9, 102.3];
        let result = predict(&prices, 2, 102.3, &ShortHorizonConfig::default());

        assert_eq!(result.method, ForecastMethod::ArimaMinimalData);
        assert_eq!(result.confidence, 55);
        assert!((result.predicted_price / 102.3 - 1.0).abs() <= 0.10 + 1e-9);
        assert!(matches!(result.model_params, ModelParams::Arima { attempts: 1, .. }));
    }

    #[test]
    fn test_single_price_predicts_no_change() {
        let result = predict(&[50.0], 1, 50.0, &ShortHorizonConfig::default());
        assert_eq!(result.method, ForecastMethod::InsufficientDataFallback);
        assert_eq!(result.predicted_price, 50.0);
    }

    #[test]
    fn test_full_window_respects_short_clamps() {
        let prices = random_walk(60);
        let current = *prices.last().unwrap();
        for days in 1..=7 {
            let result = predict(&prices, days, current, &ShortHorizonConfig::default());
            let change = (result.predicted_price / current - 1.0).abs();
            assert!(change <= 0.18 + 1e-9, "day {} moved {}", days, change);
            if days <= 3 {
                assert!(change <= 0.12 + 1e-9);
            }
            assert!(result.confidence <= 75);
        }
    }

    #[test]
    fn test_noisy_history_selects_fitted_model() {
        for seed in [1, 7, 42] {
            let mut rng = StdRng::seed_from_u64(seed);
            let normal = Normal::new(0.0005, 0.015).unwrap();
            let mut price = 100.0;
            let prices: Vec<f64> = (0..60)
                .map(|_| {
                    price *= 1.0 + normal.sample(&mut rng);
                    price
                })
                .collect();
            let current = *prices.last().unwrap();

            let result = predict(&prices, 3, current, &ShortHorizonConfig::default());

            assert_eq!(result.method, ForecastMethod::ArimaSuccess, "seed {}", seed);
            assert!((60..=75).contains(&result.confidence));
            assert!((result.predicted_price / current - 1.0).abs() <= 0.12 + 1e-9);
            match result.model_params {
                ModelParams::Arima { attempts, aic, .. } => {
                    assert!(attempts >= 1 && attempts <= ARIMA_CANDIDATES.len());
                    assert!(aic.is_some_and(f64::is_finite));
                }
                other => panic!("unexpected params {:?}", other),
            }
        }
    }

    fn trending_returns(level: f64) -> Vec<f64> {
        (0..25).map(|t| level + 0.01 * (t as f64 * 1.3).sin()).collect()
    }

    #[test]
    fn test_fitted_trend_is_clamped_to_ten_percent() {
        let rising = arima::fit(&trending_returns(0.2), ArimaOrder(1, 1, 1), FitStrategy::ZeroStart).unwrap();
        let result = fitted_trend_prediction(&rising, 5, 100.0).unwrap();

        assert_eq!(result.method, ForecastMethod::ArimaFittedTrend);
        assert_eq!(result.confidence, 55);
        assert!((result.predicted_price - 110.0).abs() < 1e-9);

        let falling = arima::fit(&trending_returns(-0.2), ArimaOrder(1, 1, 1), FitStrategy::ZeroStart).unwrap();
        let result = fitted_trend_prediction(&falling, 5, 100.0).unwrap();
        assert!((result.predicted_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_fitted_trend_projects_recent_fitted_values() {
        let flat = arima::fit(&trending_returns(0.0), ArimaOrder(1, 1, 1), FitStrategy::ZeroStart).unwrap();
        let fitted = flat.fitted_values();
        let trend = mean(&fitted[fitted.len() - 3..]);

        let result = fitted_trend_prediction(&flat, 3, 100.0).unwrap();
        assert!((result.predicted_price - 100.0 * (1.0 + trend * 3.0)).abs() < 1e-9);
        assert!((result.predicted_price / 100.0 - 1.0).abs() < 0.10);
    }

    #[test]
    fn test_zero_budget_goes_straight_to_statistical_fallback() {
        let config = ShortHorizonConfig {
            time_budget: Duration::ZERO,
            early_stop_after: Duration::ZERO,
        };
        let prices = random_walk(40);
        let current = *prices.last().unwrap();
        let result = predict(&prices, 5, current, &config);

        assert_eq!(result.method, ForecastMethod::StatisticalFallback);
        assert_eq!(result.confidence, 45);
        assert!((result.predicted_price / current - 1.0).abs() <= 0.12 + 1e-9);
    }

    #[test]
    fn test_invalid_current_price_is_emergency() {
        let result = predict(&zigzag_prices(), 3, f64::NAN, &ShortHorizonConfig::default());
        assert_eq!(result.method, ForecastMethod::EmergencyFallback);
        assert_eq!(result.confidence, 35);
    }

    #[test]
    fn test_arima_confidence_tiers() {
        assert_eq!(arima_confidence(-80.0, 25), 75);
        assert_eq!(arima_confidence(-30.0, 25), 75);
        assert_eq!(arima_confidence(-30.0, 15), 70);
        assert_eq!(arima_confidence(-5.0, 15), 65);
        assert_eq!(arima_confidence(12.0, 15), 60);
    }

    #[test]
    fn test_blended_signal_mean_reversion() {
        // Last return is a large outlier: the reversion term pulls the other way
        let returns = vec![0.001, -0.001, 0.002, -0.002, 0.001, 0.08];
        let signal = blended_return_signal(&returns).unwrap();
        assert!(signal.is_finite());
        assert!(blended_return_signal(&returns[..4]).is_none());
    }

    #[test]
    fn test_compound_multiplies_returns() {
        let price = compound(100.0, &[0.1, -0.1]);
        assert!((price - 99.0).abs() < 1e-9);
    }
}
