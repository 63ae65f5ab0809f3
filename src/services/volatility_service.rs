use crate::models::VolatilityClass;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Compute simple daily returns from a chronological price series.
///
/// Pairs whose previous price is not positive are skipped.
pub fn compute_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Annualized realized volatility of the series' daily returns.
pub fn annualized_volatility(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }
    let returns = compute_returns(prices);
    Some(std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Bucket a price series by annualized volatility.
///
/// > 30% is High, > 15% is Moderate, anything else Low. Fewer than two
/// prices gives Unknown.
pub fn classify_volatility(prices: &[f64]) -> VolatilityClass {
    match annualized_volatility(prices) {
        None => VolatilityClass::Unknown,
        Some(vol) if vol > 0.30 => VolatilityClass::High,
        Some(vol) if vol > 0.15 => VolatilityClass::Moderate,
        Some(_) => VolatilityClass::Low,
    }
}

fn horizon_buffer(days_ahead: u32) -> f64 {
    match days_ahead {
        0..=3 => 0.8,
        4..=7 => 1.0,
        8..=30 => 1.2,
        _ => 1.5,
    }
}

fn horizon_ceiling(days_ahead: u32) -> f64 {
    match days_ahead {
        0..=3 => 0.025,
        4..=7 => 0.04,
        8..=30 => 0.12,
        _ => 0.25,
    }
}

/// Maximum relative price change allowed for a forecast.
///
/// Daily volatility is scaled by √days and a horizon buffer, then capped by an
/// absolute ceiling that tightens for short horizons. There is no floor: a
/// flat series allows no change at all.
pub fn max_allowed_change(daily_return_volatility: f64, days_ahead: u32) -> f64 {
    let daily_vol = if daily_return_volatility.is_finite() && daily_return_volatility > 0.0 {
        daily_return_volatility
    } else {
        0.0
    };

    let scaled = daily_vol * (days_ahead as f64).sqrt() * horizon_buffer(days_ahead);
    scaled.min(horizon_ceiling(days_ahead))
}

/// Clamp a relative change into `[-max_change, max_change]`.
pub fn clamp_relative_change(change: f64, max_change: f64) -> f64 {
    change.clamp(-max_change, max_change)
}

/// Clamp a price to within `max_change` (as a fraction) of `reference`.
pub fn clamp_price(price: f64, reference: f64, max_change: f64) -> f64 {
    let lower = reference * (1.0 - max_change);
    let upper = reference * (1.0 + max_change);
    price.max(lower).min(upper)
}
