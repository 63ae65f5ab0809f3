use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::models::{TimelinePoint, VolatilityClass};
use crate::services::trading_calendar;

/// Lower and upper bounds of any synthesized price, as multiples of the current price.
pub const MIN_PRICE_MULTIPLE: f64 = 0.5;
pub const MAX_PRICE_MULTIPLE: f64 = 2.0;

/// Synthesize a day-by-day path from today's price to the prediction.
pub fn generate_timeline(
    current_price: f64,
    predicted_price: f64,
    trading_days_ahead: u32,
    volatility: VolatilityClass,
) -> Vec<TimelinePoint> {
    generate_timeline_from(
        trading_calendar::today(),
        current_price,
        predicted_price,
        trading_days_ahead,
        volatility,
        &mut rand::rng(),
    )
}

fn label_for(day: u32, trading_days_ahead: u32) -> String {
    let step = (trading_days_ahead / 5).max(1);
    if day % step == 0 || day == trading_days_ahead {
        format!("+{}d", day)
    } else {
        String::new()
    }
}

/// Walk forward from `start`, emitting one point per trading day.
///
/// The walk stops after `trading_days_ahead` trading days or after checking
/// three times that many calendar days, whichever comes first. Each point is
/// the linear interpolation towards `predicted_price` plus Gaussian noise
/// scaled by the volatility class, clamped to [0.5, 2.0] × current price.
pub fn generate_timeline_from<R: Rng + ?Sized>(
    start: NaiveDate,
    current_price: f64,
    predicted_price: f64,
    trading_days_ahead: u32,
    volatility: VolatilityClass,
    rng: &mut R,
) -> Vec<TimelinePoint> {
    let mut timeline = vec![TimelinePoint {
        day: 0,
        price: current_price,
        label: "Today".to_string(),
        date: start.format("%Y-%m-%d").to_string(),
        is_trading_day: trading_calendar::is_trading_day(start),
    }];

    if trading_days_ahead == 0 {
        return timeline;
    }

    let price_change = predicted_price - current_price;
    let noise = Normal::new(0.0, (current_price * volatility.noise_factor()).abs()).ok();
    let lower = current_price * MIN_PRICE_MULTIPLE;
    let upper = current_price * MAX_PRICE_MULTIPLE;

    let mut date = start;
    let mut counted = 0;
    let mut checked = 0;

    while counted < trading_days_ahead && checked < trading_days_ahead * 3 {
        checked += 1;
        date += Duration::days(1);

        if !trading_calendar::is_trading_day(date) {
            continue;
        }
        counted += 1;

        let progress = counted as f64 / trading_days_ahead as f64;
        let base_price = current_price + price_change * progress;
        let variation = noise.as_ref().map_or(0.0, |n| n.sample(rng));

        timeline.push(TimelinePoint {
            day: counted,
            price: (base_price + variation).max(lower).min(upper),
            label: label_for(counted, trading_days_ahead),
            date: date.format("%Y-%m-%d").to_string(),
            is_trading_day: true,
        });
    }

    timeline
}
