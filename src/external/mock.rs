use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::{HistoryPeriod, PricePoint};
use crate::services::trading_calendar;

/// Offline provider that serves a random walk over trading days.
///
/// The walk is seeded from the symbol, so the same symbol always yields the
/// same history for a given end date.
pub struct MockPriceProvider {
    start_price: f64,
    max_daily_move: f64,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self {
            start_price: 100.0,
            max_daily_move: 0.02,
        }
    }

    fn seed_for(symbol: &str) -> u64 {
        symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3))
    }

    /// Random walk ending on `end`, covering the trading days of `period`.
    ///
    /// Every period is a tail of the same one-year walk, so all periods agree
    /// on the latest closes.
    pub fn generate(&self, symbol: &str, period: HistoryPeriod, end: NaiveDate) -> Vec<PricePoint> {
        let period_start = end - Duration::days(period.calendar_days() as i64);

        self.full_walk(symbol, end)
            .into_iter()
            .filter(|p| p.date >= period_start)
            .collect()
    }

    fn full_walk(&self, symbol: &str, end: NaiveDate) -> Vec<PricePoint> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(symbol));
        let start = end - Duration::days(HistoryPeriod::OneYear.calendar_days() as i64);

        let mut current = self.start_price;
        let mut points = Vec::new();
        let mut date = start;
        while date <= end {
            if trading_calendar::is_trading_day(date) {
                current *= 1.0 + (rng.random::<f64>() - 0.5) * self.max_daily_move;
                points.push(PricePoint::new(date, (current * 100.0).round() / 100.0));
            }
            date += Duration::days(1);
        }

        points
    }
}

impl Default for MockPriceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        Ok(self.generate(symbol, period, trading_calendar::today()))
    }
}
