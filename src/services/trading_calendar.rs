use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::models::TradingInfo;

/// US market holidays for 2025 as (month, day). Update yearly.
const US_MARKET_HOLIDAYS_2025: [(u32, u32); 10] = [
    (1, 1),   // New Year's Day
    (1, 20),  // Martin Luther King Jr. Day
    (2, 17),  // Presidents' Day
    (4, 18),  // Good Friday
    (5, 26),  // Memorial Day
    (6, 19),  // Juneteenth
    (7, 4),   // Independence Day
    (9, 1),   // Labor Day
    (11, 27), // Thanksgiving
    (12, 25), // Christmas
];

pub fn is_market_holiday(date: NaiveDate) -> bool {
    date.year() == 2025 && US_MARKET_HOLIDAYS_2025.contains(&(date.month(), date.day()))
}

/// A trading day is a weekday that is not a listed market holiday.
pub fn is_trading_day(date: NaiveDate) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !is_market_holiday(date)
}

/// Walk forward one calendar day at a time until `n` trading days have passed.
///
/// `start` itself is never counted; `n == 0` returns `start`.
pub fn advance_to_nth_trading_day(start: NaiveDate, n: u32) -> NaiveDate {
    let mut current = start;
    let mut found = 0;

    while found < n {
        current += Duration::days(1);
        if is_trading_day(current) {
            found += 1;
        }
    }

    current
}

/// Trading info for a horizon measured from `today`.
pub fn trading_info_from(today: NaiveDate, days_ahead: u32) -> TradingInfo {
    let target = advance_to_nth_trading_day(today, days_ahead);
    let calendar_days = (target - today).num_days();

    TradingInfo {
        trading_days_ahead: days_ahead,
        calendar_days_ahead: calendar_days,
        target_date: target.format("%Y-%m-%d").to_string(),
        target_date_formatted: target.format("%B %d, %Y").to_string(),
        weekends_skipped: calendar_days - days_ahead as i64,
        is_trading_day_today: is_trading_day(today),
    }
}

/// Trading info for a horizon measured from today's UTC date.
pub fn trading_info(days_ahead: u32) -> TradingInfo {
    trading_info_from(today(), days_ahead)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekends_are_not_trading_days() {
        assert!(!is_trading_day(date(2025, 3, 8))); // Saturday
        assert!(!is_trading_day(date(2025, 3, 9))); // Sunday
        assert!(is_trading_day(date(2025, 3, 10))); // Monday
    }

    #[test]
    fn test_2025_holidays_are_not_trading_days() {
        assert!(!is_trading_day(date(2025, 7, 4)));
        assert!(!is_trading_day(date(2025, 12, 25)));
        assert!(!is_trading_day(date(2025, 4, 18)));
        // Same calendar day in another year is an ordinary weekday
        assert!(is_trading_day(date(2024, 7, 4)));
    }

    #[test]
    fn test_advance_skips_weekend() {
        // Friday + 1 trading day = Monday
        assert_eq!(advance_to_nth_trading_day(date(2025, 3, 7), 1), date(2025, 3, 10));
        assert_eq!(advance_to_nth_trading_day(date(2025, 3, 7), 0), date(2025, 3, 7));
    }

    #[test]
    fn test_advance_skips_holiday() {
        // Thursday 2025-07-03 + 1 trading day skips Independence Day and the weekend
        assert_eq!(advance_to_nth_trading_day(date(2025, 7, 3), 1), date(2025, 7, 7));
    }

    #[test]
    fn test_trading_info_counts_skipped_days() {
        let info = trading_info_from(date(2025, 3, 7), 5);
        assert_eq!(info.target_date, "2025-03-14");
        assert_eq!(info.calendar_days_ahead, 7);
        assert_eq!(info.weekends_skipped, 2);
        assert!(info.is_trading_day_today);
        assert_eq!(info.target_date_formatted, "March 14, 2025");
    }

    #[test]
    fn test_trading_info_is_idempotent() {
        let first = trading_info(10);
        let second = trading_info(10);
        assert_eq!(first.target_date, second.target_date);
        assert_eq!(first.weekends_skipped, second.weekends_skipped);
    }
}
