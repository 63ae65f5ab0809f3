use serde::{Deserialize, Serialize};

/// Calendar facts about a prediction horizon, derived from the trading calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingInfo {
    pub trading_days_ahead: u32,
    pub calendar_days_ahead: i64,
    pub target_date: String,           // %Y-%m-%d
    pub target_date_formatted: String, // e.g. "March 04, 2025"
    pub weekends_skipped: i64,         // weekend and holiday days in the span
    pub is_trading_day_today: bool,
}

/// One point of the synthetic path between today and the target date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub day: u32,
    pub price: f64,
    pub label: String,
    pub date: String,
    pub is_trading_day: bool,
}
