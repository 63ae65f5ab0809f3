pub mod arima;
pub mod failure_cache;
pub mod fallback_service;
pub mod long_horizon_service;
pub mod news_service;
pub mod prediction_service;
pub mod prediction_store;
pub mod price_service;
pub mod random_forest;
pub mod sentiment_service;
pub mod short_horizon_service;
pub mod timeline_service;
pub mod trading_calendar;
pub mod volatility_service;
