//! End-to-end checks of `PredictionService::forecast` against in-test providers.

mod common;

use std::sync::Arc;

use predictify::errors::AppError;
use predictify::models::{ForecastMethod, Sentiment, Trend};
use predictify::services::prediction_service::chart_timeframe;
use predictify::services::prediction_store::PredictionStore;

use common::{
    service_with, trending_closes, BrokenNewsProvider, BrokenPriceProvider, FixedNewsProvider, FixedPriceProvider,
};

fn mock_headlines() -> Arc<FixedNewsProvider> {
    Arc::new(FixedNewsProvider(vec![
        "AAPL shows strong growth potential!",
        "Mixed opinions on AAPL stock today.",
        "Investors worry about Q3 earnings for AAPL",
    ]))
}

#[tokio::test]
async fn test_horizon_boundary_selects_forecaster() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(120)));
    let (service, _) = service_with(provider, mock_headlines());

    let short = service.forecast("aapl", 7).await.unwrap();
    assert!(short.model_info.method_used.is_short_horizon_tag());
    assert_eq!(short.model_info.model_code, "ARIMA-S");

    let long = service.forecast("aapl", 8).await.unwrap();
    assert!(!long.model_info.method_used.is_short_horizon_tag());
    assert_eq!(long.model_info.model_code, "RF-L");
    assert_eq!(long.trading_info.trading_days_ahead, 8);
}

#[tokio::test]
async fn test_invalid_horizon_never_reaches_provider() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(60)));
    let (service, store) = service_with(provider.clone(), mock_headlines());

    for days in [0, -3, 91, 1000] {
        let result = service.forecast("AAPL", days).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "days_ahead {}", days);
    }
    assert!(matches!(service.forecast("   ", 3).await, Err(AppError::Validation(_))));

    assert_eq!(provider.call_count(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_short_history_is_data_unavailable() {
    let provider = Arc::new(FixedPriceProvider::new(vec![100.0, 101.0, 100.5, 102.0, 101.5]));
    let (service, store) = service_with(provider, mock_headlines());

    let result = service.forecast("AAPL", 1).await;
    assert!(matches!(result, Err(AppError::DataUnavailable(_))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unusable_closes_do_not_count_towards_minimum() {
    let mut closes = vec![f64::NAN, -5.0, 0.0];
    closes.extend(trending_closes(8));
    let provider = Arc::new(FixedPriceProvider::new(closes));
    let (service, _) = service_with(provider, mock_headlines());

    assert!(matches!(service.forecast("AAPL", 2).await, Err(AppError::DataUnavailable(_))));
}

#[tokio::test]
async fn test_transport_failure_is_reported_as_missing_data() {
    let (service, _) = service_with(Arc::new(BrokenPriceProvider), mock_headlines());

    let result = service.forecast("AAPL", 3).await;
    assert!(matches!(result, Err(AppError::DataUnavailable(msg)) if msg.contains("AAPL")));
}

#[tokio::test]
async fn test_zigzag_history_stays_within_short_horizon_clamp() {
    let closes = vec![100.0, 101.0, 99.0, 102.0, 98.0, 103.0, 97.0, 104.0, 96.0, 105.0];
    let provider = Arc::new(FixedPriceProvider::new(closes));
    let (service, _) = service_with(provider, mock_headlines());

    let bundle = service.forecast("ZIG", 3).await.unwrap();
    let prediction = &bundle.prediction;

    assert_eq!(prediction.current_price, 105.0);
    assert!(prediction.predicted_price.is_finite());
    assert!(prediction.predicted_price >= 105.0 * 0.88 && prediction.predicted_price <= 105.0 * 1.12);
    assert!((35..=75).contains(&prediction.confidence));
    assert!(bundle.model_info.method_used.is_short_horizon_tag());
    assert_eq!(bundle.historical_data.len(), 10);
}

#[tokio::test]
async fn test_flat_history_uses_trend_fallback() {
    let provider = Arc::new(FixedPriceProvider::new(vec![50.0; 60]));
    let (service, _) = service_with(provider, mock_headlines());

    let bundle = service.forecast("FLAT", 10).await.unwrap();

    assert_eq!(bundle.model_info.method_used, ForecastMethod::TrendFallback);
    assert_eq!(bundle.prediction.predicted_price, 50.0);
    assert_eq!(bundle.prediction.confidence, 40);
    assert_eq!(bundle.prediction.trend, Trend::Downtrend);
    assert_eq!(bundle.prediction.price_change, 0.0);
}

#[tokio::test]
async fn test_bundle_timeline_is_anchored_and_bounded() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(90)));
    let (service, _) = service_with(provider, mock_headlines());

    for days in [1, 5, 10, 30] {
        let bundle = service.forecast("AAPL", days).await.unwrap();
        let current = bundle.prediction.current_price;
        let timeline = &bundle.prediction_timeline;

        assert_eq!(timeline[0].day, 0);
        assert_eq!(timeline[0].price, current);
        assert_eq!(timeline[0].label, "Today");
        assert!(timeline.len() <= days as usize + 1);
        assert!(timeline[1..].iter().all(|p| p.is_trading_day));
        assert!(timeline
            .iter()
            .all(|p| p.price >= current * 0.5 && p.price <= current * 2.0));
        assert!(timeline.windows(2).all(|w| w[0].day < w[1].day && w[0].date < w[1].date));
    }

    // a 10 trading day walk always fits in 30 calendar days
    let bundle = service.forecast("AAPL", 10).await.unwrap();
    assert_eq!(bundle.prediction_timeline.len(), 11);
    assert_eq!(bundle.prediction_timeline[10].label, "+10d");
}

#[tokio::test]
async fn test_historical_data_is_trimmed_to_chart_timeframe() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(200)));
    let (service, _) = service_with(provider, mock_headlines());

    for days in [2, 7, 20, 60] {
        let bundle = service.forecast("AAPL", days).await.unwrap();
        let expected = (chart_timeframe(days as u32) as usize).min(200);

        assert_eq!(bundle.historical_data.len(), expected);
        assert_eq!(bundle.chart_info.timeframe_days, chart_timeframe(days as u32));
        // the tail of the history is kept
        let last = bundle.historical_data.last().unwrap();
        assert_eq!(last.price, bundle.prediction.current_price);
    }
}

#[tokio::test]
async fn test_forecasts_are_recorded_newest_first() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(60)));
    let (service, store) = service_with(provider, mock_headlines());

    service.forecast("AAPL", 1).await.unwrap();
    service.forecast("MSFT", 2).await.unwrap();
    service.forecast("aapl", 3).await.unwrap();

    assert_eq!(store.len(), 3);

    let all = service.recent_predictions(None, 10);
    let days: Vec<u32> = all.iter().map(|r| r.days_ahead).collect();
    assert_eq!(days, vec![3, 2, 1]);

    let aapl = store.recent(Some("AAPL"), 10);
    assert_eq!(aapl.len(), 2);
    assert!(aapl.iter().all(|r| r.symbol == "AAPL"));
}

#[tokio::test]
async fn test_sentiment_failure_is_neutral() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(40)));
    let (service, _) = service_with(provider, Arc::new(BrokenNewsProvider));

    let bundle = service.forecast("AAPL", 2).await.unwrap();
    assert_eq!(bundle.prediction.sentiment, Sentiment::Neutral);
    assert!(bundle.prediction.sentiment_reason.contains("No sentiment data"));
}

#[tokio::test]
async fn test_mock_headlines_are_neutral_overall() {
    let provider = Arc::new(FixedPriceProvider::new(trending_closes(40)));
    let (service, _) = service_with(provider, mock_headlines());

    let bundle = service.forecast("AAPL", 2).await.unwrap();
    assert_eq!(bundle.prediction.sentiment, Sentiment::Neutral);
    assert!(bundle.prediction.sentiment_reason.contains("3 headlines"));
}
