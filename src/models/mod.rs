mod price_point;
mod trading;
mod volatility;
pub mod forecast;
pub mod news;
pub mod sentiment;

pub use price_point::{CurrentPriceSnapshot, HistoryPeriod, PriceHistory, PricePoint};
pub use trading::{TimelinePoint, TradingInfo};
pub use volatility::VolatilityClass;
pub use forecast::{
    ArimaOrder, ChartInfo, ForecastMethod, ForecastStrategy, ModelInfo, ModelParams,
    Prediction, PredictionBundle, PredictionRecord, PredictionRequest, PredictionResult, Trend,
};
pub use news::Headline;
pub use sentiment::{Sentiment, SentimentReport};
