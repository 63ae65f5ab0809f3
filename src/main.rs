use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use predictify::app;
use predictify::config::{PriceProviderKind, ServiceConfig};
use predictify::external::mock::MockPriceProvider;
use predictify::external::price_provider::PriceProvider;
use predictify::external::yahoo::YahooProvider;
use predictify::logging::{self, LoggingConfig};
use predictify::services::failure_cache::FailureCache;
use predictify::services::news_service::{self, NewsConfig};
use predictify::services::prediction_service::PredictionService;
use predictify::services::prediction_store::InMemoryPredictionStore;
use predictify::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env()).context("failed to initialize logging")?;

    let config = ServiceConfig::from_env().context("invalid service configuration")?;

    let price_provider: Arc<dyn PriceProvider> = match config.price_provider {
        PriceProviderKind::Yahoo => {
            tracing::info!("📊 Using price provider: Yahoo Finance");
            Arc::new(YahooProvider::new())
        }
        PriceProviderKind::Mock => {
            tracing::info!("📊 Using price provider: offline mock");
            Arc::new(MockPriceProvider::new())
        }
    };
    let news_provider = news_service::build_news_provider(&NewsConfig::from_env());

    let predictions = PredictionService::new(
        price_provider,
        news_provider,
        Arc::new(InMemoryPredictionStore::new()),
        FailureCache::new(),
        config.short_horizon(),
    );
    let app = app::create_app(AppState::new(predictions));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Predictify backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
