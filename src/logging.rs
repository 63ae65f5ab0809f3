use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,
    #[error("invalid LOKI_URL: {0}")]
    InvalidLokiUrl(String),
    #[error("failed to build Loki layer: {0}")]
    Loki(String),
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "predictify".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err(LoggingError::MissingLokiUrl);
        }
        Ok(())
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                init_with_loki(&config, &loki_url)?;
                tracing::info!("📊 Logging to console and Loki at {}", loki_url);
                return Ok(());
            }
        }
    }

    init_console_only(&config)?;
    tracing::info!("📊 Console-only logging initialized ({})", config.environment);
    Ok(())
}

fn init_console_only(config: &LoggingConfig) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> Result<(), LoggingError> {
    let url = url::Url::parse(loki_url).map_err(|e| LoggingError::InvalidLokiUrl(e.to_string()))?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| LoggingError::Loki(e.to_string()))?;

    // Ships buffered events to Loki in the background
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loki_enabled: bool, loki_url: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            loki_enabled,
            loki_url: loki_url.map(str::to_string),
            service_name: "predictify".to_string(),
            environment: "test".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_loki_requires_url() {
        assert!(matches!(config(true, None).validate(), Err(LoggingError::MissingLokiUrl)));
        assert!(config(true, Some("http://localhost:3100")).validate().is_ok());
        assert!(config(false, None).validate().is_ok());
    }
}
