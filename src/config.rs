use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::services::short_horizon_service::ShortHorizonConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR '{0}'")]
    BindAddr(String),
    #[error("invalid PRICE_PROVIDER '{0}'. Must be 'yahoo' or 'mock'")]
    PriceProvider(String),
    #[error("invalid ARIMA_TIME_BUDGET_SECS '{0}'")]
    TimeBudget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceProviderKind {
    Yahoo,
    Mock,
}

impl PriceProviderKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "yahoo" => Ok(PriceProviderKind::Yahoo),
            "mock" => Ok(PriceProviderKind::Mock),
            _ => Err(ConfigError::PriceProvider(value.to_string())),
        }
    }
}

/// Settings for the HTTP service and the forecasting pipeline.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub price_provider: PriceProviderKind,
    pub arima_time_budget: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            price_provider: PriceProviderKind::Yahoo,
            arima_time_budget: ShortHorizonConfig::default().time_budget,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::BindAddr(raw))?,
            None => defaults.bind_addr,
        };

        let price_provider = match lookup("PRICE_PROVIDER") {
            Some(raw) => PriceProviderKind::parse(&raw)?,
            None => defaults.price_provider,
        };

        let arima_time_budget = match lookup("ARIMA_TIME_BUDGET_SECS") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64)
                .ok_or(ConfigError::TimeBudget(raw))?,
            None => defaults.arima_time_budget,
        };

        Ok(Self {
            bind_addr,
            price_provider,
            arima_time_budget,
        })
    }

    pub fn short_horizon(&self) -> ShortHorizonConfig {
        ShortHorizonConfig {
            time_budget: self.arima_time_budget,
            ..ShortHorizonConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.price_provider, PriceProviderKind::Yahoo);
        assert_eq!(config.arima_time_budget, Duration::from_millis(4500));
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("PRICE_PROVIDER", "Mock"),
            ("ARIMA_TIME_BUDGET_SECS", "2.5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.price_provider, PriceProviderKind::Mock);
        assert_eq!(config.short_horizon().time_budget, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("PRICE_PROVIDER", "bloomberg")])),
            Err(ConfigError::PriceProvider(_))
        ));
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("ARIMA_TIME_BUDGET_SECS", "-1")])),
            Err(ConfigError::TimeBudget(_))
        ));
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])),
            Err(ConfigError::BindAddr(_))
        ));
    }
}
