//! Stock price forecasting service.
//!
//! `services::prediction_service::PredictionService` is the entry point: it
//! fetches history, routes the horizon to the ARIMA or random-forest
//! forecaster, and assembles a `PredictionBundle` with sentiment, volatility
//! and a synthesized day-by-day timeline. `app::create_app` exposes it over HTTP.

pub mod app;
pub mod config;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
