use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{health, predict, predictions, prices};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/predict", predict::router())
        .nest("/api/prices", prices::router())
        .nest("/api/predictions", predictions::router())
        .layer(cors)
        .with_state(state)
}
