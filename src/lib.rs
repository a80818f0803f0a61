pub mod config;
pub mod engine;
pub mod errors;
pub mod messenger;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod store;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: config::AppConfig,
    pub engine: engine::Engine,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::health::index))
        .route("/health", get(routes::health::health_check))
        .route(
            "/webhook",
            get(routes::webhook::verify).post(routes::webhook::receive),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
