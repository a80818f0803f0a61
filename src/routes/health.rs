use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub webhook: &'static str,
    pub health: &'static str,
}

pub async fn index() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Duet Dating App Messenger Bot",
        status: "Running",
        endpoints: Endpoints {
            webhook: "/webhook",
            health: "/health",
        },
    })
}
