use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

pub const WELCOME_MESSAGE: &str = "Welcome to WaafiPay API (v2) 🚀";

#[derive(Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
}

pub async fn index() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
    };

    Json(response)
}
