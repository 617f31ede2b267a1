use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub stage: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ModelsResponse {
    pub default_model: String,
    pub models: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    let stage_status = if state.binary.stage_available() {
        "connected"
    } else {
        "fallback"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: db_status.to_string(),
        stage: stage_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/models",
    responses(
        (status = 200, description = "Multimodal models available for analysis", body = ModelsResponse)
    ),
    tag = "system"
)]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: state.config.default_model.clone(),
        models: state.config.allowed_models.clone(),
    })
}
