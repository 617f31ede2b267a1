use crate::AppState;
use crate::api::error::AppError;
use crate::entities::chat_history;
use crate::models::SessionContext;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Stored filename of the photograph
    pub filename: String,
    pub question: String,
    pub model: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub chat_id: String,
    pub image_filename: String,
    pub upload_id: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    pub model_used: String,
    pub chat_timestamp: DateTime<Utc>,
    pub session_id: String,
    pub processing_time_ms: i64,
}

impl From<chat_history::Model> for ChatResponse {
    fn from(m: chat_history::Model) -> Self {
        Self {
            chat_id: m.chat_id,
            image_filename: m.image_filename,
            upload_id: m.upload_id,
            user_message: m.user_message,
            ai_response: m.ai_response,
            model_used: m.model_used,
            chat_timestamp: m.chat_timestamp,
            session_id: m.session_id,
            processing_time_ms: m.processing_time_ms,
        }
    }
}

#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Recorded exchange", body = ChatResponse),
        (status = 422, description = "Empty question or model not allowed")
    ),
    tag = "chat"
)]
pub async fn ask(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let ctx = match req.model {
        Some(model) => ctx.with_model(model),
        None => ctx,
    };
    let record = state.chat.ask(&ctx, &req.filename, &req.question).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/chat/{filename}",
    params(("filename" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Exchanges, oldest first", body = Vec<ChatResponse>)
    ),
    tag = "chat"
)]
pub async fn history(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let rows = state.chat.history(&filename).await?;
    Ok(Json(rows.into_iter().map(ChatResponse::from).collect()))
}
