use crate::AppState;
use crate::api::error::AppError;
use crate::entities::{image_uploads, stage_file_data};
use crate::models::SessionContext;
use crate::services::upload_ledger::UploadFilter;
use crate::services::upload_service::{IncomingFile, UploadItem};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub upload_id: String,
    pub filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub upload_time: DateTime<Utc>,
    pub stage_path: String,
    pub file_type: String,
    pub image_width: Option<i32>,
    pub image_height: Option<i32>,
    pub uploaded_by: String,
    pub status: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

impl From<image_uploads::Model> for UploadResponse {
    fn from(m: image_uploads::Model) -> Self {
        Self {
            upload_id: m.upload_id,
            filename: m.filename,
            original_name: m.original_name,
            file_size: m.file_size,
            upload_time: m.upload_time,
            stage_path: m.stage_path,
            file_type: m.file_type,
            image_width: m.image_width,
            image_height: m.image_height,
            uploaded_by: m.uploaded_by,
            status: m.status,
            metadata: m.metadata,
        }
    }
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content = Multipart, description = "One or more image files"),
    responses(
        (status = 200, description = "Per-file upload results", body = Vec<UploadItem>),
        (status = 400, description = "Malformed multipart body")
    ),
    tag = "uploads"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    ctx: SessionContext,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadItem>>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let Some(original_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read '{}': {}", original_name, e)))?;

        files.push(IncomingFile {
            original_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("no file fields in request".to_string()));
    }

    Ok(Json(state.uploads.upload_many(&ctx, files).await))
}

#[utoipa::path(
    get,
    path = "/uploads",
    params(UploadFilter),
    responses(
        (status = 200, description = "Uploads, newest first", body = Vec<UploadResponse>)
    ),
    tag = "uploads"
)]
pub async fn list_uploads(
    State(state): State<AppState>,
    Query(filter): Query<UploadFilter>,
) -> Result<Json<Vec<UploadResponse>>, AppError> {
    let rows = state.uploads.ledger().list_uploads(&filter).await?;
    Ok(Json(rows.into_iter().map(UploadResponse::from).collect()))
}

/// One stored version of an upload's file.
#[derive(Serialize, ToSchema)]
pub struct FileVersionResponse {
    pub file_id: String,
    pub file_size: i64,
    pub file_type: String,
    pub storage_type: String,
    pub status: String,
    pub chunk_count: i32,
    pub upload_time: DateTime<Utc>,
}

impl From<stage_file_data::Model> for FileVersionResponse {
    fn from(m: stage_file_data::Model) -> Self {
        Self {
            file_id: m.file_id,
            file_size: m.file_size,
            file_type: m.file_type,
            storage_type: m.storage_type,
            status: m.status,
            chunk_count: m.chunk_count,
            upload_time: m.upload_time,
        }
    }
}

#[utoipa::path(
    get,
    path = "/uploads/{id}",
    params(("id" = String, Path, description = "Upload ID")),
    responses(
        (status = 200, description = "Upload record", body = UploadResponse),
        (status = 404, description = "Unknown upload")
    ),
    tag = "uploads"
)]
pub async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UploadResponse>, AppError> {
    let row = state.uploads.ledger().get_upload(&id).await?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    get,
    path = "/uploads/{id}/versions",
    params(("id" = String, Path, description = "Upload ID")),
    responses(
        (status = 200, description = "File versions behind the upload, newest first", body = Vec<FileVersionResponse>),
        (status = 404, description = "Unknown upload")
    ),
    tag = "uploads"
)]
pub async fn list_file_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FileVersionResponse>>, AppError> {
    let upload = state.uploads.ledger().get_upload(&id).await?;
    let versions = state.binary.registry().versions(&upload.filename).await?;
    Ok(Json(versions.into_iter().map(FileVersionResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/uploads/{id}/content",
    params(("id" = String, Path, description = "Upload ID")),
    responses(
        (status = 200, description = "Stored image bytes"),
        (status = 404, description = "Unknown upload or bytes no longer available"),
        (status = 500, description = "Stored chunks are corrupt")
    ),
    tag = "uploads"
)]
pub async fn get_upload_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (bytes, file_type) = state.uploads.content(&id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, file_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/uploads/{id}",
    params(("id" = String, Path, description = "Upload ID")),
    responses(
        (status = 204, description = "Upload deleted"),
        (status = 404, description = "Unknown upload"),
        (status = 409, description = "Analyses, report links or chats still reference the upload")
    ),
    tag = "uploads"
)]
pub async fn delete_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.uploads.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
