use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ReportStatus, SessionContext};
use crate::services::report_service::{CreateReportRequest, ReportDetail};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AddImageRequest {
    pub upload_id: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: ReportStatus,
}

#[utoipa::path(
    post,
    path = "/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportDetail),
        (status = 409, description = "An upload does not exist"),
        (status = 422, description = "Invalid report fields")
    ),
    tag = "reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportDetail>), AppError> {
    let detail = state.reports.create(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    params(("id" = String, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report with its images", body = ReportDetail),
        (status = 404, description = "Unknown report")
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportDetail>, AppError> {
    Ok(Json(state.reports.get(&id).await?))
}

#[utoipa::path(
    post,
    path = "/reports/{id}/images",
    params(("id" = String, Path, description = "Report ID")),
    request_body = AddImageRequest,
    responses(
        (status = 200, description = "Updated report", body = ReportDetail),
        (status = 404, description = "Unknown report"),
        (status = 409, description = "Unknown upload")
    ),
    tag = "reports"
)]
pub async fn add_report_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddImageRequest>,
) -> Result<Json<ReportDetail>, AppError> {
    Ok(Json(state.reports.add_image(&id, &req.upload_id, req.notes).await?))
}

#[utoipa::path(
    delete,
    path = "/reports/{id}/images/{link_id}",
    params(
        ("id" = String, Path, description = "Report ID"),
        ("link_id" = String, Path, description = "Report image link ID")
    ),
    responses(
        (status = 200, description = "Updated report", body = ReportDetail),
        (status = 404, description = "Unknown report image")
    ),
    tag = "reports"
)]
pub async fn remove_report_image(
    State(state): State<AppState>,
    Path((id, link_id)): Path<(String, String)>,
) -> Result<Json<ReportDetail>, AppError> {
    Ok(Json(state.reports.remove_image(&id, &link_id).await?))
}

#[utoipa::path(
    put,
    path = "/reports/{id}/status",
    params(("id" = String, Path, description = "Report ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated report", body = ReportDetail),
        (status = 404, description = "Unknown report")
    ),
    tag = "reports"
)]
pub async fn update_report_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ReportDetail>, AppError> {
    Ok(Json(state.reports.set_status(&id, req.status).await?))
}
