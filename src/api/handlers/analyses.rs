use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ConfidenceLevel, SessionContext};
use crate::services::analysis::BatchItem;
use crate::services::analysis_ledger::{AnalysisEntry, string_list};
use crate::services::export;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 50))]
    pub upload_ids: Vec<String>,
    #[validate(length(min = 1, max = 4000))]
    pub prompt: String,
    /// Overrides the session model
    pub model: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListAnalysesQuery {
    /// Maximum rows (default 100)
    pub limit: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub analysis_id: String,
    pub upload_id: String,
    pub filename: String,
    pub original_name: Option<String>,
    pub analysis_prompt: String,
    pub analysis_result: String,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub detected_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub analysis_time: DateTime<Utc>,
    pub analyzer: String,
    pub processing_time_ms: i64,
    pub model_used: String,
}

impl From<AnalysisEntry> for AnalysisResponse {
    fn from(entry: AnalysisEntry) -> Self {
        let confidence_level = entry.confidence_level();
        let a = entry.analysis;
        Self {
            analysis_id: a.analysis_id,
            upload_id: a.upload_id,
            filename: a.filename,
            original_name: entry.upload.map(|u| u.original_name),
            analysis_prompt: a.analysis_prompt,
            analysis_result: a.analysis_result,
            confidence_score: a.confidence_score,
            confidence_level,
            detected_issues: string_list(&a.detected_issues),
            recommendations: string_list(&a.recommendations),
            analysis_time: a.analysis_time,
            analyzer: a.analyzer,
            processing_time_ms: a.processing_time_ms,
            model_used: a.model_used,
        }
    }
}

#[utoipa::path(
    post,
    path = "/analyses",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Per-upload analysis results", body = Vec<BatchItem>),
        (status = 422, description = "Invalid request or model not allowed")
    ),
    tag = "analyses"
)]
pub async fn analyze_uploads(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Vec<BatchItem>>, AppError> {
    req.validate()
        .map_err(|e| AppError::Unprocessable(e.to_string()))?;

    let ctx = match req.model {
        Some(model) => ctx.with_model(model),
        None => ctx,
    };
    let items = state.analysis.analyze_batch(&ctx, &req.upload_ids, &req.prompt).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/analyses",
    params(ListAnalysesQuery),
    responses(
        (status = 200, description = "Analyses joined with uploads, newest first", body = Vec<AnalysisResponse>)
    ),
    tag = "analyses"
)]
pub async fn list_analyses(
    State(state): State<AppState>,
    Query(query): Query<ListAnalysesQuery>,
) -> Result<Json<Vec<AnalysisResponse>>, AppError> {
    let entries = state.analyses.list_analyses(query.limit).await?;
    Ok(Json(entries.into_iter().map(AnalysisResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/uploads/{id}/analyses",
    params(("id" = String, Path, description = "Upload ID")),
    responses(
        (status = 200, description = "Analyses of one upload, newest first", body = Vec<AnalysisResponse>),
        (status = 404, description = "Unknown upload")
    ),
    tag = "analyses"
)]
pub async fn list_upload_analyses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnalysisResponse>>, AppError> {
    let upload = state.uploads.ledger().get_upload(&id).await?;
    let analyses = state.analyses.analyses_for_upload(&id).await?;
    Ok(Json(
        analyses
            .into_iter()
            .map(|analysis| {
                AnalysisResponse::from(AnalysisEntry {
                    analysis,
                    upload: Some(upload.clone()),
                })
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/analyses/export",
    params(ListAnalysesQuery),
    responses(
        (status = 200, description = "CSV export of analyses", content_type = "text/csv")
    ),
    tag = "analyses"
)]
pub async fn export_analyses(
    State(state): State<AppState>,
    Query(query): Query<ListAnalysesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let csv = export::export_analyses(&state.analyses, query.limit).await?;
    let filename = format!("inspection_analyses_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    ))
}
