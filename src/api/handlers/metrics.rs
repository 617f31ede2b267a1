use crate::AppState;
use crate::api::error::AppError;
use crate::services::metrics::{InspectionMetrics, MetricsService};
use crate::services::reconciliation::{ReconciliationRow, ReconciliationService};
use crate::services::upload_ledger::UploadFilter;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct MetricsQuery {
    /// Rolling window in days, 0 to 36500 (default from configuration)
    pub window_days: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/metrics",
    params(MetricsQuery),
    responses(
        (status = 200, description = "Rolling-window inspection metrics", body = InspectionMetrics),
        (status = 422, description = "Window outside 0..=36500 days")
    ),
    tag = "views"
)]
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<InspectionMetrics>, AppError> {
    let window = query.window_days.unwrap_or(state.config.metrics_window_days);
    Ok(Json(MetricsService::metrics(&state.db, window).await?))
}

#[utoipa::path(
    get,
    path = "/reconciliation",
    params(UploadFilter),
    responses(
        (status = 200, description = "Effective storage per upload", body = Vec<ReconciliationRow>)
    ),
    tag = "views"
)]
pub async fn get_reconciliation(
    State(state): State<AppState>,
    Query(filter): Query<UploadFilter>,
) -> Result<Json<Vec<ReconciliationRow>>, AppError> {
    let rows = ReconciliationService::reconcile(&state.db, state.uploads.ledger(), &filter).await?;
    Ok(Json(rows))
}
