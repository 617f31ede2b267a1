use crate::entities::{analysis_results, inspection_reports, prelude::*, report_images};
use crate::error::{LedgerError, Result};
use crate::models::{ReportPriority, ReportStatus, SessionContext};
use crate::services::analysis_ledger::{latest_analysis, string_list};
use crate::utils::ids::{LINK_PREFIX, REPORT_PREFIX, new_id};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 255))]
    pub report_name: String,
    pub inspection_date: Option<NaiveDate>,
    /// Defaults to the session user
    pub inspector: Option<String>,
    pub building_address: Option<String>,
    pub building_type: Option<String>,
    pub inspection_type: Option<String>,
    pub priority: Option<ReportPriority>,
    pub summary: Option<String>,
    /// Uploads to bundle, in report order
    #[serde(default)]
    pub upload_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportDetail {
    #[schema(value_type = Object)]
    pub report: inspection_reports::Model,
    #[schema(value_type = Vec<Object>)]
    pub images: Vec<report_images::Model>,
}

#[derive(Clone)]
pub struct ReportService {
    db: DatabaseConnection,
}

impl ReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a DRAFT report and links every upload with its latest
    /// analysis. Nothing is written if any upload is unknown.
    pub async fn create(&self, ctx: &SessionContext, req: CreateReportRequest) -> Result<ReportDetail> {
        req.validate()
            .map_err(|e| LedgerError::DataQualityViolation(e.to_string()))?;

        let now = Utc::now();
        let report_id = new_id(REPORT_PREFIX);
        let txn = self.db.begin().await?;

        inspection_reports::ActiveModel {
            report_id: Set(report_id.clone()),
            report_name: Set(req.report_name),
            inspection_date: Set(req.inspection_date.unwrap_or_else(|| now.date_naive())),
            inspector: Set(req.inspector.unwrap_or_else(|| ctx.user.clone())),
            building_address: Set(req.building_address),
            building_type: Set(req.building_type),
            inspection_type: Set(req.inspection_type),
            overall_status: Set(ReportStatus::Draft.as_str().to_string()),
            priority: Set(req.priority.unwrap_or(ReportPriority::Medium).as_str().to_string()),
            total_images: Set(0),
            total_issues: Set(0),
            avg_confidence: Set(None),
            summary: Set(req.summary),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (order, upload_id) in req.upload_ids.iter().enumerate() {
            insert_link(&txn, &report_id, upload_id, order as i32, None).await?;
        }
        recompute(&txn, &report_id).await?;
        txn.commit().await?;

        info!("📋 Created report {} with {} images", report_id, req.upload_ids.len());
        self.get(&report_id).await
    }

    pub async fn get(&self, report_id: &str) -> Result<ReportDetail> {
        let report = InspectionReports::find_by_id(report_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("report", report_id))?;
        let images = ReportImages::find()
            .filter(report_images::Column::ReportId.eq(report_id))
            .order_by_asc(report_images::Column::ImageOrder)
            .all(&self.db)
            .await?;
        Ok(ReportDetail { report, images })
    }

    /// Appends an upload to the end of a report.
    pub async fn add_image(&self, report_id: &str, upload_id: &str, notes: Option<String>) -> Result<ReportDetail> {
        let txn = self.db.begin().await?;
        InspectionReports::find_by_id(report_id)
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("report", report_id))?;

        let next_order = ReportImages::find()
            .filter(report_images::Column::ReportId.eq(report_id))
            .order_by_desc(report_images::Column::ImageOrder)
            .one(&txn)
            .await?
            .map(|l| l.image_order + 1)
            .unwrap_or(0);

        insert_link(&txn, report_id, upload_id, next_order, notes).await?;
        recompute(&txn, report_id).await?;
        txn.commit().await?;

        self.get(report_id).await
    }

    pub async fn remove_image(&self, report_id: &str, link_id: &str) -> Result<ReportDetail> {
        let txn = self.db.begin().await?;
        let res = ReportImages::delete_many()
            .filter(report_images::Column::LinkId.eq(link_id))
            .filter(report_images::Column::ReportId.eq(report_id))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(LedgerError::not_found("report image", link_id));
        }
        recompute(&txn, report_id).await?;
        txn.commit().await?;

        self.get(report_id).await
    }

    pub async fn set_status(&self, report_id: &str, status: ReportStatus) -> Result<ReportDetail> {
        let report = InspectionReports::find_by_id(report_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("report", report_id))?;
        let mut active: inspection_reports::ActiveModel = report.into();
        active.overall_status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;

        info!("📋 Report {} is now {}", report_id, status);
        self.get(report_id).await
    }
}

async fn insert_link<C: ConnectionTrait>(
    conn: &C,
    report_id: &str,
    upload_id: &str,
    order: i32,
    notes: Option<String>,
) -> Result<()> {
    let latest = latest_analysis(conn, upload_id).await?;

    report_images::ActiveModel {
        link_id: Set(new_id(LINK_PREFIX)),
        report_id: Set(report_id.to_string()),
        upload_id: Set(upload_id.to_string()),
        analysis_id: Set(latest.map(|a| a.analysis_id)),
        image_order: Set(order),
        include_in_report: Set(true),
        notes: Set(notes),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Refreshes image and issue counts and the mean confidence of the linked
/// analyses. A report with no analysed images has no average.
pub async fn recompute<C: ConnectionTrait>(conn: &C, report_id: &str) -> Result<()> {
    let links = ReportImages::find()
        .filter(report_images::Column::ReportId.eq(report_id))
        .filter(report_images::Column::IncludeInReport.eq(true))
        .all(conn)
        .await?;

    let analysis_ids: Vec<String> = links.iter().filter_map(|l| l.analysis_id.clone()).collect();
    let analyses = if analysis_ids.is_empty() {
        Vec::new()
    } else {
        AnalysisResults::find()
            .filter(analysis_results::Column::AnalysisId.is_in(analysis_ids))
            .all(conn)
            .await?
    };

    let total_issues: usize = analyses.iter().map(|a| string_list(&a.detected_issues).len()).sum();
    let avg_confidence = if analyses.is_empty() {
        None
    } else {
        Some(analyses.iter().map(|a| a.confidence_score).sum::<f64>() / analyses.len() as f64)
    };

    let Some(report) = InspectionReports::find_by_id(report_id).one(conn).await? else {
        return Ok(());
    };
    let mut active: inspection_reports::ActiveModel = report.into();
    active.total_images = Set(links.len() as i32);
    active.total_issues = Set(total_issues as i32);
    active.avg_confidence = Set(avg_confidence);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(())
}
