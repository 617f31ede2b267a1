use crate::entities::{analysis_results, image_uploads, prelude::*};
use crate::error::{LedgerError, Result};
use crate::models::{ConfidenceLevel, SessionContext};
use crate::utils::ids::{ANALYSIS_PREFIX, new_id};
use crate::utils::validation::validate_confidence;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

/// Default page size of the joined analysis listing.
pub const DEFAULT_LIST_LIMIT: u64 = 100;

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub upload_id: String,
    /// Stored filename; taken from the upload when absent.
    pub filename: Option<String>,
    pub prompt: String,
    pub result_text: String,
    pub confidence: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub duration_ms: i64,
    pub model_id: String,
    pub metadata: serde_json::Value,
}

impl NewAnalysis {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        upload_id: impl Into<String>,
        prompt: impl Into<String>,
        result_text: impl Into<String>,
        confidence: f64,
        issues: Vec<String>,
        recommendations: Vec<String>,
        duration_ms: i64,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            filename: None,
            prompt: prompt.into(),
            result_text: result_text.into(),
            confidence,
            issues,
            recommendations,
            duration_ms,
            model_id: model_id.into(),
            metadata: serde_json::json!({}),
        }
    }
}

/// An analysis together with the upload it belongs to.
#[derive(Debug, Clone)]
pub struct AnalysisEntry {
    pub analysis: analysis_results::Model,
    pub upload: Option<image_uploads::Model>,
}

impl AnalysisEntry {
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.analysis.confidence_score)
    }
}

/// Reads a JSON array column back into strings, skipping non-string items.
pub fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct AnalysisLedger {
    db: DatabaseConnection,
}

impl AnalysisLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends an immutable analysis row.
    ///
    /// Scores outside [0, 1] are rejected before any write. A missing upload
    /// surfaces as the foreign key violation raised by the database.
    pub async fn record_analysis(&self, ctx: &SessionContext, new: NewAnalysis) -> Result<String> {
        validate_confidence(new.confidence)?;
        if new.duration_ms < 0 {
            return Err(LedgerError::DataQualityViolation(format!(
                "processing time {} ms is negative",
                new.duration_ms
            )));
        }

        let filename = match new.filename {
            Some(f) => f,
            None => ImageUploads::find_by_id(&new.upload_id)
                .one(&self.db)
                .await?
                .map(|u| u.filename)
                .unwrap_or_default(),
        };

        let analysis_id = new_id(ANALYSIS_PREFIX);
        analysis_results::ActiveModel {
            analysis_id: Set(analysis_id.clone()),
            upload_id: Set(new.upload_id.clone()),
            filename: Set(filename),
            analysis_prompt: Set(new.prompt),
            analysis_result: Set(new.result_text),
            confidence_score: Set(new.confidence),
            detected_issues: Set(serde_json::json!(new.issues)),
            recommendations: Set(serde_json::json!(new.recommendations)),
            analysis_time: Set(Utc::now()),
            analyzer: Set(ctx.user.clone()),
            processing_time_ms: Set(new.duration_ms),
            model_used: Set(new.model_id),
            metadata: Set(new.metadata),
        }
        .insert(&self.db)
        .await?;

        info!(
            "🔍 Recorded analysis {} for upload {} (confidence {:.2}, {})",
            analysis_id,
            new.upload_id,
            new.confidence,
            ConfidenceLevel::from_score(new.confidence)
        );
        Ok(analysis_id)
    }

    pub async fn get_analysis(&self, analysis_id: &str) -> Result<analysis_results::Model> {
        AnalysisResults::find_by_id(analysis_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("analysis", analysis_id))
    }

    /// Analyses joined with their uploads, newest first.
    pub async fn list_analyses(&self, limit: Option<u64>) -> Result<Vec<AnalysisEntry>> {
        let rows = AnalysisResults::find()
            .find_also_related(ImageUploads)
            .order_by_desc(analysis_results::Column::AnalysisTime)
            .order_by_desc(analysis_results::Column::AnalysisId)
            .limit(limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(analysis, upload)| AnalysisEntry { analysis, upload })
            .collect())
    }

    /// Every analysis of one upload, newest first.
    pub async fn analyses_for_upload(&self, upload_id: &str) -> Result<Vec<analysis_results::Model>> {
        Ok(AnalysisResults::find()
            .filter(analysis_results::Column::UploadId.eq(upload_id))
            .order_by_desc(analysis_results::Column::AnalysisTime)
            .order_by_desc(analysis_results::Column::AnalysisId)
            .all(&self.db)
            .await?)
    }

    pub async fn latest_for_upload(&self, upload_id: &str) -> Result<Option<analysis_results::Model>> {
        latest_analysis(&self.db, upload_id).await
    }
}

/// Newest analysis of one upload; usable inside a caller's transaction.
pub async fn latest_analysis<C: ConnectionTrait>(
    conn: &C,
    upload_id: &str,
) -> Result<Option<analysis_results::Model>> {
    Ok(AnalysisResults::find()
        .filter(analysis_results::Column::UploadId.eq(upload_id))
        .order_by_desc(analysis_results::Column::AnalysisTime)
        .order_by_desc(analysis_results::Column::AnalysisId)
        .one(conn)
        .await?)
}
