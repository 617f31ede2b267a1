use crate::entities::{analysis_results, image_uploads, prelude::*};
use crate::error::Result;
use crate::utils::validation::window_start;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

/// Rolling-window aggregates over the upload and analysis ledgers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InspectionMetrics {
    pub window_days: i64,
    pub total_images: u64,
    pub total_analyses: u64,
    /// `None` when the window holds no analyses.
    pub avg_confidence: Option<f64>,
    pub unique_analyzers: u64,
    /// Days with at least one upload or analysis.
    pub active_days: u64,
    pub total_storage_bytes: i64,
    pub total_issues: u64,
    pub total_recommendations: u64,
}

#[derive(Debug, Clone)]
pub struct UploadFact {
    pub upload_id: String,
    pub file_size: i64,
    pub upload_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnalysisFact {
    pub analysis_id: String,
    pub confidence_score: f64,
    pub analyzer: String,
    pub analysis_time: DateTime<Utc>,
    pub issue_count: usize,
    pub recommendation_count: usize,
}

fn array_len(value: &serde_json::Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

/// Folds window rows into the metrics. Never fails, including on no rows.
pub fn compute(window_days: i64, uploads: &[UploadFact], analyses: &[AnalysisFact]) -> InspectionMetrics {
    let upload_ids: HashSet<&str> = uploads.iter().map(|u| u.upload_id.as_str()).collect();
    let analysis_ids: HashSet<&str> = analyses.iter().map(|a| a.analysis_id.as_str()).collect();
    let analyzers: HashSet<&str> = analyses.iter().map(|a| a.analyzer.as_str()).collect();

    let days: HashSet<NaiveDate> = uploads
        .iter()
        .map(|u| u.upload_time.date_naive())
        .chain(analyses.iter().map(|a| a.analysis_time.date_naive()))
        .collect();

    let avg_confidence = if analyses.is_empty() {
        None
    } else {
        Some(analyses.iter().map(|a| a.confidence_score).sum::<f64>() / analyses.len() as f64)
    };

    InspectionMetrics {
        window_days,
        total_images: upload_ids.len() as u64,
        total_analyses: analysis_ids.len() as u64,
        avg_confidence,
        unique_analyzers: analyzers.len() as u64,
        active_days: days.len() as u64,
        total_storage_bytes: uploads.iter().map(|u| u.file_size).sum(),
        total_issues: analyses.iter().map(|a| a.issue_count as u64).sum(),
        total_recommendations: analyses.iter().map(|a| a.recommendation_count as u64).sum(),
    }
}

pub struct MetricsService;

impl MetricsService {
    /// Recomputed on every call over `[now - window_days, now]`.
    pub async fn metrics(db: &DatabaseConnection, window_days: i64) -> Result<InspectionMetrics> {
        Self::metrics_at(db, window_days, Utc::now()).await
    }

    pub async fn metrics_at(
        db: &DatabaseConnection,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<InspectionMetrics> {
        let since = window_start(now, window_days)?;

        let uploads: Vec<(String, i64, DateTime<Utc>)> = ImageUploads::find()
            .select_only()
            .column(image_uploads::Column::UploadId)
            .column(image_uploads::Column::FileSize)
            .column(image_uploads::Column::UploadTime)
            .filter(image_uploads::Column::UploadTime.gte(since))
            .filter(image_uploads::Column::UploadTime.lte(now))
            .into_tuple()
            .all(db)
            .await?;

        let analyses: Vec<(String, f64, String, DateTime<Utc>, serde_json::Value, serde_json::Value)> =
            AnalysisResults::find()
                .select_only()
                .column(analysis_results::Column::AnalysisId)
                .column(analysis_results::Column::ConfidenceScore)
                .column(analysis_results::Column::Analyzer)
                .column(analysis_results::Column::AnalysisTime)
                .column(analysis_results::Column::DetectedIssues)
                .column(analysis_results::Column::Recommendations)
                .filter(analysis_results::Column::AnalysisTime.gte(since))
                .filter(analysis_results::Column::AnalysisTime.lte(now))
                .into_tuple()
                .all(db)
                .await?;

        let uploads: Vec<UploadFact> = uploads
            .into_iter()
            .map(|(upload_id, file_size, upload_time)| UploadFact {
                upload_id,
                file_size,
                upload_time,
            })
            .collect();
        let analyses: Vec<AnalysisFact> = analyses
            .into_iter()
            .map(|(analysis_id, confidence_score, analyzer, analysis_time, issues, recs)| AnalysisFact {
                analysis_id,
                confidence_score,
                analyzer,
                analysis_time,
                issue_count: array_len(&issues),
                recommendation_count: array_len(&recs),
            })
            .collect();

        Ok(compute(window_days, &uploads, &analyses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_zero_rows_give_zero_counts_and_no_average() {
        let m = compute(30, &[], &[]);
        assert_eq!(m.total_images, 0);
        assert_eq!(m.total_analyses, 0);
        assert_eq!(m.avg_confidence, None);
        assert_eq!(m.active_days, 0);
        assert_eq!(m.total_storage_bytes, 0);
    }

    #[test]
    fn test_aggregates() {
        let uploads = vec![
            UploadFact { upload_id: "IMG_1".into(), file_size: 100, upload_time: at(1, 9) },
            UploadFact { upload_id: "IMG_2".into(), file_size: 50, upload_time: at(1, 17) },
        ];
        let analyses = vec![
            AnalysisFact {
                analysis_id: "ANA_1".into(),
                confidence_score: 0.9,
                analyzer: "alice".into(),
                analysis_time: at(2, 8),
                issue_count: 2,
                recommendation_count: 1,
            },
            AnalysisFact {
                analysis_id: "ANA_2".into(),
                confidence_score: 0.5,
                analyzer: "alice".into(),
                analysis_time: at(3, 8),
                issue_count: 1,
                recommendation_count: 3,
            },
        ];

        let m = compute(30, &uploads, &analyses);
        assert_eq!(m.total_images, 2);
        assert_eq!(m.total_analyses, 2);
        assert!((m.avg_confidence.unwrap() - 0.7).abs() < 1e-9);
        assert_eq!(m.unique_analyzers, 1);
        assert_eq!(m.active_days, 3);
        assert_eq!(m.total_storage_bytes, 150);
        assert_eq!(m.total_issues, 3);
        assert_eq!(m.total_recommendations, 4);
    }
}
