use crate::entities::{
    analysis_results, chat_history, image_uploads, prelude::*, report_images, stage_file_chunks,
    stage_file_data,
};
use crate::error::Result;
use crate::services::binary_store::BinaryStore;
use crate::services::report_service;
use crate::utils::validation::window_start;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    pub chunks: u64,
    pub files: u64,
    pub chats: u64,
    pub report_links: u64,
    pub analyses: u64,
    pub uploads: u64,
    pub stage_objects: u64,
}

pub struct RetentionService;

impl RetentionService {
    pub async fn purge_older_than_days(
        db: &DatabaseConnection,
        binary: &BinaryStore,
        days: i64,
    ) -> Result<RetentionReport> {
        let cutoff = window_start(Utc::now(), days)?;
        Self::purge(db, binary, cutoff).await
    }

    /// Removes every record created before `cutoff`.
    ///
    /// Children go before their parents inside one transaction: chunks, then
    /// file records; chats, report links and analyses, then uploads. Stored
    /// bytes of removed uploads are discarded afterwards on a best-effort
    /// basis.
    pub async fn purge(
        db: &DatabaseConnection,
        binary: &BinaryStore,
        cutoff: DateTime<Utc>,
    ) -> Result<RetentionReport> {
        let mut report = RetentionReport::default();
        let txn = db.begin().await?;

        let old_files: Vec<String> = StageFileData::find()
            .select_only()
            .column(stage_file_data::Column::FileId)
            .filter(stage_file_data::Column::UploadTime.lt(cutoff))
            .into_tuple()
            .all(&txn)
            .await?;

        if !old_files.is_empty() {
            report.chunks = StageFileChunks::delete_many()
                .filter(stage_file_chunks::Column::FileId.is_in(old_files.clone()))
                .exec(&txn)
                .await?
                .rows_affected;
            report.files = StageFileData::delete_many()
                .filter(stage_file_data::Column::FileId.is_in(old_files))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        let old_uploads: Vec<(String, String)> = ImageUploads::find()
            .select_only()
            .column(image_uploads::Column::UploadId)
            .column(image_uploads::Column::StagePath)
            .filter(image_uploads::Column::UploadTime.lt(cutoff))
            .into_tuple()
            .all(&txn)
            .await?;
        let upload_ids: Vec<String> = old_uploads.iter().map(|(id, _)| id.clone()).collect();

        report.chats = ChatHistory::delete_many()
            .filter(
                Condition::any()
                    .add(chat_history::Column::ChatTimestamp.lt(cutoff))
                    .add(chat_history::Column::UploadId.is_in(upload_ids.clone())),
            )
            .exec(&txn)
            .await?
            .rows_affected;

        if !upload_ids.is_empty() {
            let analysis_ids: Vec<String> = AnalysisResults::find()
                .select_only()
                .column(analysis_results::Column::AnalysisId)
                .filter(analysis_results::Column::UploadId.is_in(upload_ids.clone()))
                .into_tuple()
                .all(&txn)
                .await?;

            let link_cond = Condition::any()
                .add(report_images::Column::UploadId.is_in(upload_ids.clone()))
                .add(report_images::Column::AnalysisId.is_in(analysis_ids.clone()));
            let touched_reports: BTreeSet<String> = ReportImages::find()
                .filter(link_cond.clone())
                .all(&txn)
                .await?
                .into_iter()
                .map(|l| l.report_id)
                .collect();

            report.report_links = ReportImages::delete_many()
                .filter(link_cond)
                .exec(&txn)
                .await?
                .rows_affected;
            report.analyses = AnalysisResults::delete_many()
                .filter(analysis_results::Column::UploadId.is_in(upload_ids.clone()))
                .exec(&txn)
                .await?
                .rows_affected;
            report.uploads = ImageUploads::delete_many()
                .filter(image_uploads::Column::UploadId.is_in(upload_ids))
                .exec(&txn)
                .await?
                .rows_affected;

            for report_id in &touched_reports {
                report_service::recompute(&txn, report_id).await?;
            }
        }

        txn.commit().await?;

        for (upload_id, location) in &old_uploads {
            match binary.discard(location).await {
                Ok(()) if location.starts_with(crate::models::STAGE_PREFIX) => report.stage_objects += 1,
                Ok(()) => {}
                Err(e) => warn!("⚠️ Could not discard bytes of {} at {}: {}", upload_id, location, e),
            }
        }

        info!(
            "🧹 Retention removed {} uploads, {} analyses, {} links, {} chats, {} files, {} chunks",
            report.uploads, report.analyses, report.report_links, report.chats, report.files, report.chunks
        );
        Ok(report)
    }
}
