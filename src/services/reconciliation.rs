use crate::entities::{image_uploads, prelude::*, stage_file_data};
use crate::error::Result;
use crate::models::{FileStatus, STAGE_PREFIX, StorageType};
use crate::services::upload_ledger::{UploadFilter, UploadLedger};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Effective storage of one upload.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReconciliationRow {
    pub upload_id: String,
    pub filename: String,
    pub stage_path: String,
    pub effective_storage_type: StorageType,
    pub file_id: Option<String>,
    pub file_status: Option<String>,
    pub has_binary_data: bool,
    /// Bytes live only in process memory and are lost on restart.
    pub at_risk: bool,
}

/// Picks the file version that speaks for a filename: the ACTIVE one if
/// any, otherwise the most recent.
fn representative<'a>(versions: &[&'a stage_file_data::Model]) -> Option<&'a stage_file_data::Model> {
    versions
        .iter()
        .find(|m| m.status == FileStatus::Active.as_str())
        .or_else(|| versions.iter().max_by(|a, b| {
            a.upload_time.cmp(&b.upload_time).then_with(|| a.file_id.cmp(&b.file_id))
        }))
        .copied()
}

/// Classifies one upload. A file record wins; otherwise a stage-prefixed
/// location means STAGE; anything else is MEMORY.
pub fn classify(upload: &image_uploads::Model, file: Option<&stage_file_data::Model>) -> ReconciliationRow {
    let (effective, has_binary_data) = match file {
        Some(meta) => {
            let storage = meta
                .storage_type
                .parse::<StorageType>()
                .unwrap_or(StorageType::Memory);
            (storage, storage != StorageType::Memory)
        }
        None if upload.stage_path.starts_with(STAGE_PREFIX) => (StorageType::Stage, true),
        None => (StorageType::Memory, false),
    };

    ReconciliationRow {
        upload_id: upload.upload_id.clone(),
        filename: upload.filename.clone(),
        stage_path: upload.stage_path.clone(),
        effective_storage_type: effective,
        file_id: file.map(|f| f.file_id.clone()),
        file_status: file.map(|f| f.status.clone()),
        has_binary_data,
        at_risk: effective == StorageType::Memory,
    }
}

pub struct ReconciliationService;

impl ReconciliationService {
    /// Reads both ledgers; writes nothing.
    pub async fn reconcile(
        db: &DatabaseConnection,
        uploads: &UploadLedger,
        filter: &UploadFilter,
    ) -> Result<Vec<ReconciliationRow>> {
        let rows = uploads.list_uploads(filter).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let filenames: Vec<String> = rows.iter().map(|u| u.filename.clone()).collect();
        let files = StageFileData::find()
            .filter(stage_file_data::Column::Filename.is_in(filenames))
            .all(db)
            .await?;

        let mut by_name: HashMap<&str, Vec<&stage_file_data::Model>> = HashMap::new();
        for file in &files {
            by_name.entry(file.filename.as_str()).or_default().push(file);
        }

        Ok(rows
            .iter()
            .map(|upload| {
                let file = by_name
                    .get(upload.filename.as_str())
                    .and_then(|versions| representative(versions));
                classify(upload, file)
            })
            .collect())
    }
}
