use crate::config::AppConfig;
use crate::entities::image_uploads;
use crate::error::Result;
use crate::models::{SessionContext, StorageType, UploadStatus};
use crate::services::binary_store::BinaryStore;
use crate::services::metadata::MetadataService;
use crate::services::upload_ledger::{NewUpload, UploadLedger};
use crate::utils::ids::short_tag;
use crate::utils::validation::{sanitize_filename, stored_filename, validate_file_size};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub location: String,
    pub storage_type: StorageType,
    pub file_type: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadItem {
    pub original_name: String,
    pub outcome: Option<UploadOutcome>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct UploadService {
    ledger: UploadLedger,
    binary: BinaryStore,
    config: Arc<AppConfig>,
}

impl UploadService {
    pub fn new(ledger: UploadLedger, binary: BinaryStore, config: Arc<AppConfig>) -> Self {
        Self {
            ledger,
            binary,
            config,
        }
    }

    /// Uploads each file independently; one rejected file does not stop the
    /// others.
    pub async fn upload_many(&self, ctx: &SessionContext, files: Vec<IncomingFile>) -> Vec<UploadItem> {
        let mut items = Vec::with_capacity(files.len());
        for file in files {
            let original_name = file.original_name.clone();
            match self.upload(ctx, file).await {
                Ok(outcome) => items.push(UploadItem {
                    original_name,
                    outcome: Some(outcome),
                    error: None,
                }),
                Err(e) => {
                    warn!("⚠️ Upload of '{}' rejected: {}", original_name, e);
                    items.push(UploadItem {
                        original_name,
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        items
    }

    pub async fn upload(&self, ctx: &SessionContext, file: IncomingFile) -> Result<UploadOutcome> {
        let original_name = sanitize_filename(&file.original_name)?;
        validate_file_size(file.data.len(), self.config.max_file_size)?;

        let meta = MetadataService::analyze(&file.data, &original_name, file.content_type.as_deref());
        let filename = stored_filename(Utc::now(), &short_tag(), &original_name);
        let size = file.data.len() as i64;

        let stored = self.binary.persist(&filename, file.data, &meta.mime_type).await?;

        let mut metadata = meta.metadata.clone();
        metadata["storage_type"] = serde_json::json!(stored.storage_type);
        metadata["file_id"] = serde_json::json!(stored.file_id);
        metadata["session_id"] = serde_json::json!(ctx.session_id);

        let mut new = NewUpload::new(
            &filename,
            &original_name,
            size,
            &stored.location,
            &meta.mime_type,
            metadata,
        );
        if let Some((w, h)) = meta.dimensions() {
            new = new.with_dimensions(w, h);
        }
        let upload_id = self.ledger.record_upload(ctx, new).await?;

        // Durable payloads are usable right away; memory-only ones stay UPLOADED.
        let status = if stored.storage_type == StorageType::Memory {
            UploadStatus::Uploaded
        } else {
            self.ledger.set_status(&upload_id, UploadStatus::Active).await?;
            UploadStatus::Active
        };

        info!(
            "✅ Uploaded '{}' as {} ({} bytes, {})",
            original_name, upload_id, size, stored.storage_type
        );

        Ok(UploadOutcome {
            upload_id,
            filename,
            original_name,
            file_size: size,
            location: stored.location,
            storage_type: stored.storage_type,
            file_type: meta.mime_type,
            width: meta.width.map(|w| w as i32),
            height: meta.height.map(|h| h as i32),
            status,
        })
    }

    /// Stored bytes of an upload and its file type.
    pub async fn content(&self, upload_id: &str) -> Result<(Vec<u8>, String)> {
        let upload = self.ledger.get_upload(upload_id).await?;
        let bytes = self.binary.fetch(&upload.stage_path).await?;
        Ok((bytes, upload.file_type))
    }

    /// Deletes an upload that nothing references any more, then retires its
    /// file version and stored bytes.
    pub async fn remove(&self, upload_id: &str) -> Result<image_uploads::Model> {
        let upload = self.ledger.get_upload(upload_id).await?;
        self.ledger.delete_upload(upload_id).await?;

        match self.binary.registry().active_for(&upload.filename).await {
            Ok(Some(file)) => self.binary.registry().deactivate(&file.file_id).await?,
            Ok(None) => {}
            Err(e) => warn!("⚠️ Could not look up file version of '{}': {}", upload.filename, e),
        }
        if let Err(e) = self.binary.discard(&upload.stage_path).await {
            warn!("⚠️ Could not discard bytes at {}: {}", upload.stage_path, e);
        }
        Ok(upload)
    }

    pub fn ledger(&self) -> &UploadLedger {
        &self.ledger
    }
}

