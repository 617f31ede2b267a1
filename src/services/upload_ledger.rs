use crate::entities::{image_uploads, prelude::*};
use crate::error::{LedgerError, Result};
use crate::models::{SessionContext, UploadStatus};
use crate::utils::ids::{UPLOAD_PREFIX, new_id};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

/// Fields of an upload known before it is recorded.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub location: String,
    pub file_type: String,
    pub dimensions: Option<(i32, i32)>,
    pub metadata: serde_json::Value,
}

impl NewUpload {
    pub fn new(
        filename: impl Into<String>,
        original_name: impl Into<String>,
        file_size: i64,
        location: impl Into<String>,
        file_type: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            filename: filename.into(),
            original_name: original_name.into(),
            file_size,
            location: location.into(),
            file_type: file_type.into(),
            dimensions: None,
            metadata,
        }
    }

    pub fn with_dimensions(mut self, width: i32, height: i32) -> Self {
        self.dimensions = Some((width, height));
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UploadFilter {
    pub status: Option<UploadStatus>,
    /// Inclusive lower bound on upload time
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on upload time
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct UploadLedger {
    db: DatabaseConnection,
}

impl UploadLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn record_upload(&self, ctx: &SessionContext, upload: NewUpload) -> Result<String> {
        let upload_id = new_id(UPLOAD_PREFIX);
        let (width, height) = match upload.dimensions {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        image_uploads::ActiveModel {
            upload_id: Set(upload_id.clone()),
            filename: Set(upload.filename.clone()),
            original_name: Set(upload.original_name),
            file_size: Set(upload.file_size),
            upload_time: Set(Utc::now()),
            stage_path: Set(upload.location.clone()),
            file_type: Set(upload.file_type),
            image_width: Set(width),
            image_height: Set(height),
            uploaded_by: Set(ctx.user.clone()),
            status: Set(UploadStatus::Uploaded.as_str().to_string()),
            metadata: Set(upload.metadata),
        }
        .insert(&self.db)
        .await?;

        info!(
            "📸 Recorded upload {} ('{}', {} bytes) at {}",
            upload_id, upload.filename, upload.file_size, upload.location
        );
        Ok(upload_id)
    }

    /// Newest first; ties on upload time fall back to the identifier.
    pub async fn list_uploads(&self, filter: &UploadFilter) -> Result<Vec<image_uploads::Model>> {
        let mut cond = Condition::all();
        if let Some(status) = filter.status {
            cond = cond.add(image_uploads::Column::Status.eq(status.as_str()));
        }
        if let Some(since) = filter.since {
            cond = cond.add(image_uploads::Column::UploadTime.gte(since));
        }
        if let Some(until) = filter.until {
            cond = cond.add(image_uploads::Column::UploadTime.lt(until));
        }

        let mut query = ImageUploads::find()
            .filter(cond)
            .order_by_desc(image_uploads::Column::UploadTime)
            .order_by_desc(image_uploads::Column::UploadId);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        Ok(query.all(&self.db).await?)
    }

    pub async fn get_upload(&self, upload_id: &str) -> Result<image_uploads::Model> {
        ImageUploads::find_by_id(upload_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("upload", upload_id))
    }

    /// Most recent upload stored under `filename`.
    pub async fn latest_for_filename(&self, filename: &str) -> Result<image_uploads::Model> {
        ImageUploads::find()
            .filter(image_uploads::Column::Filename.eq(filename))
            .order_by_desc(image_uploads::Column::UploadTime)
            .order_by_desc(image_uploads::Column::UploadId)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("upload for filename", filename))
    }

    pub async fn set_status(&self, upload_id: &str, status: UploadStatus) -> Result<()> {
        let model = self.get_upload(upload_id).await?;
        let mut active: image_uploads::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Deletes the upload row only. Analyses, report links and chats that
    /// still reference it make this fail with a foreign key violation.
    pub async fn delete_upload(&self, upload_id: &str) -> Result<()> {
        let res = ImageUploads::delete_by_id(upload_id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(LedgerError::not_found("upload", upload_id));
        }
        info!("🗑️ Deleted upload {}", upload_id);
        Ok(())
    }
}
