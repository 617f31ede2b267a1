use crate::entities::{prelude::*, stage_file_data};
use crate::error::{LedgerError, Result, is_unique_violation};
use crate::models::{FileStatus, StorageType};
use crate::services::chunk_store::{self, content_hash};
use crate::utils::ids::{FILE_PREFIX, new_id};
use crate::utils::keyed_mutex::KeyedMutex;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info, warn};

/// Attempts made when another process wins the ACTIVE slot between our
/// supersede and insert.
const MAX_REGISTER_ATTEMPTS: usize = 3;

/// One FileMetaRecord per stored version of a logical file.
///
/// At most one version per filename is ACTIVE. Registering a new version
/// supersedes the previous one inside the same transaction; a partial unique
/// index enforces the rule across processes.
#[derive(Clone)]
pub struct FileRegistry {
    db: DatabaseConnection,
    locks: KeyedMutex,
}

struct NewVersion<'a> {
    filename: &'a str,
    size: i64,
    file_type: &'a str,
    storage_type: StorageType,
    hash: Option<String>,
    chunks: Vec<chunk_store::Chunk>,
}

impl FileRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: KeyedMutex::new(),
        }
    }

    /// Records a new ACTIVE version whose bytes live elsewhere.
    pub async fn register(
        &self,
        filename: &str,
        size: i64,
        file_type: &str,
        storage_type: StorageType,
    ) -> Result<String> {
        self.register_version(NewVersion {
            filename,
            size,
            file_type,
            storage_type,
            hash: None,
            chunks: Vec::new(),
        })
        .await
    }

    /// Records a new ACTIVE version and stores its payload in the chunk table
    /// in the same transaction.
    pub async fn register_with_payload(
        &self,
        filename: &str,
        payload: &[u8],
        file_type: &str,
        chunk_size: usize,
    ) -> Result<String> {
        let chunks = chunk_store::split(payload, chunk_size)?;
        self.register_version(NewVersion {
            filename,
            size: payload.len() as i64,
            file_type,
            storage_type: StorageType::ChunkedDb,
            hash: Some(content_hash(payload)),
            chunks,
        })
        .await
    }

    async fn register_version(&self, version: NewVersion<'_>) -> Result<String> {
        let guard = self.locks.lock(version.filename).await;
        let result = self.register_with_retry(&version).await;
        drop(guard);
        self.locks.prune();
        result
    }

    async fn register_with_retry(&self, version: &NewVersion<'_>) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_register(version).await {
                Ok(file_id) => return Ok(file_id),
                Err(LedgerError::Database(e))
                    if is_unique_violation(&e) && attempt < MAX_REGISTER_ATTEMPTS =>
                {
                    warn!(
                        "⚠️ Concurrent registration of '{}' detected, retrying ({}/{})",
                        version.filename, attempt, MAX_REGISTER_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_register(&self, version: &NewVersion<'_>) -> Result<String> {
        let txn = self.db.begin().await?;

        let superseded = StageFileData::update_many()
            .col_expr(
                stage_file_data::Column::Status,
                Expr::value(FileStatus::Superseded.as_str()),
            )
            .filter(stage_file_data::Column::Filename.eq(version.filename))
            .filter(stage_file_data::Column::Status.eq(FileStatus::Active.as_str()))
            .exec(&txn)
            .await?;

        let file_id = new_id(FILE_PREFIX);
        stage_file_data::ActiveModel {
            file_id: Set(file_id.clone()),
            filename: Set(version.filename.to_string()),
            file_size: Set(version.size),
            file_type: Set(version.file_type.to_string()),
            storage_type: Set(version.storage_type.as_str().to_string()),
            status: Set(FileStatus::Active.as_str().to_string()),
            chunk_count: Set(version.chunks.len() as i32),
            content_hash: Set(version.hash.clone()),
            upload_time: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        if !version.chunks.is_empty() {
            chunk_store::write_chunks(&txn, &file_id, &version.chunks).await?;
        }

        txn.commit().await?;

        if superseded.rows_affected > 0 {
            debug!(
                "Superseded {} prior version(s) of '{}'",
                superseded.rows_affected, version.filename
            );
        }
        info!(
            "🗂️  Registered {} for '{}' ({} bytes, {}, {} chunks)",
            file_id,
            version.filename,
            version.size,
            version.storage_type,
            version.chunks.len()
        );
        Ok(file_id)
    }

    /// Identifier of the ACTIVE version for `filename`.
    pub async fn lookup(&self, filename: &str) -> Result<String> {
        self.active_for(filename)
            .await?
            .map(|m| m.file_id)
            .ok_or_else(|| LedgerError::not_found("active file", filename))
    }

    pub async fn active_for(&self, filename: &str) -> Result<Option<stage_file_data::Model>> {
        Ok(StageFileData::find()
            .filter(stage_file_data::Column::Filename.eq(filename))
            .filter(stage_file_data::Column::Status.eq(FileStatus::Active.as_str()))
            .one(&self.db)
            .await?)
    }

    pub async fn get(&self, file_id: &str) -> Result<stage_file_data::Model> {
        StageFileData::find_by_id(file_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("file", file_id))
    }

    /// Every version recorded for `filename`, newest first.
    pub async fn versions(&self, filename: &str) -> Result<Vec<stage_file_data::Model>> {
        Ok(StageFileData::find()
            .filter(stage_file_data::Column::Filename.eq(filename))
            .order_by_desc(stage_file_data::Column::UploadTime)
            .order_by_desc(stage_file_data::Column::FileId)
            .all(&self.db)
            .await?)
    }

    /// Marks a version INACTIVE. Chunk rows stay until retention removes them.
    pub async fn deactivate(&self, file_id: &str) -> Result<()> {
        let model = self.get(file_id).await?;
        let mut active: stage_file_data::ActiveModel = model.into();
        active.status = Set(FileStatus::Inactive.as_str().to_string());
        active.update(&self.db).await?;
        info!("🗂️  Deactivated {}", file_id);
        Ok(())
    }

    /// Payload of a chunked version, verified against its metadata.
    pub async fn read_payload(&self, file_id: &str) -> Result<Vec<u8>> {
        chunk_store::read_file(&self.db, file_id).await
    }
}
