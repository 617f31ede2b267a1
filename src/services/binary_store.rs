use crate::error::{LedgerError, Result};
use crate::models::{CHUNKED_PREFIX, MEMORY_PREFIX, STAGE_PREFIX, StorageType};
use crate::services::file_registry::FileRegistry;
use crate::services::storage::StageStorage;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A parsed location reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// `@<stage>/<key>`
    Stage { stage: String, key: String },
    /// `chunked://<file_id>`
    Chunked(String),
    /// `memory://<filename>`
    Memory(String),
}

impl Location {
    pub fn parse(reference: &str) -> Result<Self> {
        if let Some(rest) = reference.strip_prefix(STAGE_PREFIX) {
            return match rest.split_once('/') {
                Some((stage, key)) if !stage.is_empty() && !key.is_empty() => Ok(Location::Stage {
                    stage: stage.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(LedgerError::DataQualityViolation(format!(
                    "stage reference '{}' has no file path",
                    reference
                ))),
            };
        }
        if let Some(file_id) = reference.strip_prefix(CHUNKED_PREFIX) {
            return Ok(Location::Chunked(file_id.to_string()));
        }
        if let Some(filename) = reference.strip_prefix(MEMORY_PREFIX) {
            return Ok(Location::Memory(filename.to_string()));
        }
        Err(LedgerError::DataQualityViolation(format!(
            "unrecognised location reference '{}'",
            reference
        )))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Location::Stage { .. } => StorageType::Stage,
            Location::Chunked(_) => StorageType::ChunkedDb,
            Location::Memory(_) => StorageType::Memory,
        }
    }
}

/// Where `persist` put a payload.
#[derive(Debug, Clone)]
pub struct StoredPayload {
    pub location: String,
    pub storage_type: StorageType,
    pub file_id: Option<String>,
}

/// Persists payloads to the first tier that accepts them (object stage,
/// then chunked table, then process memory) and resolves any location
/// reference back to bytes.
#[derive(Clone)]
pub struct BinaryStore {
    stage: Option<Arc<dyn StageStorage>>,
    registry: FileRegistry,
    memory: Arc<DashMap<String, Bytes>>,
    stage_name: String,
    chunk_size: usize,
}

impl BinaryStore {
    pub fn new(
        stage: Option<Arc<dyn StageStorage>>,
        registry: FileRegistry,
        stage_name: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            stage,
            registry,
            memory: Arc::new(DashMap::new()),
            stage_name: stage_name.into(),
            chunk_size,
        }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn stage_available(&self) -> bool {
        self.stage.is_some()
    }

    pub async fn persist(&self, filename: &str, data: Bytes, file_type: &str) -> Result<StoredPayload> {
        if let Some(stage) = &self.stage {
            match self.put_on_stage(stage.as_ref(), filename, &data).await {
                Ok(()) => {
                    let file_id = self
                        .registry
                        .register(filename, data.len() as i64, file_type, StorageType::Stage)
                        .await?;
                    return Ok(StoredPayload {
                        location: StorageType::Stage.location_for(&self.stage_name, filename, None),
                        storage_type: StorageType::Stage,
                        file_id: Some(file_id),
                    });
                }
                Err(e) => warn!("⚠️ Stage upload failed for '{}': {}; using chunked table", filename, e),
            }
        }

        match self
            .registry
            .register_with_payload(filename, &data, file_type, self.chunk_size)
            .await
        {
            Ok(file_id) => {
                return Ok(StoredPayload {
                    location: StorageType::ChunkedDb.location_for(&self.stage_name, filename, Some(&file_id)),
                    storage_type: StorageType::ChunkedDb,
                    file_id: Some(file_id),
                });
            }
            Err(e) => warn!("⚠️ Chunked storage failed for '{}': {}; holding in memory", filename, e),
        }

        let size = data.len() as i64;
        self.memory.insert(filename.to_string(), data);
        let file_id = match self
            .registry
            .register(filename, size, file_type, StorageType::Memory)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("⚠️ Could not register in-memory file '{}': {}", filename, e);
                None
            }
        };
        warn!("⚠️ '{}' is held in memory only and will not survive a restart", filename);

        Ok(StoredPayload {
            location: StorageType::Memory.location_for(&self.stage_name, filename, None),
            storage_type: StorageType::Memory,
            file_id,
        })
    }

    async fn put_on_stage(&self, stage: &dyn StageStorage, key: &str, data: &Bytes) -> anyhow::Result<()> {
        stage.put(key, data.to_vec()).await?;
        let problem = match stage.size(key).await? {
            Some(size) if size == data.len() as u64 => {
                info!("☁️  Staged '{}' ({} bytes, size verified)", key, size);
                return Ok(());
            }
            Some(size) => format!("stage holds {} bytes for '{}', expected {}", size, key, data.len()),
            None => format!("'{}' missing from stage after upload", key),
        };

        // A partial object must not outlive the fallback copy.
        if let Err(e) = stage.delete(key).await {
            warn!("⚠️ Could not remove partial stage object '{}': {}", key, e);
        }
        Err(anyhow::anyhow!(problem))
    }

    /// Resolves a location reference to its bytes.
    pub async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        match Location::parse(reference)? {
            Location::Stage { key, .. } => {
                let stage = self.stage.as_ref().ok_or_else(|| {
                    LedgerError::CollaboratorUnavailable("object stage is not configured".to_string())
                })?;
                if !stage.exists(&key).await? {
                    return Err(LedgerError::not_found("staged file", &key));
                }
                Ok(stage.get(&key).await?)
            }
            Location::Chunked(file_id) => self.registry.read_payload(&file_id).await,
            Location::Memory(filename) => self
                .memory
                .get(&filename)
                .map(|data| data.to_vec())
                .ok_or_else(|| LedgerError::not_found("in-memory file", &filename)),
        }
    }

    /// Drops the stored bytes behind a reference. Chunk rows are left to the
    /// retention sweep.
    pub async fn discard(&self, reference: &str) -> Result<()> {
        match Location::parse(reference)? {
            Location::Stage { key, .. } => {
                if let Some(stage) = &self.stage {
                    stage.delete(&key).await?;
                }
            }
            Location::Memory(filename) => {
                self.memory.remove(&filename);
            }
            Location::Chunked(_) => {}
        }
        Ok(())
    }
}
