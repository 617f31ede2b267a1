#![allow(dead_code)]

use async_trait::async_trait;
use building_inspection_backend::config::AppConfig;
use building_inspection_backend::error::{LedgerError, Result};
use building_inspection_backend::infrastructure::database;
use building_inspection_backend::models::SessionContext;
use building_inspection_backend::services::completion::CompletionService;
use building_inspection_backend::services::storage::StageStorage;
use sea_orm::{Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Mutex;

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub fn test_config() -> AppConfig {
    AppConfig {
        chunk_size: 4,
        ..AppConfig::development()
    }
}

pub fn ctx() -> SessionContext {
    SessionContext::new("inspector", "BUILDING_INSPECTION_STAGE", "claude-4-sonnet")
}

/// In-memory object stage. `short_by` makes reported sizes disagree with
/// what was written.
pub struct MockStage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub short_by: u64,
}

impl MockStage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            short_by: 0,
        }
    }

    pub fn truncating() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            short_by: 1,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl StageStorage for MockStage {
    async fn put(&self, key: &str, data: Vec<u8>) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such key {}", key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.contains(key))
    }

    async fn size(&self, key: &str) -> anyhow::Result<Option<u64>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|d| (d.len() as u64).saturating_sub(self.short_by)))
    }
}

/// Completion service answering by prompt kind; records every prompt.
pub struct ScriptedCompletion {
    pub analysis: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(analysis: &str) -> Self {
        Self {
            analysis: analysis.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, _model: &str, prompt: &str, _image: Option<&[u8]>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("Extract a list of specific building issues") {
            Ok(r#"["Cracked render", "Rusted flashing"]"#.to_string())
        } else if prompt.starts_with("Generate specific maintenance recommendations") {
            Ok("Repair render, Replace flashing".to_string())
        } else {
            Ok(self.analysis.clone())
        }
    }
}

pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _model: &str, _prompt: &str, _image: Option<&[u8]>) -> Result<String> {
        Err(LedgerError::CollaboratorUnavailable("completion endpoint timed out".to_string()))
    }
}
