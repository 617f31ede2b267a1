use crate::config::AppConfig;
use crate::entities::{chat_history, prelude::*};
use crate::error::{LedgerError, Result};
use crate::models::SessionContext;
use crate::services::analysis::prompts;
use crate::services::binary_store::BinaryStore;
use crate::services::completion::CompletionService;
use crate::services::upload_ledger::UploadLedger;
use crate::utils::ids::{CHAT_PREFIX, new_id};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Prior exchanges replayed into each prompt.
const HISTORY_TURNS: usize = 10;

#[derive(Clone)]
pub struct ChatService {
    db: DatabaseConnection,
    uploads: UploadLedger,
    binary: BinaryStore,
    completion: Arc<dyn CompletionService>,
    config: Arc<AppConfig>,
}

impl ChatService {
    pub fn new(
        db: DatabaseConnection,
        uploads: UploadLedger,
        binary: BinaryStore,
        completion: Arc<dyn CompletionService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            uploads,
            binary,
            completion,
            config,
        }
    }

    /// Asks a question about an uploaded photograph and records the exchange.
    /// A failed completion is answered with a labelled notice instead.
    pub async fn ask(&self, ctx: &SessionContext, filename: &str, question: &str) -> Result<chat_history::Model> {
        if question.trim().is_empty() {
            return Err(LedgerError::DataQualityViolation("question is empty".to_string()));
        }
        if !self.config.is_model_allowed(&ctx.model) {
            return Err(LedgerError::DataQualityViolation(format!(
                "model '{}' is not in the allowed list",
                ctx.model
            )));
        }

        let upload = match self.uploads.latest_for_filename(filename).await {
            Ok(upload) => Some(upload),
            Err(LedgerError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let image = match &upload {
            Some(u) => self.binary.fetch(&u.stage_path).await.ok(),
            None => None,
        };

        let history: Vec<(String, String)> = self
            .history(filename)
            .await?
            .into_iter()
            .rev()
            .take(HISTORY_TURNS)
            .rev()
            .map(|c| (c.user_message, c.ai_response))
            .collect();

        let prompt = prompts::chat_prompt(filename, question, &history);
        let started = Instant::now();
        let response = match self.completion.complete(&ctx.model, &prompt, image.as_deref()).await {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ Chat completion failed for '{}': {}", filename, e);
                format!(
                    "AI chat is currently unavailable ({}). Please retry later or consult a licensed building inspector.",
                    e
                )
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let record = chat_history::ActiveModel {
            chat_id: Set(new_id(CHAT_PREFIX)),
            image_filename: Set(filename.to_string()),
            upload_id: Set(upload.map(|u| u.upload_id)),
            user_message: Set(question.to_string()),
            ai_response: Set(response),
            model_used: Set(ctx.model.clone()),
            chat_timestamp: Set(Utc::now()),
            session_id: Set(ctx.session_id.clone()),
            processing_time_ms: Set(elapsed_ms),
        }
        .insert(&self.db)
        .await?;

        info!("💬 Recorded chat {} about '{}'", record.chat_id, filename);
        Ok(record)
    }

    /// Exchanges about one filename, oldest first.
    pub async fn history(&self, filename: &str) -> Result<Vec<chat_history::Model>> {
        Ok(ChatHistory::find()
            .filter(chat_history::Column::ImageFilename.eq(filename))
            .order_by_asc(chat_history::Column::ChatTimestamp)
            .order_by_asc(chat_history::Column::ChatId)
            .all(&self.db)
            .await?)
    }
}
