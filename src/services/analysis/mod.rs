pub mod parsing;
pub mod prompts;

use crate::config::AppConfig;
use crate::error::{LedgerError, Result};
use crate::models::{ConfidenceLevel, SessionContext};
use crate::services::analysis_ledger::{AnalysisLedger, NewAnalysis};
use crate::services::binary_store::BinaryStore;
use crate::services::completion::CompletionService;
use crate::services::upload_ledger::UploadLedger;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Result of analysing one upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisOutcome {
    pub analysis_id: String,
    pub upload_id: String,
    pub filename: String,
    pub analysis_result: String,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub detected_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub processing_time_ms: i64,
    pub model_used: String,
    /// True when the completion service failed and the labelled fallback
    /// report was recorded instead.
    pub fallback: bool,
}

/// One entry of a batch: either an outcome or the error that stopped this
/// item alone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchItem {
    pub upload_id: String,
    pub outcome: Option<AnalysisOutcome>,
    pub error: Option<String>,
}

struct Completed {
    text: String,
    confidence: f64,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

#[derive(Clone)]
pub struct AnalysisService {
    uploads: UploadLedger,
    analyses: AnalysisLedger,
    binary: BinaryStore,
    completion: Arc<dyn CompletionService>,
    config: Arc<AppConfig>,
}

impl AnalysisService {
    pub fn new(
        uploads: UploadLedger,
        analyses: AnalysisLedger,
        binary: BinaryStore,
        completion: Arc<dyn CompletionService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            uploads,
            analyses,
            binary,
            completion,
            config,
        }
    }

    /// Analyses uploads one after another. A failing item is reported in its
    /// own entry and never stops the rest of the batch.
    pub async fn analyze_batch(
        &self,
        ctx: &SessionContext,
        upload_ids: &[String],
        request: &str,
    ) -> Result<Vec<BatchItem>> {
        self.ensure_model(&ctx.model)?;

        let mut items = Vec::with_capacity(upload_ids.len());
        for upload_id in upload_ids {
            let item = match self.analyze_upload(ctx, upload_id, request).await {
                Ok(outcome) => BatchItem {
                    upload_id: upload_id.clone(),
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => {
                    warn!("⚠️ Analysis of {} failed: {}", upload_id, e);
                    BatchItem {
                        upload_id: upload_id.clone(),
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            items.push(item);
        }

        let ok = items.iter().filter(|i| i.outcome.is_some()).count();
        info!("🧠 Batch analysis finished: {}/{} succeeded", ok, items.len());
        Ok(items)
    }

    pub async fn analyze_upload(
        &self,
        ctx: &SessionContext,
        upload_id: &str,
        request: &str,
    ) -> Result<AnalysisOutcome> {
        self.ensure_model(&ctx.model)?;
        let upload = self.uploads.get_upload(upload_id).await?;

        let image = match self.binary.fetch(&upload.stage_path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    "⚠️ Image for {} unavailable ({}); analysing without it",
                    upload.filename, e
                );
                None
            }
        };

        let started = Instant::now();
        let completed = self
            .run_completion(&ctx.model, &upload.filename, request, image.as_deref())
            .await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let (completed, fallback_error) = match completed {
            Ok(c) => (c, None),
            Err(e) => {
                warn!("⚠️ Completion failed for {}: {}; recording fallback", upload.filename, e);
                let error = e.to_string();
                (
                    Completed {
                        text: prompts::fallback_report(&upload.filename, &error),
                        confidence: 0.0,
                        issues: prompts::FALLBACK_ISSUES.iter().map(|s| s.to_string()).collect(),
                        recommendations: prompts::FALLBACK_RECOMMENDATIONS
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    },
                    Some(error),
                )
            }
        };

        let mut new = NewAnalysis::new(
            &upload.upload_id,
            request,
            &completed.text,
            completed.confidence,
            completed.issues.clone(),
            completed.recommendations.clone(),
            elapsed_ms,
            &ctx.model,
        );
        new.filename = Some(upload.filename.clone());
        new.metadata = json!({
            "session_id": ctx.session_id,
            "image_supplied": image.is_some(),
            "fallback": fallback_error.is_some(),
            "error": fallback_error,
        });

        let analysis_id = self.analyses.record_analysis(ctx, new).await?;

        Ok(AnalysisOutcome {
            analysis_id,
            upload_id: upload.upload_id,
            filename: upload.filename,
            analysis_result: completed.text,
            confidence_score: completed.confidence,
            confidence_level: ConfidenceLevel::from_score(completed.confidence),
            detected_issues: completed.issues,
            recommendations: completed.recommendations,
            processing_time_ms: elapsed_ms,
            model_used: ctx.model.clone(),
            fallback: fallback_error.is_some(),
        })
    }

    async fn run_completion(
        &self,
        model: &str,
        filename: &str,
        request: &str,
        image: Option<&[u8]>,
    ) -> Result<Completed> {
        let prompt = match image {
            Some(_) => prompts::inspection_prompt(filename, request),
            None => prompts::text_only_prompt(filename, request),
        };
        let text = self.completion.complete(model, &prompt, image).await?;

        // Follow-up extractions are best effort; the main text is already usable.
        let issues = match self
            .completion
            .complete(model, &prompts::issues_prompt(&text), None)
            .await
        {
            Ok(reply) => parsing::parse_string_list(&reply),
            Err(e) => {
                warn!("⚠️ Issue extraction failed for {}: {}", filename, e);
                Vec::new()
            }
        };

        let recommendations = match self
            .completion
            .complete(model, &prompts::recommendations_prompt(&issues, &text), None)
            .await
        {
            Ok(reply) => parsing::parse_string_list(&reply),
            Err(e) => {
                warn!("⚠️ Recommendation extraction failed for {}: {}", filename, e);
                Vec::new()
            }
        };

        let confidence = parsing::parse_confidence(&text).unwrap_or(self.config.default_confidence);

        Ok(Completed {
            text,
            confidence,
            issues,
            recommendations,
        })
    }

    fn ensure_model(&self, model: &str) -> Result<()> {
        if self.config.is_model_allowed(model) {
            Ok(())
        } else {
            Err(LedgerError::DataQualityViolation(format!(
                "model '{}' is not in the allowed list",
                model
            )))
        }
    }
}
