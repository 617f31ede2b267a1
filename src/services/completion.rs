use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const COMPLETE_PATH: &str = "/api/v2/cortex/inference:complete";

/// Hosted multimodal completion endpoint.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the generated text. Any transport, status or decoding failure
    /// is reported as `CollaboratorUnavailable`.
    async fn complete(&self, model: &str, prompt: &str, image: Option<&[u8]>) -> Result<String>;
}

/// Stand-in used when no completion endpoint is configured.
pub struct UnavailableCompletion;

#[async_trait]
impl CompletionService for UnavailableCompletion {
    async fn complete(&self, _model: &str, _prompt: &str, _image: Option<&[u8]>) -> Result<String> {
        Err(LedgerError::CollaboratorUnavailable(
            "completion service is not configured".to_string(),
        ))
    }
}

/// REST client for the Cortex inference `complete` endpoint.
pub struct CortexCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Value>,
}

#[derive(Deserialize)]
struct CompleteResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    /// Older responses carry the text directly on the choice.
    #[serde(default)]
    messages: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CortexCompletionClient {
    pub fn new(account_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = url::Url::parse(account_url).map_err(|e| {
            LedgerError::CollaboratorUnavailable(format!("invalid completion URL '{}': {}", account_url, e))
        })?;
        let endpoint = base
            .join(COMPLETE_PATH)
            .map_err(|e| LedgerError::CollaboratorUnavailable(e.to_string()))?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::CollaboratorUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Message content for a prompt and optional image, the image embedded as a
/// base64 data URI.
fn message_content(prompt: &str, image: Option<&[u8]>) -> Vec<Value> {
    let mut content = vec![json!({ "type": "text", "text": prompt })];
    if let Some(bytes) = image {
        let mime = infer::get(bytes)
            .map(|k| k.mime_type())
            .filter(|m| m.starts_with("image/"))
            .unwrap_or("image/jpeg");
        content.push(json!({
            "type": "image",
            "image_url": { "url": format!("data:{};base64,{}", mime, STANDARD.encode(bytes)) }
        }));
    }
    content
}

fn extract_text(response: CompleteResponse) -> Option<String> {
    let choice = response.choices.into_iter().next()?;
    choice
        .message
        .and_then(|m| m.content)
        .or(choice.messages)
        .filter(|text| !text.trim().is_empty())
}

#[async_trait]
impl CompletionService for CortexCompletionClient {
    async fn complete(&self, model: &str, prompt: &str, image: Option<&[u8]>) -> Result<String> {
        let body = CompleteRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: message_content(prompt, image),
            }],
            stream: false,
        };

        debug!(model, has_image = image.is_some(), "sending completion request");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "completion request failed");
            LedgerError::CollaboratorUnavailable(format!("completion request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "completion service returned an error");
            return Err(LedgerError::CollaboratorUnavailable(format!(
                "completion service returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: CompleteResponse = response.json().await.map_err(|e| {
            LedgerError::CollaboratorUnavailable(format!("unreadable completion response: {}", e))
        })?;

        extract_text(parsed).ok_or_else(|| {
            LedgerError::CollaboratorUnavailable("completion response had no text".to_string())
        })
    }
}
