use crate::utils::validation::MAX_WINDOW_DAYS;
use std::env;

/// Multimodal models the completion service is allowed to run.
pub const DEFAULT_MODELS: &[&str] = &["claude-3-7-sonnet", "claude-4-opus", "claude-4-sonnet"];

/// Application configuration for the inspection backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum upload size in bytes (default: 50 MB)
    pub max_file_size: usize,

    /// Maximum size of one chunk in the chunked table fallback (default: 7 MB)
    pub chunk_size: usize,

    /// Age in days after which the retention worker purges records (default: 90)
    pub retention_days: i64,

    /// Rolling window of the metrics view in days (default: 30)
    pub metrics_window_days: i64,

    /// How often the retention worker runs, in seconds (default: 86400)
    pub cleanup_interval_secs: u64,

    /// Object stage that receives uploads (default: "BUILDING_INSPECTION_STAGE")
    pub stage_name: String,

    /// Write uploads to the object stage; when false the chunked fallback is used
    pub enable_stage: bool,

    /// Model used when the caller does not pick one
    pub default_model: String,

    pub allowed_models: Vec<String>,

    /// Base URL of the completion service account, e.g. https://acct.snowflakecomputing.com
    pub cortex_account_url: Option<String>,

    /// Bearer token for the completion service
    pub cortex_token: Option<String>,

    /// Completion request timeout in seconds (default: 120)
    pub completion_timeout_secs: u64,

    /// Confidence recorded when the analysis text states none (default: 0.85)
    pub default_confidence: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024, // 50 MB
            chunk_size: 7 * 1024 * 1024,     // 7 MB
            retention_days: 90,
            metrics_window_days: 30,
            cleanup_interval_secs: 24 * 3600,
            stage_name: "BUILDING_INSPECTION_STAGE".to_string(),
            enable_stage: true,
            default_model: DEFAULT_MODELS[0].to_string(),
            allowed_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            cortex_account_url: None,
            cortex_token: None,
            completion_timeout_secs: 120,
            default_confidence: 0.85,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            chunk_size: env::var("CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.chunk_size),

            retention_days: day_count(env::var("RETENTION_DAYS").ok(), default.retention_days),

            metrics_window_days: day_count(
                env::var("METRICS_WINDOW_DAYS").ok(),
                default.metrics_window_days,
            ),

            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.cleanup_interval_secs),

            stage_name: env::var("STAGE_NAME").unwrap_or(default.stage_name),

            enable_stage: env::var("ENABLE_STAGE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.enable_stage),

            default_model: env::var("DEFAULT_MODEL").unwrap_or(default.default_model),

            allowed_models: env::var("ALLOWED_MODELS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_models),

            cortex_account_url: env::var("CORTEX_ACCOUNT_URL").ok(),
            cortex_token: env::var("CORTEX_TOKEN").ok(),

            completion_timeout_secs: env::var("COMPLETION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.completion_timeout_secs),

            default_confidence: env::var("DEFAULT_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| (0.0..=1.0).contains(v))
                .unwrap_or(default.default_confidence),
        }
    }

    /// Create config for development (no stage, small chunks, short windows)
    pub fn development() -> Self {
        Self {
            chunk_size: 64 * 1024,
            enable_stage: false,
            cleanup_interval_secs: 3600,
            ..Self::default()
        }
    }

    /// Create config for production (stage and completion service required)
    pub fn production() -> Self {
        let config = Self::from_env();
        if config.cortex_account_url.is_none() {
            tracing::warn!("CORTEX_ACCOUNT_URL is not set; every analysis will use the fallback report");
        }
        Self {
            enable_stage: true,
            ..config
        }
    }

    pub fn is_model_allowed(&self, model: &str) -> bool {
        self.allowed_models.iter().any(|m| m == model)
    }
}

/// Parses a day count in `1..=MAX_WINDOW_DAYS`, otherwise `default`.
fn day_count(raw: Option<String>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|d: &i64| (1..=MAX_WINDOW_DAYS).contains(d))
        .unwrap_or(default)
}
