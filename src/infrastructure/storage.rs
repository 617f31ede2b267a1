use crate::config::AppConfig;
use crate::services::storage::{S3StageStorage, StageStorage};
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

/// Connects the object stage. Returns `None` when the stage is disabled or
/// not configured, in which case uploads go to the chunked table.
pub async fn setup_stage(config: &AppConfig) -> Option<Arc<dyn StageStorage>> {
    if !config.enable_stage {
        info!("📦 Object stage disabled; payloads go to the chunked table");
        return None;
    }

    let Ok(endpoint_url) = env::var("MINIO_ENDPOINT") else {
        warn!("⚠️ MINIO_ENDPOINT not set; object stage unavailable");
        return None;
    };
    let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_default();
    let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_default();
    let bucket = env::var("MINIO_BUCKET")
        .unwrap_or_else(|_| config.stage_name.to_lowercase().replace('_', "-"));

    info!("☁️  Object stage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = s3_client.create_bucket().bucket(&bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
                return None;
            }
            info!("✅ Bucket '{}' created successfully", bucket);
        }
    }

    Some(Arc::new(S3StageStorage::new(s3_client, bucket)))
}
