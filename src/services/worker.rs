use crate::config::AppConfig;
use crate::services::binary_store::BinaryStore;
use crate::services::retention::RetentionService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Runs the retention sweep every `cleanup_interval_secs` until shutdown.
pub struct BackgroundWorker {
    db: DatabaseConnection,
    binary: BinaryStore,
    config: Arc<AppConfig>,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        db: DatabaseConnection,
        binary: BinaryStore,
        config: Arc<AppConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            binary,
            config,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Background worker started (retention {} days, every {}s)",
            self.config.retention_days,
            self.config.cleanup_interval_secs
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(Duration::from_secs(self.config.cleanup_interval_secs)) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    async fn perform_cleanup(&self) {
        tracing::info!("🧹 Running retention sweep...");
        match RetentionService::purge_older_than_days(&self.db, &self.binary, self.config.retention_days).await {
            Ok(report) => tracing::info!("✅ Retention sweep completed: {:?}", report),
            Err(e) => tracing::error!("❌ Retention sweep failed: {}", e),
        }
    }
}
