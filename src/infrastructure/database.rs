use crate::entities::{
    analysis_results, chat_history, image_uploads, inspection_reports, report_images,
    stage_file_chunks, stage_file_data,
};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Statement};
use std::env;
use std::time::Duration;
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://inspection.db?mode=rwc";

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Creates every table and index if missing. Parents are created before the
/// children that reference them.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🔄 Running SeaORM auto-migrations...");
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmts = vec![
        schema
            .create_table_from_entity(image_uploads::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(analysis_results::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(inspection_reports::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(report_images::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(chat_history::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(stage_file_data::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(stage_file_chunks::Entity)
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in stmts {
        db.execute(builder.build(&stmt)).await?;
    }

    let indexes = [
        // At most one ACTIVE version per logical filename.
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stage_file_data_active_filename \
         ON stage_file_data(filename) WHERE status = 'ACTIVE'",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stage_file_chunks_file_index \
         ON stage_file_chunks(file_id, chunk_index)",
        "CREATE INDEX IF NOT EXISTS idx_image_uploads_upload_time ON image_uploads(upload_time)",
        "CREATE INDEX IF NOT EXISTS idx_image_uploads_filename ON image_uploads(filename)",
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_upload_id ON analysis_results(upload_id)",
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_time ON analysis_results(analysis_time)",
        "CREATE INDEX IF NOT EXISTS idx_chat_history_filename ON chat_history(image_filename)",
    ];

    for sql in indexes {
        db.execute(Statement::from_string(builder, sql.to_string()))
            .await?;
    }

    info!("✅ Schema ready");
    Ok(())
}
