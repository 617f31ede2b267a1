pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::analysis::AnalysisService;
use crate::services::analysis_ledger::AnalysisLedger;
use crate::services::binary_store::BinaryStore;
use crate::services::chat_service::ChatService;
use crate::services::completion::CompletionService;
use crate::services::file_registry::FileRegistry;
use crate::services::report_service::ReportService;
use crate::services::storage::StageStorage;
use crate::services::upload_ledger::UploadLedger;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::health::list_models,
        api::handlers::uploads::upload_images,
        api::handlers::uploads::list_uploads,
        api::handlers::uploads::get_upload,
        api::handlers::uploads::get_upload_content,
        api::handlers::uploads::list_file_versions,
        api::handlers::uploads::delete_upload,
        api::handlers::analyses::analyze_uploads,
        api::handlers::analyses::list_analyses,
        api::handlers::analyses::list_upload_analyses,
        api::handlers::analyses::export_analyses,
        api::handlers::metrics::get_metrics,
        api::handlers::metrics::get_reconciliation,
        api::handlers::reports::create_report,
        api::handlers::reports::get_report,
        api::handlers::reports::add_report_image,
        api::handlers::reports::remove_report_image,
        api::handlers::reports::update_report_status,
        api::handlers::chat::ask,
        api::handlers::chat::history,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::health::ModelsResponse,
            api::handlers::uploads::UploadResponse,
            api::handlers::uploads::FileVersionResponse,
            api::handlers::analyses::AnalyzeRequest,
            api::handlers::analyses::AnalysisResponse,
            api::handlers::reports::AddImageRequest,
            api::handlers::reports::UpdateStatusRequest,
            api::handlers::chat::ChatRequest,
            api::handlers::chat::ChatResponse,
            services::upload_service::UploadOutcome,
            services::upload_service::UploadItem,
            services::analysis::AnalysisOutcome,
            services::analysis::BatchItem,
            services::report_service::CreateReportRequest,
            services::report_service::ReportDetail,
            services::metrics::InspectionMetrics,
            services::reconciliation::ReconciliationRow,
            models::UploadStatus,
            models::StorageType,
            models::FileStatus,
            models::ConfidenceLevel,
            models::ReportStatus,
            models::ReportPriority,
        )
    ),
    tags(
        (name = "system", description = "Health and model catalogue"),
        (name = "uploads", description = "Image uploads and stored bytes"),
        (name = "analyses", description = "AI analysis of uploaded photographs"),
        (name = "views", description = "Metrics and storage reconciliation"),
        (name = "reports", description = "Inspection reports"),
        (name = "chat", description = "Questions about a photograph")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub binary: BinaryStore,
    pub uploads: UploadService,
    pub analyses: AnalysisLedger,
    pub analysis: AnalysisService,
    pub chat: ChatService,
    pub reports: ReportService,
}

impl AppState {
    /// Wires every service over one connection pool. `stage` is `None` when no
    /// object stage is configured; uploads then land in the chunked table.
    pub fn new(
        db: DatabaseConnection,
        config: Arc<AppConfig>,
        stage: Option<Arc<dyn StageStorage>>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        let registry = FileRegistry::new(db.clone());
        let binary = BinaryStore::new(stage, registry, config.stage_name.clone(), config.chunk_size);
        let upload_ledger = UploadLedger::new(db.clone());
        let analyses = AnalysisLedger::new(db.clone());

        Self {
            uploads: UploadService::new(upload_ledger.clone(), binary.clone(), config.clone()),
            analysis: AnalysisService::new(
                upload_ledger.clone(),
                analyses.clone(),
                binary.clone(),
                completion.clone(),
                config.clone(),
            ),
            chat: ChatService::new(db.clone(), upload_ledger, binary.clone(), completion, config.clone()),
            reports: ReportService::new(db.clone()),
            analyses,
            binary,
            config,
            db,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    use api::handlers::{analyses, chat, health, metrics, reports, uploads};

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .route("/models", get(health::list_models))
        .route("/uploads", post(uploads::upload_images).get(uploads::list_uploads))
        .route("/uploads/:id", get(uploads::get_upload).delete(uploads::delete_upload))
        .route("/uploads/:id/content", get(uploads::get_upload_content))
        .route("/uploads/:id/versions", get(uploads::list_file_versions))
        .route("/uploads/:id/analyses", get(analyses::list_upload_analyses))
        .route("/analyses", post(analyses::analyze_uploads).get(analyses::list_analyses))
        .route("/analyses/export", get(analyses::export_analyses))
        .route("/metrics", get(metrics::get_metrics))
        .route("/reconciliation", get(metrics::get_reconciliation))
        .route("/reports", post(reports::create_report))
        .route("/reports/:id", get(reports::get_report))
        .route("/reports/:id/images", post(reports::add_report_image))
        .route("/reports/:id/images/:link_id", delete(reports::remove_report_image))
        .route("/reports/:id/status", put(reports::update_report_status))
        .route("/chat", post(chat::ask))
        .route("/chat/:filename", get(chat::history))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024,
        ))
        .with_state(state)
}
