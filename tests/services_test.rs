mod common;

use building_inspection_backend::error::LedgerError;
use building_inspection_backend::models::{ConfidenceLevel, ReportPriority, ReportStatus, StorageType, UploadStatus};
use building_inspection_backend::services::analysis::AnalysisService;
use building_inspection_backend::services::analysis_ledger::{AnalysisLedger, string_list};
use building_inspection_backend::services::binary_store::BinaryStore;
use building_inspection_backend::services::chat_service::ChatService;
use building_inspection_backend::services::completion::CompletionService;
use building_inspection_backend::services::file_registry::FileRegistry;
use building_inspection_backend::services::report_service::{CreateReportRequest, ReportService};
use building_inspection_backend::services::reconciliation::ReconciliationService;
use building_inspection_backend::services::upload_ledger::{UploadFilter, UploadLedger};
use building_inspection_backend::services::upload_service::{IncomingFile, UploadService};
use bytes::Bytes;
use common::{FailingCompletion, MockStage, ScriptedCompletion, ctx, setup_test_db, test_config};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

struct Fixture {
    uploads: UploadService,
    analyses: AnalysisLedger,
    analysis: AnalysisService,
    chat: ChatService,
    reports: ReportService,
    binary: BinaryStore,
}

fn fixture(
    db: &DatabaseConnection,
    stage: Option<Arc<MockStage>>,
    completion: Arc<dyn CompletionService>,
) -> Fixture {
    let config = Arc::new(test_config());
    let stage = stage.map(|s| s as Arc<dyn building_inspection_backend::services::storage::StageStorage>);
    let binary = BinaryStore::new(
        stage,
        FileRegistry::new(db.clone()),
        config.stage_name.clone(),
        config.chunk_size,
    );
    let ledger = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());

    Fixture {
        uploads: UploadService::new(ledger.clone(), binary.clone(), config.clone()),
        analysis: AnalysisService::new(
            ledger.clone(),
            analyses.clone(),
            binary.clone(),
            completion.clone(),
            config.clone(),
        ),
        chat: ChatService::new(db.clone(), ledger, binary.clone(), completion, config),
        reports: ReportService::new(db.clone()),
        analyses,
        binary,
    }
}

fn jpeg_file(name: &str, body: &'static [u8]) -> IncomingFile {
    IncomingFile {
        original_name: name.to_string(),
        content_type: Some("image/jpeg".to_string()),
        data: Bytes::from_static(body),
    }
}

fn report_request(name: &str, upload_ids: Vec<String>) -> CreateReportRequest {
    CreateReportRequest {
        report_name: name.to_string(),
        inspection_date: None,
        inspector: None,
        building_address: Some("1 Queen St".to_string()),
        building_type: None,
        inspection_type: None,
        priority: None,
        summary: None,
        upload_ids,
    }
}

#[tokio::test]
async fn test_upload_goes_to_stage_when_available() {
    let db = setup_test_db().await;
    let stage = Arc::new(MockStage::new());
    let fx = fixture(&db, Some(stage.clone()), Arc::new(ScriptedCompletion::new("ok")));

    let outcome = fx.uploads.upload(&ctx(), jpeg_file("roof.jpg", b"stage bytes")).await.unwrap();
    assert_eq!(outcome.storage_type, StorageType::Stage);
    assert_eq!(outcome.status, UploadStatus::Active);
    assert!(outcome.location.starts_with("@BUILDING_INSPECTION_STAGE/"));
    assert!(outcome.filename.ends_with("_roof.jpg"));
    assert!(stage.contains(&outcome.filename));

    let (bytes, file_type) = fx.uploads.content(&outcome.upload_id).await.unwrap();
    assert_eq!(bytes, b"stage bytes");
    assert_eq!(file_type, "image/jpeg");
}

#[tokio::test]
async fn test_upload_falls_back_to_chunks_when_stage_size_mismatches() {
    let db = setup_test_db().await;
    let stage = Arc::new(MockStage::truncating());
    let fx = fixture(&db, Some(stage.clone()), Arc::new(ScriptedCompletion::new("ok")));

    let outcome = fx.uploads.upload(&ctx(), jpeg_file("wall.jpg", b"0123456789")).await.unwrap();
    assert_eq!(outcome.storage_type, StorageType::ChunkedDb);
    assert!(outcome.location.starts_with("chunked://FILE_"));
    assert!(!stage.contains(&outcome.filename));
    assert!(stage.objects.lock().unwrap().is_empty());

    let file = fx.binary.registry().active_for(&outcome.filename).await.unwrap().unwrap();
    assert_eq!(file.chunk_count, 3);
    assert_eq!(fx.binary.fetch(&outcome.location).await.unwrap(), b"0123456789");
}

#[tokio::test]
async fn test_upload_many_isolates_rejected_files() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("ok")));

    let items = fx
        .uploads
        .upload_many(&ctx(), vec![jpeg_file("a.jpg", b"abc"), jpeg_file("empty.jpg", b"")])
        .await;
    assert_eq!(items.len(), 2);
    assert!(items[0].outcome.is_some());
    assert!(items[1].outcome.is_none());
    assert!(items[1].error.as_deref().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_same_name_uploads_in_one_batch_keep_their_own_bytes() {
    let db = setup_test_db().await;
    let stage = Arc::new(MockStage::new());
    let fx = fixture(&db, Some(stage.clone()), Arc::new(ScriptedCompletion::new("ok")));

    let items = fx
        .uploads
        .upload_many(
            &ctx(),
            vec![jpeg_file("roof.jpg", b"FIRST-PHOTO"), jpeg_file("roof.jpg", b"SECOND-PHOTO")],
        )
        .await;
    let first = items[0].outcome.clone().unwrap();
    let second = items[1].outcome.clone().unwrap();
    assert_ne!(first.filename, second.filename);
    assert_eq!(stage.objects.lock().unwrap().len(), 2);

    assert_eq!(fx.uploads.content(&first.upload_id).await.unwrap().0, b"FIRST-PHOTO");
    assert_eq!(fx.uploads.content(&second.upload_id).await.unwrap().0, b"SECOND-PHOTO");

    let rows = ReconciliationService::reconcile(&db, fx.uploads.ledger(), &UploadFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.file_status.as_deref() == Some("ACTIVE")));
    assert_ne!(rows[0].file_id, rows[1].file_id);
}

#[tokio::test]
async fn test_remove_upload_retires_file_version() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("ok")));

    let outcome = fx.uploads.upload(&ctx(), jpeg_file("a.jpg", b"abcdef")).await.unwrap();
    fx.uploads.remove(&outcome.upload_id).await.unwrap();

    assert!(fx.binary.registry().active_for(&outcome.filename).await.unwrap().is_none());
    let versions = fx.binary.registry().versions(&outcome.filename).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].status, "INACTIVE");
}

#[tokio::test]
async fn test_analysis_records_parsed_confidence_and_lists() {
    let db = setup_test_db().await;
    let completion = Arc::new(ScriptedCompletion::new(
        "Render is cracked near the eaves. Estimated confidence: 92%",
    ));
    let fx = fixture(&db, None, completion.clone());
    let ctx = ctx();

    let upload = fx.uploads.upload(&ctx, jpeg_file("eaves.jpg", b"pixels")).await.unwrap();
    let outcome = fx
        .analysis
        .analyze_upload(&ctx, &upload.upload_id, "check render")
        .await
        .unwrap();

    assert!(!outcome.fallback);
    assert!((outcome.confidence_score - 0.92).abs() < 1e-9);
    assert_eq!(outcome.confidence_level, ConfidenceLevel::High);
    assert_eq!(outcome.detected_issues, vec!["Cracked render", "Rusted flashing"]);
    assert_eq!(outcome.recommendations, vec!["Repair render", "Replace flashing"]);
    assert_eq!(completion.prompts.lock().unwrap().len(), 3);

    let stored = fx.analyses.get_analysis(&outcome.analysis_id).await.unwrap();
    assert_eq!(stored.analyzer, "inspector");
    assert_eq!(stored.model_used, "claude-4-sonnet");
    assert_eq!(string_list(&stored.detected_issues).len(), 2);
}

#[tokio::test]
async fn test_analysis_defaults_confidence_when_unstated() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("Looks sound.")));
    let ctx = ctx();

    let upload = fx.uploads.upload(&ctx, jpeg_file("deck.jpg", b"pixels")).await.unwrap();
    let outcome = fx.analysis.analyze_upload(&ctx, &upload.upload_id, "deck").await.unwrap();
    assert!((outcome.confidence_score - 0.85).abs() < 1e-9);
    assert_eq!(outcome.confidence_level, ConfidenceLevel::Medium);
}

#[tokio::test]
async fn test_failed_completion_records_fallback_report() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(FailingCompletion));
    let ctx = ctx();

    let upload = fx.uploads.upload(&ctx, jpeg_file("roof.jpg", b"pixels")).await.unwrap();
    let outcome = fx.analysis.analyze_upload(&ctx, &upload.upload_id, "roof").await.unwrap();

    assert!(outcome.fallback);
    assert_eq!(outcome.confidence_score, 0.0);
    assert_eq!(outcome.confidence_level, ConfidenceLevel::Low);
    assert!(outcome.detected_issues.contains(&"Manual inspection required".to_string()));
    assert!(outcome.analysis_result.contains("roof.jpg"));

    let stored = fx.analyses.get_analysis(&outcome.analysis_id).await.unwrap();
    assert_eq!(stored.metadata["fallback"], serde_json::json!(true));
}

#[tokio::test]
async fn test_batch_analysis_isolates_unknown_uploads() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("Fine. Confidence 75%")));
    let ctx = ctx();

    let upload = fx.uploads.upload(&ctx, jpeg_file("a.jpg", b"pixels")).await.unwrap();
    let items = fx
        .analysis
        .analyze_batch(&ctx, &[upload.upload_id.clone(), "IMG_missing".to_string()], "check")
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(items[0].outcome.is_some());
    assert!(items[1].outcome.is_none());
    assert!(items[1].error.is_some());
    assert_eq!(fx.analyses.analyses_for_upload(&upload.upload_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_analysis_rejects_unknown_model() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("ok")));
    let ctx = ctx().with_model("gpt-2");

    let err = fx.analysis.analyze_batch(&ctx, &["IMG_1".to_string()], "x").await.unwrap_err();
    assert!(matches!(err, LedgerError::DataQualityViolation(_)));
}

#[tokio::test]
async fn test_chat_history_is_replayed_in_order() {
    let db = setup_test_db().await;
    let completion = Arc::new(ScriptedCompletion::new("It is surface rust."));
    let fx = fixture(&db, None, completion.clone());
    let ctx = ctx();

    let upload = fx.uploads.upload(&ctx, jpeg_file("gutter.jpg", b"pixels")).await.unwrap();
    let first = fx.chat.ask(&ctx, &upload.filename, "What is that stain?").await.unwrap();
    assert_eq!(first.upload_id.as_deref(), Some(upload.upload_id.as_str()));
    fx.chat.ask(&ctx, &upload.filename, "Is it urgent?").await.unwrap();

    let history = fx.chat.history(&upload.filename).await.unwrap();
    let questions: Vec<&str> = history.iter().map(|c| c.user_message.as_str()).collect();
    assert_eq!(questions, vec!["What is that stain?", "Is it urgent?"]);

    let prompts = completion.prompts.lock().unwrap();
    assert!(prompts[1].contains("User: What is that stain?\nInspector: It is surface rust.\n"));
}

#[tokio::test]
async fn test_chat_rejects_empty_question_and_survives_outage() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(FailingCompletion));
    let ctx = ctx();

    let err = fx.chat.ask(&ctx, "a.jpg", "   ").await.unwrap_err();
    assert!(matches!(err, LedgerError::DataQualityViolation(_)));

    let record = fx.chat.ask(&ctx, "unknown.jpg", "Anything wrong?").await.unwrap();
    assert!(record.upload_id.is_none());
    assert!(record.ai_response.contains("unavailable"));
}

#[tokio::test]
async fn test_report_lifecycle_recomputes_totals() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("Minor. Confidence: 80%")));
    let ctx = ctx();

    let a = fx.uploads.upload(&ctx, jpeg_file("a.jpg", b"aaaa")).await.unwrap();
    let b = fx.uploads.upload(&ctx, jpeg_file("b.jpg", b"bbbb")).await.unwrap();
    fx.analysis.analyze_upload(&ctx, &a.upload_id, "check").await.unwrap();

    let detail = fx
        .reports
        .create(&ctx, report_request("Unit 4", vec![a.upload_id.clone()]))
        .await
        .unwrap();
    let report_id = detail.report.report_id.clone();
    assert_eq!(detail.report.overall_status, ReportStatus::Draft.as_str());
    assert_eq!(detail.report.priority, ReportPriority::Medium.as_str());
    assert_eq!(detail.report.inspector, "inspector");
    assert_eq!(detail.report.total_images, 1);
    assert_eq!(detail.report.total_issues, 2);
    assert!((detail.report.avg_confidence.unwrap() - 0.8).abs() < 1e-9);
    assert!(detail.images[0].analysis_id.is_some());

    let detail = fx.reports.add_image(&report_id, &b.upload_id, Some("north wall".into())).await.unwrap();
    assert_eq!(detail.report.total_images, 2);
    assert_eq!(detail.images[1].image_order, 1);
    assert!(detail.images[1].analysis_id.is_none());
    assert!((detail.report.avg_confidence.unwrap() - 0.8).abs() < 1e-9);

    let link_id = detail.images[0].link_id.clone();
    let detail = fx.reports.remove_image(&report_id, &link_id).await.unwrap();
    assert_eq!(detail.report.total_images, 1);
    assert_eq!(detail.report.total_issues, 0);
    assert_eq!(detail.report.avg_confidence, None);

    let detail = fx.reports.set_status(&report_id, ReportStatus::Completed).await.unwrap();
    assert_eq!(detail.report.overall_status, "COMPLETED");

    let err = fx.reports.remove_image(&report_id, &link_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_report_with_unknown_upload_writes_nothing() {
    let db = setup_test_db().await;
    let fx = fixture(&db, None, Arc::new(ScriptedCompletion::new("ok")));

    let err = fx
        .reports
        .create(&ctx(), report_request("Ghost", vec!["IMG_missing".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ForeignKeyViolation(_)), "got {:?}", err);

    use building_inspection_backend::entities::prelude::InspectionReports;
    use sea_orm::{EntityTrait, PaginatorTrait};
    assert_eq!(InspectionReports::find().count(&db).await.unwrap(), 0);
}
