mod common;

use building_inspection_backend::entities::prelude::*;
use building_inspection_backend::error::LedgerError;
use building_inspection_backend::models::{ConfidenceLevel, ReportStatus, StorageType, UploadStatus};
use building_inspection_backend::services::analysis_ledger::{AnalysisLedger, NewAnalysis};
use building_inspection_backend::services::binary_store::BinaryStore;
use building_inspection_backend::services::file_registry::FileRegistry;
use building_inspection_backend::services::metrics::MetricsService;
use building_inspection_backend::services::reconciliation::ReconciliationService;
use building_inspection_backend::services::report_service::{CreateReportRequest, ReportService};
use building_inspection_backend::services::retention::RetentionService;
use building_inspection_backend::services::upload_ledger::{NewUpload, UploadFilter, UploadLedger};
use chrono::{Duration, Utc};
use common::{ctx, setup_test_db};
use sea_orm::{EntityTrait, ModelTrait, PaginatorTrait};
use serde_json::json;

fn photo(name: &str) -> NewUpload {
    NewUpload::new(
        name,
        format!("original_{}", name),
        2048,
        format!("@BUILDING_INSPECTION_STAGE/{}", name),
        "jpg",
        json!({}),
    )
}

fn analysis(upload_id: &str, confidence: f64) -> NewAnalysis {
    NewAnalysis::new(
        upload_id,
        "check roof",
        "Rust on gutter. Estimated confidence: 92%",
        confidence,
        vec!["Rusted gutter".into()],
        vec!["Replace gutter".into(), "Inspect fascia".into()],
        1200,
        "claude-4-sonnet",
    )
}

#[tokio::test]
async fn test_upload_then_analysis_end_to_end() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());
    let ctx = ctx();

    let upload_id = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();
    assert!(upload_id.starts_with("IMG_"));

    let stored = uploads.get_upload(&upload_id).await.unwrap();
    assert_eq!(stored.original_name, "original_a.jpg");
    assert_eq!(stored.status, UploadStatus::Uploaded.as_str());
    assert_eq!(stored.uploaded_by, "inspector");

    let analysis_id = analyses.record_analysis(&ctx, analysis(&upload_id, 0.92)).await.unwrap();
    assert!(analysis_id.starts_with("ANA_"));

    let entries = analyses.list_analyses(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].confidence_level(), ConfidenceLevel::High);
    assert_eq!(entries[0].analysis.filename, "a.jpg");
    assert_eq!(
        entries[0].upload.as_ref().map(|u| u.original_name.as_str()),
        Some("original_a.jpg")
    );

    let err = analyses
        .record_analysis(&ctx, analysis("nonexistent", 0.5))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ForeignKeyViolation(_)), "got {:?}", err);
    assert_eq!(AnalysisResults::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_analysis_rejects_out_of_range_confidence() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());
    let ctx = ctx();
    let upload_id = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();

    let err = analyses
        .record_analysis(&ctx, analysis(&upload_id, 1.5))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DataQualityViolation(_)));
}

#[tokio::test]
async fn test_list_uploads_newest_first_with_filters() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let ctx = ctx();

    let first = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();
    let second = uploads.record_upload(&ctx, photo("b.jpg")).await.unwrap();
    uploads.set_status(&second, UploadStatus::Active).await.unwrap();

    let all = uploads.list_uploads(&UploadFilter::default()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|u| u.upload_id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let active = uploads
        .list_uploads(&UploadFilter {
            status: Some(UploadStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].upload_id, second);

    let limited = uploads
        .list_uploads(&UploadFilter {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_referenced_upload_cannot_be_deleted() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());
    let ctx = ctx();

    let upload_id = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();
    analyses.record_analysis(&ctx, analysis(&upload_id, 0.8)).await.unwrap();

    let err = uploads.delete_upload(&upload_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::ForeignKeyViolation(_)), "got {:?}", err);
    assert!(uploads.get_upload(&upload_id).await.is_ok());

    let err = uploads.delete_upload("IMG_missing").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_file_record_with_chunks_cannot_be_deleted_first() {
    let db = setup_test_db().await;
    let registry = FileRegistry::new(db.clone());

    let file_id = registry
        .register_with_payload("a.jpg", b"0123456789", "image/jpeg", 4)
        .await
        .unwrap();
    let file = registry.get(&file_id).await.unwrap();
    assert_eq!(file.chunk_count, 3);

    let err = file.delete(&db).await.unwrap_err();
    assert!(building_inspection_backend::error::is_foreign_key_violation(&err));
    assert_eq!(StageFileChunks::find().count(&db).await.unwrap(), 3);
}

#[tokio::test]
async fn test_retention_purges_children_before_parents() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());
    let reports = ReportService::new(db.clone());
    let registry = FileRegistry::new(db.clone());
    let binary = BinaryStore::new(None, registry.clone(), "BUILDING_INSPECTION_STAGE", 4);
    let ctx = ctx();

    let upload_id = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();
    analyses.record_analysis(&ctx, analysis(&upload_id, 0.9)).await.unwrap();
    registry
        .register_with_payload("a.jpg", b"abcdefgh", "image/jpeg", 4)
        .await
        .unwrap();
    let detail = reports
        .create(
            &ctx,
            CreateReportRequest {
                report_name: "Roof".into(),
                inspection_date: None,
                inspector: None,
                building_address: None,
                building_type: None,
                inspection_type: None,
                priority: None,
                summary: None,
                upload_ids: vec![upload_id.clone()],
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.report.total_images, 1);

    let report = RetentionService::purge(&db, &binary, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(report.uploads, 1);
    assert_eq!(report.analyses, 1);
    assert_eq!(report.report_links, 1);
    assert_eq!(report.files, 1);
    assert_eq!(report.chunks, 2);

    assert_eq!(ImageUploads::find().count(&db).await.unwrap(), 0);
    assert_eq!(StageFileChunks::find().count(&db).await.unwrap(), 0);

    let after = reports.get(&detail.report.report_id).await.unwrap();
    assert_eq!(after.report.total_images, 0);
    assert_eq!(after.report.avg_confidence, None);
    assert_eq!(after.report.overall_status, ReportStatus::Draft.as_str());
}

#[tokio::test]
async fn test_retention_keeps_recent_records() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let binary = BinaryStore::new(None, FileRegistry::new(db.clone()), "S", 4);
    uploads.record_upload(&ctx(), photo("a.jpg")).await.unwrap();

    let report = RetentionService::purge_older_than_days(&db, &binary, 90).await.unwrap();
    assert_eq!(report.uploads, 0);
    assert_eq!(ImageUploads::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_metrics_over_empty_and_populated_ledgers() {
    let db = setup_test_db().await;

    let empty = MetricsService::metrics(&db, 30).await.unwrap();
    assert_eq!(empty.total_images, 0);
    assert_eq!(empty.total_analyses, 0);
    assert_eq!(empty.avg_confidence, None);
    assert_eq!(empty.total_storage_bytes, 0);

    let uploads = UploadLedger::new(db.clone());
    let analyses = AnalysisLedger::new(db.clone());
    let ctx = ctx();
    let a = uploads.record_upload(&ctx, photo("a.jpg")).await.unwrap();
    let b = uploads.record_upload(&ctx, photo("b.jpg")).await.unwrap();
    analyses.record_analysis(&ctx, analysis(&a, 0.8)).await.unwrap();
    analyses.record_analysis(&ctx, analysis(&b, 0.6)).await.unwrap();

    let m = MetricsService::metrics(&db, 30).await.unwrap();
    assert_eq!(m.total_images, 2);
    assert_eq!(m.total_analyses, 2);
    assert!((m.avg_confidence.unwrap() - 0.7).abs() < 1e-9);
    assert_eq!(m.unique_analyzers, 1);
    assert_eq!(m.active_days, 1);
    assert_eq!(m.total_storage_bytes, 4096);
    assert_eq!(m.total_issues, 2);
    assert_eq!(m.total_recommendations, 4);
}

#[tokio::test]
async fn test_oversized_windows_are_rejected_not_panicking() {
    let db = setup_test_db().await;
    let binary = BinaryStore::new(None, FileRegistry::new(db.clone()), "S", 4);
    UploadLedger::new(db.clone()).record_upload(&ctx(), photo("a.jpg")).await.unwrap();

    for days in [100_000_000, i64::MAX, -1] {
        assert!(matches!(
            MetricsService::metrics(&db, days).await,
            Err(LedgerError::DataQualityViolation(_))
        ));
        assert!(matches!(
            RetentionService::purge_older_than_days(&db, &binary, days).await,
            Err(LedgerError::DataQualityViolation(_))
        ));
    }
    assert_eq!(ImageUploads::find().count(&db).await.unwrap(), 1);
    assert_eq!(MetricsService::metrics(&db, 36_500).await.unwrap().total_images, 1);
}

#[tokio::test]
async fn test_reconciliation_reports_effective_storage() {
    let db = setup_test_db().await;
    let uploads = UploadLedger::new(db.clone());
    let registry = FileRegistry::new(db.clone());
    let ctx = ctx();

    uploads.record_upload(&ctx, photo("staged.jpg")).await.unwrap();
    uploads
        .record_upload(
            &ctx,
            NewUpload::new("chunked.jpg", "chunked.jpg", 8, "chunked://x", "jpg", json!({})),
        )
        .await
        .unwrap();
    registry
        .register_with_payload("chunked.jpg", b"abcdefgh", "image/jpeg", 4)
        .await
        .unwrap();
    uploads
        .record_upload(
            &ctx,
            NewUpload::new("lost.jpg", "lost.jpg", 8, "memory://lost.jpg", "jpg", json!({})),
        )
        .await
        .unwrap();

    let rows = ReconciliationService::reconcile(&db, &uploads, &UploadFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    let by_name = |name: &str| rows.iter().find(|r| r.filename == name).unwrap().clone();
    assert_eq!(by_name("staged.jpg").effective_storage_type, StorageType::Stage);
    assert!(by_name("staged.jpg").has_binary_data);

    let chunked = by_name("chunked.jpg");
    assert_eq!(chunked.effective_storage_type, StorageType::ChunkedDb);
    assert_eq!(chunked.file_status.as_deref(), Some("ACTIVE"));

    let lost = by_name("lost.jpg");
    assert_eq!(lost.effective_storage_type, StorageType::Memory);
    assert!(!lost.has_binary_data);
    assert!(lost.at_risk);
}
