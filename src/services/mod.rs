pub mod analysis;
pub mod analysis_ledger;
pub mod binary_store;
pub mod chat_service;
pub mod chunk_store;
pub mod completion;
pub mod export;
pub mod file_registry;
pub mod metadata;
pub mod metrics;
pub mod reconciliation;
pub mod report_service;
pub mod retention;
pub mod storage;
pub mod upload_ledger;
pub mod upload_service;
pub mod worker;
