pub use super::analysis_results::Entity as AnalysisResults;
pub use super::chat_history::Entity as ChatHistory;
pub use super::image_uploads::Entity as ImageUploads;
pub use super::inspection_reports::Entity as InspectionReports;
pub use super::report_images::Entity as ReportImages;
pub use super::stage_file_chunks::Entity as StageFileChunks;
pub use super::stage_file_data::Entity as StageFileData;
