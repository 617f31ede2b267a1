pub mod prelude;

pub mod analysis_results;
pub mod chat_history;
pub mod image_uploads;
pub mod inspection_reports;
pub mod report_images;
pub mod stage_file_chunks;
pub mod stage_file_data;
