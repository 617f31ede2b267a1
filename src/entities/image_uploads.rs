use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_uploads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub upload_id: String,
    pub filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub upload_time: DateTimeUtc,
    pub stage_path: String,
    pub file_type: String,
    pub image_width: Option<i32>,
    pub image_height: Option<i32>,
    pub uploaded_by: String,
    pub status: String,
    pub metadata: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::analysis_results::Entity")]
    AnalysisResults,
    #[sea_orm(has_many = "super::report_images::Entity")]
    ReportImages,
    #[sea_orm(has_many = "super::chat_history::Entity")]
    ChatHistory,
}

impl Related<super::analysis_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalysisResults.def()
    }
}

impl Related<super::report_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportImages.def()
    }
}

impl Related<super::chat_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
