use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analysis_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub analysis_id: String,
    pub upload_id: String,
    pub filename: String,
    #[sea_orm(column_type = "Text")]
    pub analysis_prompt: String,
    #[sea_orm(column_type = "Text")]
    pub analysis_result: String,
    pub confidence_score: f64,
    pub detected_issues: Json,  // ordered JSON array of strings
    pub recommendations: Json,  // ordered JSON array of strings
    pub analysis_time: DateTimeUtc,
    pub analyzer: String,
    pub processing_time_ms: i64,
    pub model_used: String,
    pub metadata: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image_uploads::Entity",
        from = "Column::UploadId",
        to = "super::image_uploads::Column::UploadId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    ImageUploads,
}

impl Related<super::image_uploads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImageUploads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
