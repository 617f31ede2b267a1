use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chat_id: String,
    pub image_filename: String,
    pub upload_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub user_message: String,
    #[sea_orm(column_type = "Text")]
    pub ai_response: String,
    pub model_used: String,
    pub chat_timestamp: DateTimeUtc,
    pub session_id: String,
    pub processing_time_ms: i64,
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
