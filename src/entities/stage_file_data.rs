use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stage_file_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub file_id: String,
    pub filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub storage_type: String, // STAGE, CHUNKED_DB or MEMORY
    pub status: String,       // ACTIVE, SUPERSEDED or INACTIVE
    pub chunk_count: i32,
    pub content_hash: Option<String>, // xxh3-64 hex, set when the payload passed through the registry
    pub upload_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stage_file_chunks::Entity")]
    StageFileChunks,
}

impl Related<super::stage_file_chunks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StageFileChunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
