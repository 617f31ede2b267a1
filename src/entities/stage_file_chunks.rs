use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stage_file_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chunk_id: String,
    pub file_id: String,
    pub chunk_index: i32, // position in reconstruction, contiguous from 0
    pub chunk_size: i64,
    pub chunk_data: Vec<u8>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stage_file_data::Entity",
        from = "Column::FileId",
        to = "super::stage_file_data::Column::FileId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    StageFileData,
}

impl Related<super::stage_file_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StageFileData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
