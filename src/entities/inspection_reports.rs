use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inspection_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub report_id: String,
    pub report_name: String,
    pub inspection_date: Date,
    pub inspector: String,
    pub building_address: Option<String>,
    pub building_type: Option<String>,
    pub inspection_type: Option<String>,
    pub overall_status: String,
    pub priority: String,
    pub total_images: i32,
    pub total_issues: i32,
    pub avg_confidence: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::report_images::Entity")]
    ReportImages,
}

impl Related<super::report_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
