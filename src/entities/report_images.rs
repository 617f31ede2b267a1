use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub link_id: String,
    pub report_id: String,
    pub upload_id: String,
    pub analysis_id: Option<String>,
    pub image_order: i32,
    pub include_in_report: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inspection_reports::Entity",
        from = "Column::ReportId",
        to = "super::inspection_reports::Column::ReportId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    InspectionReports,
    #[sea_orm(
        belongs_to = "super::image_uploads::Entity",
        from = "Column::UploadId",
        to = "super::image_uploads::Column::UploadId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    ImageUploads,
    #[sea_orm(
        belongs_to = "super::analysis_results::Entity",
        from = "Column::AnalysisId",
        to = "super::analysis_results::Column::AnalysisId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    AnalysisResults,
}

impl Related<super::inspection_reports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InspectionReports.def()
    }
}

impl Related<super::image_uploads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImageUploads.def()
    }
}

impl Related<super::analysis_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalysisResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
