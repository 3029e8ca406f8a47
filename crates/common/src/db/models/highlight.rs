//! Highlight entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Yellow, the marker color used when the client sends none
pub const DEFAULT_COLOR: &str = "#ffff00";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "highlights")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "_id")]
    pub id: Uuid,

    #[sea_orm(indexed)]
    #[serde(rename = "pdfUuid")]
    pub pdf_id: Uuid,

    #[sea_orm(indexed)]
    pub owner_id: Uuid,

    pub page_number: i32,

    #[sea_orm(column_type = "Text")]
    pub highlighted_text: String,

    /// Client layout data, e.g. `{x, y, width, height}`
    #[sea_orm(column_type = "Json", nullable)]
    pub position: Option<Json>,

    /// `{left, top, right, bottom}`
    #[sea_orm(column_type = "Json", nullable)]
    pub bounding_box: Option<Json>,

    #[sea_orm(column_type = "Text")]
    pub color: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pdf::Entity",
        from = "Column::PdfId",
        to = "super::pdf::Column::Id",
        on_delete = "Cascade"
    )]
    Pdf,
}

impl Related<super::pdf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pdf.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
