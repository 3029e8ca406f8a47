//! Sticky note entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
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

    /// Page coordinates of the note anchor
    pub x: f64,

    pub y: f64,

    #[sea_orm(column_type = "Text")]
    pub content: String,

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
