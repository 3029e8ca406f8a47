//! Drawing entity
//!
//! `drawing_data` is the client's stroke-path payload, stored as-is.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drawings")]
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

    #[sea_orm(column_type = "Json")]
    pub drawing_data: Json,

    pub created_at: DateTimeWithTimeZone,
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
