//! PDF entity
//!
//! Metadata for an uploaded file. The raw bytes live in the PDF store under
//! `stored_name`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pdfs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Public identifier handed to clients as `uuid`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub owner_id: Uuid,

    /// Storage key of the raw file
    #[sea_orm(column_type = "Text")]
    pub stored_name: String,

    /// Display name, changed by rename
    #[sea_orm(column_type = "Text")]
    pub original_name: String,

    pub file_size: i64,

    /// Unknown when the upload could not be parsed
    pub page_count: Option<i32>,

    /// Hex SHA-256 of the stored bytes
    #[sea_orm(column_type = "Text")]
    pub checksum: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,

    #[sea_orm(has_many = "super::highlight::Entity")]
    Highlights,

    #[sea_orm(has_many = "super::drawing::Entity")]
    Drawings,

    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::highlight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Highlights.def()
    }
}

impl Related<super::drawing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drawings.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
