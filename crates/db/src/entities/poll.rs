//! Poll entity for choosing future rides.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// NULL once the creating member is deleted
    #[sea_orm(nullable)]
    pub created_by: Option<String>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,

    /// Informational only, voting is not cut off
    #[sea_orm(nullable)]
    pub closes_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,

    #[sea_orm(has_many = "super::poll_choice::Entity")]
    PollChoice,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::poll_choice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollChoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
