//! Vote entity.
//!
//! `poll_id` is copied from the choice so that a single vote per member and
//! poll can be enforced by a unique index.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    #[sea_orm(indexed)]
    pub choice_id: String,

    #[sea_orm(indexed)]
    pub poll_id: String,

    pub voted_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::poll_choice::Entity",
        from = "Column::ChoiceId",
        to = "super::poll_choice::Column::Id",
        on_delete = "Cascade"
    )]
    PollChoice,

    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::poll_choice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollChoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
