//! Ride entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Planned start time
    #[sea_orm(indexed)]
    pub date_time: DateTimeWithTimeZone,

    pub start_point: String,

    pub end_point: String,

    /// Storage key of the header image
    #[sea_orm(nullable)]
    pub header_photo: Option<String>,

    /// Storage key of the GPX route
    #[sea_orm(nullable)]
    pub gpx_file: Option<String>,

    /// Calimoto route link, empty when unset
    pub calimoto_url: String,

    /// Relive video link, empty when unset
    pub relive_url: String,

    #[sea_orm(default_value = false)]
    pub completed: bool,

    /// NULL once the creating member is deleted
    #[sea_orm(nullable)]
    pub created_by: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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

    #[sea_orm(has_many = "super::ride_rider::Entity")]
    RideRider,

    #[sea_orm(has_many = "super::ride_photo::Entity")]
    RidePhoto,

    #[sea_orm(has_many = "super::ride_comment::Entity")]
    RideComment,
}

impl Related<super::ride_photo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RidePhoto.def()
    }
}

impl Related<super::ride_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RideComment.def()
    }
}

/// Participants, through `ride_rider`.
impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::ride_rider::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::ride_rider::Relation::Ride.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
