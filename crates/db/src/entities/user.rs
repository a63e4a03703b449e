//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2 PHC hash
    #[serde(skip_serializing)]
    pub password: String,

    /// Access token for the API and the session cookie
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub token: String,

    #[sea_orm(default_value = false)]
    pub is_staff: bool,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub date_joined: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,

    #[sea_orm(has_many = "super::ride_rider::Entity")]
    RideRider,

    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        super::ride_rider::Relation::Ride.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::ride_rider::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
