//! Parking slot entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parking_slots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub code: String,

    pub name: String,
    pub location: String,
    pub total_spaces: i32,

    /// Kept in `0..=total_spaces` by conditional updates
    pub available_spaces: i32,

    #[sea_orm(column_type = "Double")]
    pub charging_fee: f64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::parking_request::Entity")]
    ParkingRequests,
}

impl Related<super::parking_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParkingRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
