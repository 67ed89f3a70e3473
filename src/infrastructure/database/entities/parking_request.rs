//! Parking request entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parking_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique among open requests (partial index, see migration)
    pub plate_number: String,

    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    #[sea_orm(nullable)]
    pub vehicle_id: Option<String>,

    #[sea_orm(nullable)]
    pub slot_id: Option<String>,

    pub check_in: DateTimeUtc,

    #[sea_orm(nullable)]
    pub expected_check_out: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub check_out: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Double")]
    pub charged_amount: f64,

    /// PENDING, APPROVED or REJECTED
    pub status: String,

    #[sea_orm(nullable)]
    pub approved_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parking_slot::Entity",
        from = "Column::SlotId",
        to = "super::parking_slot::Column::Id"
    )]
    ParkingSlot,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::parking_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParkingSlot.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
