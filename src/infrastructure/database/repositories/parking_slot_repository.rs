//! SeaORM implementation of ParkingSlotRepository
//!
//! Capacity changes are single conditional UPDATE statements; the WHERE
//! clause carries the guard, `rows_affected` tells whether it held. Taking
//! and giving back spaces happens inside the occupancy ledger's
//! transactions.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use super::{db_err, is_unique_violation};
use crate::domain::parking_slot::{
    CapacityChange, ParkingSlot, ParkingSlotRepository, SlotFilter,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::parking_slot;

pub struct SeaOrmParkingSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmParkingSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: parking_slot::Model) -> ParkingSlot {
    ParkingSlot {
        id: m.id,
        code: m.code,
        name: m.name,
        location: m.location,
        total_spaces: m.total_spaces,
        available_spaces: m.available_spaces,
        charging_fee: m.charging_fee,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

#[async_trait]
impl ParkingSlotRepository for SeaOrmParkingSlotRepository {
    async fn save(&self, slot: ParkingSlot) -> DomainResult<ParkingSlot> {
        debug!("Saving parking slot: {}", slot.code);

        let model = parking_slot::ActiveModel {
            id: Set(slot.id),
            code: Set(slot.code),
            name: Set(slot.name),
            location: Set(slot.location),
            total_spaces: Set(slot.total_spaces),
            available_spaces: Set(slot.available_spaces),
            charging_fee: Set(slot.charging_fee),
            created_at: Set(slot.created_at),
            updated_at: Set(slot.updated_at),
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::Conflict("Parking code already exists".into())
            } else {
                db_err(e)
            }
        })?;
        Ok(model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSlot>> {
        let model = parking_slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ParkingSlot>> {
        let model = parking_slot::Entity::find()
            .filter(parking_slot::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self, filter: &SlotFilter) -> DomainResult<Vec<ParkingSlot>> {
        let mut query = parking_slot::Entity::find();
        if filter.available_only {
            query = query.filter(parking_slot::Column::AvailableSpaces.gt(0));
        }

        let models = query
            .order_by_asc(parking_slot::Column::Code)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        // Location matching is case-insensitive on every backend.
        Ok(models
            .into_iter()
            .map(model_to_domain)
            .filter(|slot| filter.matches(slot))
            .collect())
    }

    async fn update_details(&self, slot: &ParkingSlot) -> DomainResult<()> {
        debug!("Updating parking slot details: {}", slot.id);

        let result = parking_slot::Entity::update_many()
            .col_expr(parking_slot::Column::Name, Expr::value(slot.name.clone()))
            .col_expr(
                parking_slot::Column::Location,
                Expr::value(slot.location.clone()),
            )
            .col_expr(
                parking_slot::Column::ChargingFee,
                Expr::value(slot.charging_fee),
            )
            .col_expr(parking_slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(parking_slot::Column::Id.eq(slot.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ParkingSlot", "id", slot.id.clone()));
        }
        Ok(())
    }

    async fn delete_if_vacant(&self, id: &str) -> DomainResult<bool> {
        let result = parking_slot::Entity::delete_many()
            .filter(parking_slot::Column::Id.eq(id))
            .filter(
                Expr::col(parking_slot::Column::AvailableSpaces)
                    .eq(Expr::col(parking_slot::Column::TotalSpaces)),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn resize(&self, id: &str, change: CapacityChange) -> DomainResult<bool> {
        let result = parking_slot::Entity::update_many()
            .col_expr(
                parking_slot::Column::TotalSpaces,
                Expr::value(change.new_total),
            )
            .col_expr(
                parking_slot::Column::AvailableSpaces,
                Expr::value(change.new_available),
            )
            .col_expr(parking_slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(parking_slot::Column::Id.eq(id))
            .filter(parking_slot::Column::TotalSpaces.eq(change.observed_total))
            .filter(parking_slot::Column::AvailableSpaces.eq(change.observed_available))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}

/// Take one space: `available -= 1` only while `available > 0`.
pub(super) async fn take_space<C: ConnectionTrait>(conn: &C, id: &str) -> Result<bool, DbErr> {
    let result = parking_slot::Entity::update_many()
        .col_expr(
            parking_slot::Column::AvailableSpaces,
            Expr::col(parking_slot::Column::AvailableSpaces).sub(1),
        )
        .col_expr(parking_slot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(parking_slot::Column::Id.eq(id))
        .filter(parking_slot::Column::AvailableSpaces.gt(0))
        .exec(conn)
        .await?;

    debug!("take_space({}): rows_affected={}", id, result.rows_affected);
    Ok(result.rows_affected == 1)
}
