//! SeaORM implementation of VehicleRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::{db_err, is_unique_violation};
use crate::domain::vehicle::{Vehicle, VehicleRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::vehicle;

pub struct SeaOrmVehicleRepository {
    db: DatabaseConnection,
}

impl SeaOrmVehicleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: vehicle::Model) -> Vehicle {
    Vehicle {
        id: m.id,
        plate_number: m.plate_number,
        color: m.color,
        owner_id: m.owner_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn duplicate_plate(e: sea_orm::DbErr) -> DomainError {
    if is_unique_violation(&e) {
        DomainError::Conflict("Vehicle with this plate number already exists".into())
    } else {
        db_err(e)
    }
}

#[async_trait]
impl VehicleRepository for SeaOrmVehicleRepository {
    async fn save(&self, v: Vehicle) -> DomainResult<Vehicle> {
        debug!("Saving vehicle: {}", v.plate_number);

        let model = vehicle::ActiveModel {
            id: Set(v.id),
            plate_number: Set(v.plate_number),
            color: Set(v.color),
            owner_id: Set(v.owner_id),
            created_at: Set(v.created_at),
            updated_at: Set(v.updated_at),
        };
        let inserted = model.insert(&self.db).await.map_err(duplicate_plate)?;
        Ok(model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_plate(&self, plate_number: &str) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find()
            .filter(vehicle::Column::PlateNumber.eq(plate_number))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self, owner_id: Option<&str>) -> DomainResult<Vec<Vehicle>> {
        let mut query = vehicle::Entity::find();
        if let Some(owner_id) = owner_id {
            query = query.filter(vehicle::Column::OwnerId.eq(owner_id));
        }
        let models = query
            .order_by_desc(vehicle::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, v: &Vehicle) -> DomainResult<()> {
        let result = vehicle::Entity::update_many()
            .col_expr(
                vehicle::Column::PlateNumber,
                Expr::value(v.plate_number.clone()),
            )
            .col_expr(vehicle::Column::Color, Expr::value(v.color.clone()))
            .col_expr(vehicle::Column::UpdatedAt, Expr::value(v.updated_at))
            .filter(vehicle::Column::Id.eq(v.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(duplicate_plate)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Vehicle", "id", v.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let result = vehicle::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}
