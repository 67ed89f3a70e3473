//! Vehicle registry
//!
//! Users manage their own vehicles; administrators see and manage all.

use std::sync::Arc;

use tracing::info;

use crate::domain::parking_request::normalize_plate;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, Vehicle};
use crate::shared::clock::SharedClock;

/// Who is acting on the registry
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub user_id: &'a str,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VehicleUpdate {
    pub plate_number: Option<String>,
    pub color: Option<String>,
}

pub struct VehicleService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl VehicleService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn register(
        &self,
        owner_id: &str,
        plate_number: &str,
        color: &str,
    ) -> DomainResult<Vehicle> {
        if normalize_plate(plate_number).is_empty() {
            return Err(DomainError::Validation("Plate number is required".into()));
        }
        let vehicle = Vehicle::new(owner_id, plate_number, color, self.clock.now());
        let vehicle = self.repos.vehicles().save(vehicle).await?;
        info!(plate = %vehicle.plate_number, owner_id, "Vehicle registered");
        Ok(vehicle)
    }

    pub async fn list(&self, actor: Actor<'_>) -> DomainResult<Vec<Vehicle>> {
        let owner = (!actor.is_admin).then_some(actor.user_id);
        self.repos.vehicles().find_all(owner).await
    }

    pub async fn get(&self, id: &str, actor: Actor<'_>) -> DomainResult<Vehicle> {
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", id))?;

        if !actor.is_admin && vehicle.owner_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "You can only access your own vehicles".into(),
            ));
        }
        Ok(vehicle)
    }

    pub async fn update(
        &self,
        id: &str,
        actor: Actor<'_>,
        update: VehicleUpdate,
    ) -> DomainResult<Vehicle> {
        let mut vehicle = self.get(id, actor).await?;

        if let Some(plate) = update.plate_number {
            let plate = normalize_plate(&plate);
            if plate.is_empty() {
                return Err(DomainError::Validation("Plate number is required".into()));
            }
            if plate != vehicle.plate_number && self.has_open_request(&vehicle).await? {
                return Err(DomainError::Conflict(
                    "Cannot change the plate of a vehicle with an active parking".into(),
                ));
            }
            vehicle.plate_number = plate;
        }
        if let Some(color) = update.color {
            vehicle.color = color.trim().to_string();
        }
        vehicle.updated_at = self.clock.now();

        self.repos.vehicles().update(&vehicle).await?;
        Ok(vehicle)
    }

    pub async fn delete(&self, id: &str, actor: Actor<'_>) -> DomainResult<()> {
        let vehicle = self.get(id, actor).await?;
        if self.has_open_request(&vehicle).await? {
            return Err(DomainError::Conflict(
                "Cannot delete a vehicle with an active parking".into(),
            ));
        }
        if !self.repos.vehicles().delete(&vehicle.id).await? {
            return Err(DomainError::not_found("Vehicle", "id", id));
        }
        info!(plate = %vehicle.plate_number, "Vehicle deleted");
        Ok(())
    }

    async fn has_open_request(&self, vehicle: &Vehicle) -> DomainResult<bool> {
        Ok(self
            .repos
            .parking_requests()
            .find_open_by_plate(&vehicle.plate_number)
            .await?
            .is_some())
    }
}
