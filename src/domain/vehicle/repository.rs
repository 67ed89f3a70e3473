//! Vehicle repository interface

use async_trait::async_trait;

use super::model::Vehicle;
use crate::domain::DomainResult;

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Insert a vehicle. `Conflict` when the plate is already registered.
    async fn save(&self, vehicle: Vehicle) -> DomainResult<Vehicle>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Vehicle>>;

    async fn find_by_plate(&self, plate_number: &str) -> DomainResult<Option<Vehicle>>;

    /// Vehicles of one owner, or every vehicle when `owner_id` is `None`.
    async fn find_all(&self, owner_id: Option<&str>) -> DomainResult<Vec<Vehicle>>;

    /// Update plate and color. `Conflict` on a duplicate plate.
    async fn update(&self, vehicle: &Vehicle) -> DomainResult<()>;

    async fn delete(&self, id: &str) -> DomainResult<bool>;
}
