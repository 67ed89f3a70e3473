//! Parking slot repository interface

use async_trait::async_trait;

use super::model::{CapacityChange, ParkingSlot, SlotFilter};
use crate::domain::DomainResult;

#[async_trait]
pub trait ParkingSlotRepository: Send + Sync {
    /// Insert a new slot. Fails with `Conflict` when the code is taken.
    async fn save(&self, slot: ParkingSlot) -> DomainResult<ParkingSlot>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSlot>>;

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ParkingSlot>>;

    /// All slots matching `filter`, ordered by code ascending.
    async fn find_all(&self, filter: &SlotFilter) -> DomainResult<Vec<ParkingSlot>>;

    /// Update name, location and fee. Capacity is changed through [`resize`].
    ///
    /// [`resize`]: ParkingSlotRepository::resize
    async fn update_details(&self, slot: &ParkingSlot) -> DomainResult<()>;

    /// Delete the slot only while nothing is parked on it.
    async fn delete_if_vacant(&self, id: &str) -> DomainResult<bool>;

    /// Apply a capacity change if the counters were not touched meanwhile.
    async fn resize(&self, id: &str, change: CapacityChange) -> DomainResult<bool>;
}
