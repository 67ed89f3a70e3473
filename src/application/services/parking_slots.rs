//! Parking slot administration

use std::sync::Arc;

use tracing::info;

use crate::domain::parking_slot::{validate_capacity, validate_fee, CapacityChange};
use crate::domain::{DomainError, DomainResult, ParkingSlot, RepositoryProvider, SlotFilter};
use crate::shared::clock::SharedClock;

/// Concurrent entries/exits may move the counters between read and write.
const RESIZE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub code: String,
    pub name: String,
    pub location: String,
    pub total_spaces: i32,
    pub charging_fee: f64,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SlotUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub total_spaces: Option<i32>,
    pub charging_fee: Option<f64>,
}

pub struct ParkingSlotService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl ParkingSlotService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn create_slot(&self, new: NewSlot) -> DomainResult<ParkingSlot> {
        let slot = ParkingSlot::new(
            &new.code,
            &new.name,
            &new.location,
            new.total_spaces,
            new.charging_fee,
            self.clock.now(),
        )?;
        let slot = self.repos.parking_slots().save(slot).await?;
        info!(code = %slot.code, total = slot.total_spaces, "🅿️  Parking slot created");
        Ok(slot)
    }

    pub async fn list_slots(&self, filter: &SlotFilter) -> DomainResult<Vec<ParkingSlot>> {
        self.repos.parking_slots().find_all(filter).await
    }

    pub async fn get_slot(&self, id: &str) -> DomainResult<ParkingSlot> {
        self.repos
            .parking_slots()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingSlot", "id", id))
    }

    /// Update details and capacity.
    ///
    /// A new total keeps the current occupants:
    /// `available = new_total - occupied`, refused below the occupancy.
    /// Capacity is applied first, so a refused resize leaves the other
    /// fields untouched.
    pub async fn update_slot(&self, id: &str, update: SlotUpdate) -> DomainResult<ParkingSlot> {
        let mut slot = self.get_slot(id).await?;

        if let Some(fee) = update.charging_fee {
            validate_fee(fee)?;
        }
        if let Some(total) = update.total_spaces {
            validate_capacity(total)?;
            self.resize(id, total).await?;
        }

        let details_changed =
            update.name.is_some() || update.location.is_some() || update.charging_fee.is_some();
        if details_changed {
            if let Some(name) = update.name {
                slot.name = name.trim().to_string();
            }
            if let Some(location) = update.location {
                slot.location = location.trim().to_string();
            }
            if let Some(fee) = update.charging_fee {
                slot.charging_fee = fee;
            }
            slot.updated_at = self.clock.now();
            self.repos.parking_slots().update_details(&slot).await?;
        }

        self.get_slot(id).await
    }

    async fn resize(&self, id: &str, new_total: i32) -> DomainResult<()> {
        let slots = self.repos.parking_slots();

        for _ in 0..RESIZE_ATTEMPTS {
            let current = self.get_slot(id).await?;
            let occupied = current.occupied_spaces();
            if new_total < occupied {
                return Err(DomainError::Conflict(format!(
                    "Total spaces cannot be less than the {} occupied spaces",
                    occupied
                )));
            }

            let change = CapacityChange {
                observed_total: current.total_spaces,
                observed_available: current.available_spaces,
                new_total,
                new_available: new_total - occupied,
            };
            if slots.resize(id, change).await? {
                info!(code = %current.code, from = current.total_spaces, to = new_total, "Parking slot resized");
                return Ok(());
            }
        }

        Err(DomainError::Conflict(
            "Parking slot is busy, capacity was not changed".into(),
        ))
    }

    /// Delete a slot nobody is parked on.
    pub async fn delete_slot(&self, id: &str) -> DomainResult<()> {
        let slot = self.get_slot(id).await?;
        if !self.repos.parking_slots().delete_if_vacant(id).await? {
            return Err(DomainError::Conflict(
                "Cannot delete a parking slot with parked vehicles".into(),
            ));
        }
        info!(code = %slot.code, "Parking slot deleted");
        Ok(())
    }
}
