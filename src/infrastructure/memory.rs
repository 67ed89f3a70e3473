//! In-memory repositories for development and testing
//!
//! Same contract as the SeaORM repositories: counters change under the
//! per-entry lock, uniqueness is claimed through index maps before the
//! record is inserted. Ledger operations hold the slot's entry lock while
//! they change the request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;

use crate::domain::parking_request::{
    ApproveOutcome, OccupancyLedger, ParkingRequest, ParkingRequestRepository, RequestFilter,
    RequestStatus,
};
use crate::domain::parking_slot::{
    CapacityChange, ParkingSlot, ParkingSlotRepository, SlotFilter,
};
use crate::domain::user::{by_name, User, UserRepository};
use crate::domain::vehicle::{Vehicle, VehicleRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

// ── Parking slots ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryParkingSlotRepository {
    slots: DashMap<String, ParkingSlot>,
    /// code → id
    codes: DashMap<String, String>,
}

#[async_trait]
impl ParkingSlotRepository for InMemoryParkingSlotRepository {
    async fn save(&self, slot: ParkingSlot) -> DomainResult<ParkingSlot> {
        match self.codes.entry(slot.code.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict("Parking code already exists".into()))
            }
            Entry::Vacant(v) => {
                v.insert(slot.id.clone());
            }
        }
        self.slots.insert(slot.id.clone(), slot.clone());
        Ok(slot)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSlot>> {
        Ok(self.slots.get(id).map(|s| s.clone()))
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ParkingSlot>> {
        let Some(id) = self.codes.get(code).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn find_all(&self, filter: &SlotFilter) -> DomainResult<Vec<ParkingSlot>> {
        let mut slots: Vec<ParkingSlot> = self
            .slots
            .iter()
            .filter(|s| filter.matches(s.value()))
            .map(|s| s.value().clone())
            .collect();
        slots.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(slots)
    }

    async fn update_details(&self, slot: &ParkingSlot) -> DomainResult<()> {
        let mut stored = self
            .slots
            .get_mut(&slot.id)
            .ok_or_else(|| DomainError::not_found("ParkingSlot", "id", slot.id.clone()))?;
        stored.name = slot.name.clone();
        stored.location = slot.location.clone();
        stored.charging_fee = slot.charging_fee;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_if_vacant(&self, id: &str) -> DomainResult<bool> {
        match self.slots.remove_if(id, |_, s| s.is_vacant()) {
            Some((_, slot)) => {
                self.codes.remove(&slot.code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resize(&self, id: &str, change: CapacityChange) -> DomainResult<bool> {
        let Some(mut slot) = self.slots.get_mut(id) else {
            return Ok(false);
        };
        if slot.total_spaces != change.observed_total
            || slot.available_spaces != change.observed_available
        {
            return Ok(false);
        }
        slot.total_spaces = change.new_total;
        slot.available_spaces = change.new_available;
        slot.updated_at = Utc::now();
        Ok(true)
    }
}

// ── Parking requests ────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryParkingRequestRepository {
    requests: DashMap<String, ParkingRequest>,
    /// plate → id of the open request using it
    open_plates: DashMap<String, String>,
}

impl InMemoryParkingRequestRepository {
    /// Claim the plate for an open request, then store it.
    fn insert(&self, request: ParkingRequest) -> DomainResult<ParkingRequest> {
        if request.is_open() {
            match self.open_plates.entry(request.plate_number.clone()) {
                Entry::Occupied(_) => {
                    return Err(DomainError::Conflict("Car is already parked".into()))
                }
                Entry::Vacant(v) => {
                    v.insert(request.id.clone());
                }
            }
        }
        self.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn open_on(&self, slot_id: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.is_open() && r.slot_id.as_deref() == Some(slot_id))
            .count()
    }

    fn release_plate(&self, plate: &str, id: &str) {
        self.open_plates.remove_if(plate, |_, owner| owner == id);
    }

    fn collect(&self, keep: impl Fn(&ParkingRequest) -> bool) -> Vec<ParkingRequest> {
        self.requests
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    fn newest_first(mut requests: Vec<ParkingRequest>) -> Vec<ParkingRequest> {
        requests.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        requests
    }
}

#[async_trait]
impl ParkingRequestRepository for InMemoryParkingRequestRepository {
    async fn save(&self, request: ParkingRequest) -> DomainResult<ParkingRequest> {
        self.insert(request)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingRequest>> {
        Ok(self.requests.get(id).map(|r| r.clone()))
    }

    async fn find_all(&self, filter: &RequestFilter) -> DomainResult<Vec<ParkingRequest>> {
        Ok(Self::newest_first(self.collect(|r| filter.matches(r))))
    }

    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingRequest>> {
        Ok(Self::newest_first(
            self.collect(|r| r.check_in >= start && r.check_in <= end),
        ))
    }

    async fn find_open_by_plate(
        &self,
        plate_number: &str,
    ) -> DomainResult<Option<ParkingRequest>> {
        let Some(id) = self.open_plates.get(plate_number).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self
            .requests
            .get(&id)
            .filter(|r| r.is_open())
            .map(|r| r.clone()))
    }

    async fn find_open_by_plate_and_slot(
        &self,
        plate_number: &str,
        slot_id: &str,
    ) -> DomainResult<Option<ParkingRequest>> {
        Ok(self
            .find_open_by_plate(plate_number)
            .await?
            .filter(|r| r.slot_id.as_deref() == Some(slot_id)))
    }

    async fn count_open_for_slot(&self, slot_id: &str) -> DomainResult<u64> {
        Ok(self.open_on(slot_id) as u64)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<ParkingRequest>> {
        let mut overdue = self.collect(|r| {
            r.status == RequestStatus::Approved
                && r.occupies_slot()
                && r.expected_check_out.is_some_and(|due| due <= now)
        });
        overdue.sort_by_key(|r| r.expected_check_out);
        Ok(overdue)
    }
}

// ── Occupancy ledger ────────────────────────────────────────────

/// Locks the slot before the request, in every operation, so the two maps
/// are always taken in the same order.
pub struct InMemoryOccupancyLedger {
    slots: Arc<InMemoryParkingSlotRepository>,
    requests: Arc<InMemoryParkingRequestRepository>,
}

type SlotGuard<'a> = RefMut<'a, String, ParkingSlot>;
type RequestGuard<'a> = RefMut<'a, String, ParkingRequest>;

impl InMemoryOccupancyLedger {
    fn slot_id_of(&self, id: &str) -> Option<Option<String>> {
        self.requests.requests.get(id).map(|r| r.slot_id.clone())
    }

    /// The request together with the slot it points at, both locked.
    /// Retries when the request moved to another slot between the two locks.
    fn lock_request(&self, id: &str) -> Option<(Option<SlotGuard<'_>>, RequestGuard<'_>)> {
        loop {
            let slot_id = self.slot_id_of(id)?;
            let slot = slot_id.as_deref().and_then(|s| self.slots.slots.get_mut(s));
            let request = self.requests.requests.get_mut(id)?;
            if request.slot_id == slot_id {
                return Some((slot, request));
            }
        }
    }
}

fn give_back(slot: Option<&mut SlotGuard<'_>>) {
    if let Some(slot) = slot {
        if slot.available_spaces < slot.total_spaces {
            slot.available_spaces += 1;
            slot.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl OccupancyLedger for InMemoryOccupancyLedger {
    async fn open(&self, request: ParkingRequest) -> DomainResult<Option<ParkingRequest>> {
        let Some(slot_id) = request.slot_id.clone() else {
            return Err(DomainError::InvalidState(
                "Request has no assigned parking slot".into(),
            ));
        };
        let Some(mut slot) = self.slots.slots.get_mut(&slot_id) else {
            return Ok(None);
        };
        if slot.available_spaces <= 0 {
            return Ok(None);
        }

        let saved = self.requests.insert(request)?;
        slot.available_spaces -= 1;
        slot.updated_at = Utc::now();
        Ok(Some(saved))
    }

    async fn approve(
        &self,
        id: &str,
        slot_id: &str,
        take_space: bool,
        approved_at: DateTime<Utc>,
    ) -> DomainResult<ApproveOutcome> {
        let mut slot = if take_space {
            self.slots.slots.get_mut(slot_id)
        } else {
            None
        };

        let Some(mut request) = self.requests.requests.get_mut(id) else {
            return Ok(ApproveOutcome::NotPending);
        };
        if request.status != RequestStatus::Pending || request.check_out.is_some() {
            return Ok(ApproveOutcome::NotPending);
        }
        if take_space {
            match slot.as_mut() {
                Some(s) if s.available_spaces > 0 => {
                    s.available_spaces -= 1;
                    s.updated_at = approved_at;
                }
                _ => return Ok(ApproveOutcome::NoSpace),
            }
        }

        request.status = RequestStatus::Approved;
        request.slot_id = Some(slot_id.to_string());
        request.approved_at = Some(approved_at);
        request.updated_at = approved_at;
        Ok(ApproveOutcome::Approved)
    }

    async fn reject(&self, id: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        let Some((mut slot, mut request)) = self.lock_request(id) else {
            return Ok(false);
        };
        if request.status != RequestStatus::Pending || request.check_out.is_some() {
            return Ok(false);
        }
        request.status = RequestStatus::Rejected;
        request.slot_id = None;
        request.updated_at = at;
        let plate = request.plate_number.clone();
        drop(request);

        give_back(slot.as_mut());
        self.requests.release_plate(&plate, id);
        Ok(true)
    }

    async fn close(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        charged_amount: f64,
    ) -> DomainResult<bool> {
        let Some((mut slot, mut request)) = self.lock_request(id) else {
            return Ok(false);
        };
        if !request.is_open() {
            return Ok(false);
        }
        request.check_out = Some(check_out);
        request.charged_amount = charged_amount;
        request.status = RequestStatus::Approved;
        request.updated_at = check_out;
        let plate = request.plate_number.clone();
        drop(request);

        give_back(slot.as_mut());
        self.requests.release_plate(&plate, id);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> DomainResult<Option<ParkingRequest>> {
        loop {
            let Some(slot_id) = self.slot_id_of(id) else {
                return Ok(None);
            };
            let mut slot = slot_id.as_deref().and_then(|s| self.slots.slots.get_mut(s));

            // Decide on the removed value, not on an earlier read.
            if let Some((_, removed)) = self
                .requests
                .requests
                .remove_if(id, |_, r| r.slot_id == slot_id)
            {
                if removed.occupies_slot() {
                    give_back(slot.as_mut());
                }
                self.requests.release_plate(&removed.plate_number, id);
                return Ok(Some(removed));
            }
        }
    }

    async fn reconcile(&self, slot_id: &str) -> DomainResult<Option<i32>> {
        let Some(mut slot) = self.slots.slots.get_mut(slot_id) else {
            return Ok(None);
        };
        // Every ledger write on this slot waits on the guard, so the count is exact.
        let open = i32::try_from(self.requests.open_on(slot_id)).unwrap_or(i32::MAX);

        let expected = (slot.total_spaces - open).max(0);
        if slot.available_spaces == expected {
            return Ok(None);
        }
        slot.available_spaces = expected;
        slot.updated_at = Utc::now();
        Ok(Some(expected))
    }
}

// ── Vehicles ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: DashMap<String, Vehicle>,
    /// plate → id
    plates: DashMap<String, String>,
}

fn duplicate_plate() -> DomainError {
    DomainError::Conflict("Vehicle with this plate number already exists".into())
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn save(&self, vehicle: Vehicle) -> DomainResult<Vehicle> {
        match self.plates.entry(vehicle.plate_number.clone()) {
            Entry::Occupied(_) => return Err(duplicate_plate()),
            Entry::Vacant(v) => {
                v.insert(vehicle.id.clone());
            }
        }
        self.vehicles.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Vehicle>> {
        Ok(self.vehicles.get(id).map(|v| v.clone()))
    }

    async fn find_by_plate(&self, plate_number: &str) -> DomainResult<Option<Vehicle>> {
        let Some(id) = self.plates.get(plate_number).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn find_all(&self, owner_id: Option<&str>) -> DomainResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|v| owner_id.map_or(true, |owner| v.owner_id == owner))
            .map(|v| v.value().clone())
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn update(&self, vehicle: &Vehicle) -> DomainResult<()> {
        let previous_plate = self
            .vehicles
            .get(&vehicle.id)
            .map(|v| v.plate_number.clone())
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle.id.clone()))?;

        if previous_plate != vehicle.plate_number {
            match self.plates.entry(vehicle.plate_number.clone()) {
                Entry::Occupied(_) => return Err(duplicate_plate()),
                Entry::Vacant(v) => {
                    v.insert(vehicle.id.clone());
                }
            }
            self.plates
                .remove_if(&previous_plate, |_, owner| *owner == vehicle.id);
        }

        let mut stored = self
            .vehicles
            .get_mut(&vehicle.id)
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle.id.clone()))?;
        stored.plate_number = vehicle.plate_number.clone();
        stored.color = vehicle.color.clone();
        stored.updated_at = vehicle.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        match self.vehicles.remove(id) {
            Some((_, vehicle)) => {
                self.plates.remove_if(&vehicle.plate_number, |_, owner| owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── Users ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
    /// email → id
    emails: DashMap<String, String>,
}

impl InMemoryUserRepository {
    fn collect(&self, keep: impl Fn(&User) -> bool) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| keep(u.value()))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(by_name);
        users
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: User) -> DomainResult<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict("Email already registered".into()))
            }
            Entry::Vacant(v) => {
                v.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let Some(id) = self.emails.get(&email).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        Ok(self.collect(|_| true))
    }

    async fn search_by_name(&self, query: &str) -> DomainResult<Vec<User>> {
        Ok(self.collect(|u| u.name_matches(query)))
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        let previous_email = self
            .users
            .get(&user.id)
            .map(|u| u.email.clone())
            .ok_or_else(|| DomainError::not_found("User", "id", user.id.clone()))?;

        if previous_email != user.email {
            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(_) => {
                    return Err(DomainError::Conflict("Email already registered".into()))
                }
                Entry::Vacant(v) => {
                    v.insert(user.id.clone());
                }
            }
            self.emails.remove_if(&previous_email, |_, owner| *owner == user.id);
        }

        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| DomainError::not_found("User", "id", user.id.clone()))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        match self.users.remove(id) {
            Some((_, user)) => {
                self.emails.remove_if(&user.email, |_, owner| owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }
}

// ── Provider ────────────────────────────────────────────────────

/// Repository provider keeping everything in process memory.
pub struct InMemoryRepositoryProvider {
    parking_slots: Arc<InMemoryParkingSlotRepository>,
    parking_requests: Arc<InMemoryParkingRequestRepository>,
    vehicles: InMemoryVehicleRepository,
    users: InMemoryUserRepository,
    ledger: InMemoryOccupancyLedger,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        let parking_slots = Arc::new(InMemoryParkingSlotRepository::default());
        let parking_requests = Arc::new(InMemoryParkingRequestRepository::default());
        Self {
            ledger: InMemoryOccupancyLedger {
                slots: parking_slots.clone(),
                requests: parking_requests.clone(),
            },
            parking_slots,
            parking_requests,
            vehicles: InMemoryVehicleRepository::default(),
            users: InMemoryUserRepository::default(),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryRepositoryProvider {
    fn parking_slots(&self) -> &dyn ParkingSlotRepository {
        self.parking_slots.as_ref()
    }

    fn parking_requests(&self) -> &dyn ParkingRequestRepository {
        self.parking_requests.as_ref()
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn ledger(&self) -> &dyn OccupancyLedger {
        &self.ledger
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
