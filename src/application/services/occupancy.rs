//! Occupancy engine: entries, exits, requests and their approval
//!
//! Every transition that moves a space goes through the occupancy ledger,
//! which changes the request and its slot's counter as one unit. Losing a
//! race shows up as a `false` (or an outcome) from the ledger, never as a
//! half-applied write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::application::notifications::NotificationDispatcher;
use crate::domain::parking_request::normalize_plate;
use crate::domain::{
    compute_charge, ApproveOutcome, DomainError, DomainResult, ParkingRequest, ParkingSlot,
    RepositoryProvider, RequestFilter, RequestStatus, SlotFilter,
};
use crate::shared::clock::SharedClock;

/// Result of a recorded exit
#[derive(Debug, Clone)]
pub struct ExitReceipt {
    pub request: ParkingRequest,
    pub duration_hours: f64,
    pub charged_amount: f64,
}

/// Result of an approval
#[derive(Debug, Clone)]
pub struct Approval {
    pub request: ParkingRequest,
    pub slot_code: String,
}

/// Administrative override of a request
#[derive(Debug, Clone, Default)]
pub struct RequestUpdate {
    pub status: Option<RequestStatus>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub total_entries: usize,
    pub active_entries: usize,
    pub completed_entries: usize,
    pub total_revenue: f64,
}

/// Requests checked in during `[start, end]`
#[derive(Debug, Clone)]
pub struct ParkingReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub requests: Vec<ParkingRequest>,
    pub active: Vec<ParkingRequest>,
    pub completed: Vec<ParkingRequest>,
    pub total_charged: f64,
    pub summary: ReportSummary,
}

pub struct OccupancyService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    notifications: NotificationDispatcher,
}

impl OccupancyService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        let notifications = NotificationDispatcher::disabled(repos.clone());
        Self {
            repos,
            clock,
            notifications,
        }
    }

    pub fn with_notifications(mut self, notifications: NotificationDispatcher) -> Self {
        self.notifications = notifications;
        self
    }

    // ── Direct entry / exit ─────────────────────────────────────

    /// A vehicle enters `slot_code` at the gate.
    pub async fn record_entry(
        &self,
        plate_number: &str,
        slot_code: &str,
        user_id: Option<&str>,
    ) -> DomainResult<ParkingRequest> {
        let plate = require_plate(plate_number)?;
        let slot = self.slot_by_code(slot_code).await?;

        if !slot.has_space() {
            return Err(no_space_in(&slot));
        }

        let requests = self.repos.parking_requests();
        if requests.find_open_by_plate(&plate).await?.is_some() {
            return Err(DomainError::Conflict("Car is already parked".into()));
        }

        let request = ParkingRequest::direct_entry(
            &plate,
            &slot.id,
            user_id.map(String::from),
            self.clock.now(),
        );
        let Some(saved) = self.repos.ledger().open(request).await? else {
            return Err(no_space_in(&slot));
        };

        metrics::counter!("parking_entries_total", "slot" => slot.code.clone()).increment(1);
        info!(plate = %saved.plate_number, slot = %slot.code, request_id = %saved.id, "🚗 Car entered");
        Ok(saved)
    }

    /// A vehicle leaves `slot_code`. Computes and stores the charge.
    pub async fn record_exit(
        &self,
        plate_number: &str,
        slot_code: &str,
    ) -> DomainResult<ExitReceipt> {
        let plate = require_plate(plate_number)?;
        let slot = self.slot_by_code(slot_code).await?;

        let mut request = self
            .repos
            .parking_requests()
            .find_open_by_plate_and_slot(&plate, &slot.id)
            .await?
            .ok_or_else(|| no_active_parking(&plate))?;

        let now = self.clock.now();
        let check_out = now.max(request.check_in);
        let charge = compute_charge(
            request.check_in,
            request.billable_end(check_out),
            slot.charging_fee,
        )?;

        if !self
            .repos
            .ledger()
            .close(&request.id, check_out, charge.amount)
            .await?
        {
            return Err(no_active_parking(&plate));
        }

        request.check_out = Some(check_out);
        request.charged_amount = charge.amount;
        request.status = RequestStatus::Approved;
        request.updated_at = check_out;

        metrics::counter!("parking_exits_total", "slot" => slot.code.clone()).increment(1);
        metrics::histogram!("parking_charged_amount").record(charge.amount);
        info!(
            plate = %plate,
            slot = %slot.code,
            hours = charge.duration_hours,
            amount = charge.amount,
            "🚙 Car exited"
        );

        Ok(ExitReceipt {
            request,
            duration_hours: charge.duration_hours,
            charged_amount: charge.amount,
        })
    }

    // ── Request / approval ──────────────────────────────────────

    /// A user asks for a space for one of their vehicles.
    pub async fn create_request(
        &self,
        user_id: &str,
        vehicle_id: &str,
        check_in: DateTime<Utc>,
        check_out: Option<DateTime<Utc>>,
    ) -> DomainResult<ParkingRequest> {
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;

        if vehicle.owner_id != user_id {
            return Err(DomainError::Forbidden(
                "Vehicle does not belong to you".into(),
            ));
        }
        if check_out.is_some_and(|out| out < check_in) {
            return Err(DomainError::Validation(
                "Check-out must not be before check-in".into(),
            ));
        }

        let requests = self.repos.parking_requests();
        if requests
            .find_open_by_plate(&vehicle.plate_number)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(
                "Vehicle already has an active parking request".into(),
            ));
        }

        let request = ParkingRequest::requested(
            &vehicle.plate_number,
            user_id,
            &vehicle.id,
            check_in,
            check_out,
            self.clock.now(),
        );
        let saved = requests.save(request).await?;
        info!(request_id = %saved.id, plate = %saved.plate_number, "Parking request created");
        Ok(saved)
    }

    /// PENDING → APPROVED, assigning a slot when the request has none.
    pub async fn approve(&self, request_id: &str) -> DomainResult<Approval> {
        let mut request = self.request_by_id(request_id).await?;
        ensure_pending(&request)?;

        let now = self.clock.now();
        let slot = match &request.slot_id {
            Some(slot_id) => {
                let slot = self.slot_by_id(slot_id).await?;
                match self.repos.ledger().approve(&request.id, &slot.id, false, now).await? {
                    ApproveOutcome::Approved => slot,
                    _ => return Err(no_longer_pending()),
                }
            }
            None => self.approve_on_first_available(&request.id, now).await?,
        };

        request.status = RequestStatus::Approved;
        request.slot_id = Some(slot.id.clone());
        request.approved_at = Some(now);
        request.updated_at = now;

        metrics::counter!("parking_requests_approved_total").increment(1);
        info!(request_id = %request.id, slot = %slot.code, "✅ Parking request approved");
        self.notifications.request_approved(&request, &slot.code);

        Ok(Approval {
            request,
            slot_code: slot.code,
        })
    }

    /// PENDING → REJECTED. A held space is given back.
    pub async fn reject(&self, request_id: &str) -> DomainResult<ParkingRequest> {
        let mut request = self.request_by_id(request_id).await?;
        ensure_pending(&request)?;

        let now = self.clock.now();
        if !self.repos.ledger().reject(&request.id, now).await? {
            return Err(no_longer_pending());
        }

        request.slot_id = None;
        request.status = RequestStatus::Rejected;
        request.updated_at = now;

        metrics::counter!("parking_requests_rejected_total").increment(1);
        info!(request_id = %request.id, "❌ Parking request rejected");
        self.notifications.request_rejected(&request);

        Ok(request)
    }

    /// Administrative override of status and/or check-out.
    pub async fn update_request(
        &self,
        request_id: &str,
        update: RequestUpdate,
    ) -> DomainResult<ParkingRequest> {
        let request = self.request_by_id(request_id).await?;
        if request.is_closed() || request.status == RequestStatus::Rejected {
            return Err(DomainError::InvalidState(format!(
                "Request is already {}",
                if request.is_closed() { "closed" } else { "rejected" }
            )));
        }

        match (update.status, update.check_out) {
            (Some(RequestStatus::Rejected), _) => self.reject(request_id).await,
            (Some(RequestStatus::Pending), Some(_)) => Err(DomainError::InvalidState(
                "A request with a check-out cannot stay pending".into(),
            )),
            (_, Some(check_out)) => self.close_at(request, check_out).await,
            (Some(RequestStatus::Approved), None) => {
                self.approve(request_id).await.map(|a| a.request)
            }
            (Some(RequestStatus::Pending), None) => {
                if request.status == RequestStatus::Pending {
                    Ok(request)
                } else {
                    Err(DomainError::InvalidState(
                        "An approved request cannot return to pending".into(),
                    ))
                }
            }
            (None, None) => Ok(request),
        }
    }

    /// Delete a request. A space is given back only if the deleted row
    /// still held one.
    pub async fn delete_request(&self, request_id: &str) -> DomainResult<()> {
        let deleted = self
            .repos
            .ledger()
            .delete(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingRequest", "id", request_id))?;

        info!(request_id, plate = %deleted.plate_number, "Parking request deleted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get_request(&self, request_id: &str) -> DomainResult<ParkingRequest> {
        self.request_by_id(request_id).await
    }

    /// A request visible to `user_id`: their own, or any for an admin.
    pub async fn get_request_for(
        &self,
        request_id: &str,
        user_id: &str,
        is_admin: bool,
    ) -> DomainResult<ParkingRequest> {
        let request = self.request_by_id(request_id).await?;
        if !is_admin && !request.owned_by(user_id) {
            return Err(DomainError::Forbidden(
                "You can only view your own parking requests".into(),
            ));
        }
        Ok(request)
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> DomainResult<Vec<ParkingRequest>> {
        self.repos.parking_requests().find_all(filter).await
    }

    pub async fn user_requests(&self, user_id: &str) -> DomainResult<Vec<ParkingRequest>> {
        self.list_requests(&RequestFilter::for_user(user_id)).await
    }

    pub async fn active_requests(&self) -> DomainResult<Vec<ParkingRequest>> {
        self.list_requests(&RequestFilter::open()).await
    }

    pub async fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<ParkingReport> {
        if end < start {
            return Err(DomainError::Validation(
                "End date must not be before start date".into(),
            ));
        }

        let requests = self
            .repos
            .parking_requests()
            .find_in_range(start, end)
            .await?;

        let total_charged = round_cents(requests.iter().map(|r| r.charged_amount).sum());
        let (completed, active): (Vec<_>, Vec<_>) = requests
            .iter()
            .filter(|r| r.status != RequestStatus::Rejected)
            .cloned()
            .partition(|r| r.is_closed());

        let summary = ReportSummary {
            total_entries: requests.len(),
            active_entries: active.len(),
            completed_entries: completed.len(),
            total_revenue: total_charged,
        };

        Ok(ParkingReport {
            start,
            end,
            requests,
            active,
            completed,
            total_charged,
            summary,
        })
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn close_at(
        &self,
        mut request: ParkingRequest,
        check_out: DateTime<Utc>,
    ) -> DomainResult<ParkingRequest> {
        if check_out < request.check_in {
            return Err(DomainError::Validation(
                "Check-out must not be before check-in".into(),
            ));
        }
        let Some(slot_id) = request.slot_id.clone() else {
            return Err(DomainError::InvalidState(
                "Request has no assigned parking slot".into(),
            ));
        };
        let slot = self.slot_by_id(&slot_id).await?;
        let charge = compute_charge(request.check_in, check_out, slot.charging_fee)?;

        if !self
            .repos
            .ledger()
            .close(&request.id, check_out, charge.amount)
            .await?
        {
            return Err(DomainError::InvalidState("Request is already closed".into()));
        }

        request.check_out = Some(check_out);
        request.charged_amount = charge.amount;
        request.status = RequestStatus::Approved;
        request.updated_at = self.clock.now();

        metrics::counter!("parking_exits_total", "slot" => slot.code.clone()).increment(1);
        metrics::histogram!("parking_charged_amount").record(charge.amount);
        info!(request_id = %request.id, amount = charge.amount, "Parking request closed by administrator");
        Ok(request)
    }

    /// Approve on the lowest-code slot that still has a space.
    async fn approve_on_first_available(
        &self,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<ParkingSlot> {
        let filter = SlotFilter {
            available_only: true,
            ..Default::default()
        };
        for slot in self.repos.parking_slots().find_all(&filter).await? {
            match self.repos.ledger().approve(request_id, &slot.id, true, now).await? {
                ApproveOutcome::Approved => return Ok(slot),
                ApproveOutcome::NoSpace => continue,
                ApproveOutcome::NotPending => return Err(no_longer_pending()),
            }
        }
        Err(DomainError::CapacityExceeded(
            "No parking slots available".into(),
        ))
    }

    async fn slot_by_code(&self, code: &str) -> DomainResult<ParkingSlot> {
        let code = code.trim();
        self.repos
            .parking_slots()
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingSlot", "code", code))
    }

    async fn slot_by_id(&self, id: &str) -> DomainResult<ParkingSlot> {
        self.repos
            .parking_slots()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingSlot", "id", id))
    }

    async fn request_by_id(&self, id: &str) -> DomainResult<ParkingRequest> {
        self.repos
            .parking_requests()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingRequest", "id", id))
    }
}

fn require_plate(raw: &str) -> DomainResult<String> {
    let plate = normalize_plate(raw);
    if plate.is_empty() {
        return Err(DomainError::Validation("Plate number is required".into()));
    }
    Ok(plate)
}

fn ensure_pending(request: &ParkingRequest) -> DomainResult<()> {
    if request.status != RequestStatus::Pending || !request.is_open() {
        return Err(DomainError::InvalidState(format!(
            "Request is already {}",
            request.status
        )));
    }
    Ok(())
}

fn no_longer_pending() -> DomainError {
    DomainError::InvalidState("Request is no longer pending".into())
}

fn no_space_in(slot: &ParkingSlot) -> DomainError {
    DomainError::CapacityExceeded(format!("No available spaces in parking slot {}", slot.code))
}

fn no_active_parking(plate: &str) -> DomainError {
    DomainError::not_found("Active parking", "plate_number", plate)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
