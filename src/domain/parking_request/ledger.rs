//! Occupancy ledger interface
//!
//! Every write that changes a request and the availability counter of its
//! slot goes through here. Each operation is one unit: the request row and
//! the counter change together or not at all, so a reader never sees a
//! held space without its open request (or the reverse).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::ParkingRequest;
use crate::domain::DomainResult;

/// Outcome of [`OccupancyLedger::approve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    Approved,
    /// The request was no longer PENDING.
    NotPending,
    /// A space had to be taken and the slot had none left.
    NoSpace,
}

#[async_trait]
pub trait OccupancyLedger: Send + Sync {
    /// Take one space on the request's slot and insert the open request.
    ///
    /// `Ok(None)` when the slot had no space left. Fails with `Conflict`
    /// when the plate already has an open request; nothing is reserved then.
    async fn open(&self, request: ParkingRequest) -> DomainResult<Option<ParkingRequest>>;

    /// PENDING → APPROVED on `slot_id`. With `take_space` one space on the
    /// slot is reserved in the same unit.
    async fn approve(
        &self,
        id: &str,
        slot_id: &str,
        take_space: bool,
        approved_at: DateTime<Utc>,
    ) -> DomainResult<ApproveOutcome>;

    /// PENDING → REJECTED, clearing the slot and giving back the space it
    /// held. `false` if no longer PENDING.
    async fn reject(&self, id: &str, at: DateTime<Utc>) -> DomainResult<bool>;

    /// Record the exit (check-out, charge, APPROVED) and give the space
    /// back. `false` if the request was already closed or rejected.
    async fn close(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        charged_amount: f64,
    ) -> DomainResult<bool>;

    /// Delete the request. The space is given back only when the deleted
    /// row was still open on a slot. `None` if it did not exist.
    async fn delete(&self, id: &str) -> DomainResult<Option<ParkingRequest>>;

    /// Set the slot's `available` to `total - open requests`, clamped to
    /// `[0, total]`, counting and writing as one unit. Returns the new value
    /// when it had drifted, `None` when it was already right.
    async fn reconcile(&self, slot_id: &str) -> DomainResult<Option<i32>>;
}
