//! Parking request repository interface
//!
//! Reads and plain inserts only. Transitions that move a space go through
//! [`OccupancyLedger`](super::OccupancyLedger).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ParkingRequest, RequestFilter};
use crate::domain::DomainResult;

#[async_trait]
pub trait ParkingRequestRepository: Send + Sync {
    /// Insert a new request without touching slot capacity. Entries that
    /// take a space use [`OccupancyLedger::open`](super::OccupancyLedger::open).
    ///
    /// Fails with `Conflict` when another open request already uses the
    /// same plate number.
    async fn save(&self, request: ParkingRequest) -> DomainResult<ParkingRequest>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingRequest>>;

    /// Matching requests, newest check-in first.
    async fn find_all(&self, filter: &RequestFilter) -> DomainResult<Vec<ParkingRequest>>;

    /// Requests whose check-in falls in `[start, end]`, newest first.
    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingRequest>>;

    async fn find_open_by_plate(&self, plate_number: &str)
        -> DomainResult<Option<ParkingRequest>>;

    async fn find_open_by_plate_and_slot(
        &self,
        plate_number: &str,
        slot_id: &str,
    ) -> DomainResult<Option<ParkingRequest>>;

    /// Number of open requests holding a space on `slot_id`.
    async fn count_open_for_slot(&self, slot_id: &str) -> DomainResult<u64>;

    /// Approved, still-open sessions whose declared check-out is at or
    /// before `now`.
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<ParkingRequest>>;
}
