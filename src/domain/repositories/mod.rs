//! Repository access for the domain layer
//!
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use async_trait::async_trait;

use super::parking_request::{OccupancyLedger, ParkingRequestRepository};
use super::parking_slot::ParkingSlotRepository;
use super::user::UserRepository;
use super::vehicle::VehicleRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Built once at startup and shared as `Arc<dyn RepositoryProvider>`.
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let slot = repos.parking_slots().find_by_code("A-01").await?;
///     let open = repos.parking_requests().find_open_by_plate("RAB 123C").await?;
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn parking_slots(&self) -> &dyn ParkingSlotRepository;
    fn parking_requests(&self) -> &dyn ParkingRequestRepository;
    fn vehicles(&self) -> &dyn VehicleRepository;
    fn users(&self) -> &dyn UserRepository;

    /// Writes that move a request and its slot's counter together.
    fn ledger(&self) -> &dyn OccupancyLedger;

    /// Cheap round trip to the backing store, for health checks.
    async fn ping(&self) -> DomainResult<()>;
}
