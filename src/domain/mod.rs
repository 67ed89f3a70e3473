pub mod billing;
pub mod parking_request;
pub mod parking_slot;
pub mod repositories;
pub mod user;
pub mod vehicle;

pub use billing::{compute_charge, Charge};
pub use parking_request::{
    ApproveOutcome, OccupancyLedger, ParkingRequest, ParkingRequestRepository, RequestFilter,
    RequestStatus,
};
pub use parking_slot::{ParkingSlot, ParkingSlotRepository, SlotFilter};
pub use repositories::{DomainResult, RepositoryProvider};
pub use user::{User, UserRepository, UserRole};
pub use vehicle::{Vehicle, VehicleRepository};

pub use crate::shared::errors::DomainError;
