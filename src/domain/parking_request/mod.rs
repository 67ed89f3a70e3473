//! Parking request aggregate
//!
//! A request is a vehicle's occupancy session: it is created at the gate or
//! by a user asking for a space, approved or rejected by an administrator,
//! and closed on exit with a computed charge.

pub mod ledger;
pub mod model;
pub mod repository;

pub use ledger::{ApproveOutcome, OccupancyLedger};
pub use model::{normalize_plate, ParkingRequest, RequestFilter, RequestStatus};
pub use repository::ParkingRequestRepository;
