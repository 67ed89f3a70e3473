//! Application services

pub mod auth;
pub mod occupancy;
pub mod parking_slots;
pub mod users;
pub mod vehicles;

pub use auth::{AuthResult, AuthService, Registration};
pub use occupancy::{
    Approval, ExitReceipt, OccupancyService, ParkingReport, ReportSummary, RequestUpdate,
};
pub use parking_slots::{NewSlot, ParkingSlotService, SlotUpdate};
pub use users::{ProfileUpdate, UserService};
pub use vehicles::{Actor, VehicleService, VehicleUpdate};
