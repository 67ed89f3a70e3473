//! Parking slot aggregate

pub mod model;
pub mod repository;

pub use model::{validate_capacity, validate_fee, CapacityChange, ParkingSlot, SlotFilter};
pub use repository::ParkingSlotRepository;
