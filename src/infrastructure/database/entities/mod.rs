//! Database entities module

pub mod parking_request;
pub mod parking_slot;
pub mod user;
pub mod vehicle;

pub use parking_request::Entity as ParkingRequest;
pub use parking_slot::Entity as ParkingSlot;
pub use user::Entity as User;
pub use vehicle::Entity as Vehicle;
