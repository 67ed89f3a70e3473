pub mod auth;
pub mod health;
pub mod metrics;
pub mod parking_requests;
pub mod parking_slots;
pub mod request_id;
pub mod users;
pub mod vehicles;
