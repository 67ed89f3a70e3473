//! Parking slots: administration, gate entry/exit, active sessions and reports

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
