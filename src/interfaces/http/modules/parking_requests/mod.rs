//! Parking requests: request-then-approve workflow and administrative edits

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
