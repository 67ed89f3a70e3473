//! Authentication module: registration, login, profile

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
