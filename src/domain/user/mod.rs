//! User aggregate
//!
//! Identity records used for authentication, request ownership and as the
//! notification recipient directory.

pub mod model;
pub mod repository;

pub use model::{by_name, User, UserRole};
pub use repository::UserRepository;
