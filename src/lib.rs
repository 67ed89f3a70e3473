//! # Parking Service
//!
//! Backend for a parking facility: slot administration, gate entry and
//! exit with hourly billing, a request-then-approve reservation workflow,
//! vehicle registry and JWT authentication.
//!
//! ## Architecture
//!
//! - **domain**: Entities, invariants, billing and repository traits
//! - **application**: Services, notifications and background jobs
//! - **infrastructure**: SeaORM persistence, in-memory repositories, crypto
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: Process lifecycle shared by both binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};

// Re-export API router
pub use interfaces::http::{create_api_router, ApiServices};
