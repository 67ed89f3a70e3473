//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_parking_slots;
mod m20250301_000003_create_vehicles;
mod m20250301_000004_create_parking_requests;

pub use m20250301_000004_create_parking_requests::OPEN_PLATE_INDEX;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_parking_slots::Migration),
            Box::new(m20250301_000003_create_vehicles::Migration),
            Box::new(m20250301_000004_create_parking_requests::Migration),
        ]
    }
}
