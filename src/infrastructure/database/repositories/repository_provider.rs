//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use crate::domain::parking_request::{OccupancyLedger, ParkingRequestRepository};
use crate::domain::parking_slot::ParkingSlotRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::user::UserRepository;
use crate::domain::vehicle::VehicleRepository;
use crate::domain::DomainResult;

use super::db_err;
use super::occupancy_ledger::SeaOrmOccupancyLedger;
use super::parking_request_repository::SeaOrmParkingRequestRepository;
use super::parking_slot_repository::SeaOrmParkingSlotRepository;
use super::user_repository::SeaOrmUserRepository;
use super::vehicle_repository::SeaOrmVehicleRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    parking_slots: SeaOrmParkingSlotRepository,
    parking_requests: SeaOrmParkingRequestRepository,
    vehicles: SeaOrmVehicleRepository,
    users: SeaOrmUserRepository,
    ledger: SeaOrmOccupancyLedger,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            parking_slots: SeaOrmParkingSlotRepository::new(db.clone()),
            parking_requests: SeaOrmParkingRequestRepository::new(db.clone()),
            vehicles: SeaOrmVehicleRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db.clone()),
            ledger: SeaOrmOccupancyLedger::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn parking_slots(&self) -> &dyn ParkingSlotRepository {
        &self.parking_slots
    }

    fn parking_requests(&self) -> &dyn ParkingRequestRepository {
        &self.parking_requests
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn ledger(&self) -> &dyn OccupancyLedger {
        &self.ledger
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
