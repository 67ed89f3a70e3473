//! Create parking_requests table
//!
//! The partial unique index on open requests is what stops one plate from
//! being parked twice, even across server instances.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users::Users;
use super::m20250301_000002_create_parking_slots::ParkingSlots;
use super::m20250301_000003_create_vehicles::Vehicles;

pub const OPEN_PLATE_INDEX: &str = "idx_parking_requests_open_plate";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParkingRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParkingRequests::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ParkingRequests::PlateNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParkingRequests::UserId).string())
                    .col(ColumnDef::new(ParkingRequests::VehicleId).string())
                    .col(ColumnDef::new(ParkingRequests::SlotId).string())
                    .col(
                        ColumnDef::new(ParkingRequests::CheckIn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParkingRequests::ExpectedCheckOut).timestamp_with_time_zone())
                    .col(ColumnDef::new(ParkingRequests::CheckOut).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ParkingRequests::ChargedAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ParkingRequests::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(ParkingRequests::ApprovedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ParkingRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParkingRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parking_requests_slot")
                            .from(ParkingRequests::Table, ParkingRequests::SlotId)
                            .to(ParkingSlots::Table, ParkingSlots::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parking_requests_user")
                            .from(ParkingRequests::Table, ParkingRequests::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parking_requests_vehicle")
                            .from(ParkingRequests::Table, ParkingRequests::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parking_requests_slot")
                    .table(ParkingRequests::Table)
                    .col(ParkingRequests::SlotId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parking_requests_check_in")
                    .table(ParkingRequests::Table)
                    .col(ParkingRequests::CheckIn)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parking_requests_user")
                    .table(ParkingRequests::Table)
                    .col(ParkingRequests::UserId)
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the index builder.
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON parking_requests (plate_number) \
                 WHERE check_out IS NULL AND status <> 'REJECTED'",
                OPEN_PLATE_INDEX
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParkingRequests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ParkingRequests {
    Table,
    Id,
    PlateNumber,
    UserId,
    VehicleId,
    SlotId,
    CheckIn,
    ExpectedCheckOut,
    CheckOut,
    ChargedAmount,
    Status,
    ApprovedAt,
    CreatedAt,
    UpdatedAt,
}
