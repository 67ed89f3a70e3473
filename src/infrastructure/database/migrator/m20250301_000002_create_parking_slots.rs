//! Create parking_slots table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParkingSlots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParkingSlots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ParkingSlots::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ParkingSlots::Name).string().not_null())
                    .col(ColumnDef::new(ParkingSlots::Location).string().not_null())
                    .col(
                        ColumnDef::new(ParkingSlots::TotalSpaces)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParkingSlots::AvailableSpaces)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParkingSlots::ChargingFee)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ParkingSlots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParkingSlots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(
                        Expr::col(ParkingSlots::AvailableSpaces)
                            .gte(0)
                            .and(
                                Expr::col(ParkingSlots::AvailableSpaces)
                                    .lte(Expr::col(ParkingSlots::TotalSpaces)),
                            ),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParkingSlots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ParkingSlots {
    Table,
    Id,
    Code,
    Name,
    Location,
    TotalSpaces,
    AvailableSpaces,
    ChargingFee,
    CreatedAt,
    UpdatedAt,
}
