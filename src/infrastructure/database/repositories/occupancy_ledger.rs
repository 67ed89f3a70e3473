//! SeaORM implementation of OccupancyLedger
//!
//! Each operation runs in one transaction. The first statement is always a
//! write so SQLite takes its write lock up front instead of upgrading a
//! read lock halfway through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::sea_query::{Expr, Query, SimpleExpr, SubQueryStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, TransactionTrait,
};

use super::db_err;
use super::parking_request_repository::{
    model_to_domain, open_condition, to_active_model, unique_plate_err,
};
use super::parking_slot_repository::take_space;
use crate::domain::parking_request::{
    ApproveOutcome, OccupancyLedger, ParkingRequest, RequestStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{parking_request, parking_slot};

pub struct SeaOrmOccupancyLedger {
    db: DatabaseConnection,
}

impl SeaOrmOccupancyLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Give back the space held by request `request_id` while it is still open
/// on a slot. The slot is looked up inside the statement, so the release
/// always matches the row the caller is about to change.
async fn release_held_space<C: ConnectionTrait>(conn: &C, request_id: &str) -> Result<bool, DbErr> {
    let held_slot = Query::select()
        .column(parking_request::Column::SlotId)
        .from(parking_request::Entity)
        .and_where(parking_request::Column::Id.eq(request_id))
        .cond_where(open_condition())
        .to_owned();

    let result = parking_slot::Entity::update_many()
        .col_expr(
            parking_slot::Column::AvailableSpaces,
            Expr::col(parking_slot::Column::AvailableSpaces).add(1),
        )
        .col_expr(parking_slot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(parking_slot::Column::Id.in_subquery(held_slot))
        .filter(
            Expr::col(parking_slot::Column::AvailableSpaces)
                .lt(Expr::col(parking_slot::Column::TotalSpaces)),
        )
        .exec(conn)
        .await?;

    debug!(
        "release_held_space({}): rows_affected={}",
        request_id, result.rows_affected
    );
    Ok(result.rows_affected == 1)
}

#[async_trait]
impl OccupancyLedger for SeaOrmOccupancyLedger {
    async fn open(&self, request: ParkingRequest) -> DomainResult<Option<ParkingRequest>> {
        let Some(slot_id) = request.slot_id.clone() else {
            return Err(DomainError::InvalidState(
                "Request has no assigned parking slot".into(),
            ));
        };

        let txn = self.db.begin().await.map_err(db_err)?;
        if !take_space(&txn, &slot_id).await.map_err(db_err)? {
            txn.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        // A duplicate plate drops `txn` here, which rolls the reservation back.
        let inserted = to_active_model(request)
            .insert(&txn)
            .await
            .map_err(unique_plate_err)?;
        txn.commit().await.map_err(db_err)?;

        Ok(Some(model_to_domain(inserted)))
    }

    async fn approve(
        &self,
        id: &str,
        slot_id: &str,
        take: bool,
        approved_at: DateTime<Utc>,
    ) -> DomainResult<ApproveOutcome> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let result = parking_request::Entity::update_many()
            .col_expr(
                parking_request::Column::Status,
                Expr::value(RequestStatus::Approved.as_str()),
            )
            .col_expr(parking_request::Column::SlotId, Expr::value(slot_id))
            .col_expr(parking_request::Column::ApprovedAt, Expr::value(approved_at))
            .col_expr(parking_request::Column::UpdatedAt, Expr::value(approved_at))
            .filter(parking_request::Column::Id.eq(id))
            .filter(parking_request::Column::Status.eq(RequestStatus::Pending.as_str()))
            .filter(parking_request::Column::CheckOut.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(ApproveOutcome::NotPending);
        }
        if take && !take_space(&txn, slot_id).await.map_err(db_err)? {
            txn.rollback().await.map_err(db_err)?;
            return Ok(ApproveOutcome::NoSpace);
        }

        txn.commit().await.map_err(db_err)?;
        Ok(ApproveOutcome::Approved)
    }

    async fn reject(&self, id: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        release_held_space(&txn, id).await.map_err(db_err)?;

        let result = parking_request::Entity::update_many()
            .col_expr(
                parking_request::Column::Status,
                Expr::value(RequestStatus::Rejected.as_str()),
            )
            .col_expr(
                parking_request::Column::SlotId,
                Expr::value(Option::<String>::None),
            )
            .col_expr(parking_request::Column::UpdatedAt, Expr::value(at))
            .filter(parking_request::Column::Id.eq(id))
            .filter(parking_request::Column::Status.eq(RequestStatus::Pending.as_str()))
            .filter(parking_request::Column::CheckOut.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn close(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        charged_amount: f64,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let released = release_held_space(&txn, id).await.map_err(db_err)?;

        let result = parking_request::Entity::update_many()
            .col_expr(parking_request::Column::CheckOut, Expr::value(check_out))
            .col_expr(
                parking_request::Column::ChargedAmount,
                Expr::value(charged_amount),
            )
            .col_expr(
                parking_request::Column::Status,
                Expr::value(RequestStatus::Approved.as_str()),
            )
            .col_expr(parking_request::Column::UpdatedAt, Expr::value(check_out))
            .filter(parking_request::Column::Id.eq(id))
            .filter(open_condition())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }
        txn.commit().await.map_err(db_err)?;

        if !released {
            warn!("Closed request {} without giving back a space", id);
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> DomainResult<Option<ParkingRequest>> {
        let txn = self.db.begin().await.map_err(db_err)?;
        release_held_space(&txn, id).await.map_err(db_err)?;

        let Some(model) = parking_request::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            txn.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        parking_request::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        Ok(Some(model_to_domain(model)))
    }

    async fn reconcile(&self, slot_id: &str) -> DomainResult<Option<i32>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let result = parking_slot::Entity::update_many()
            .col_expr(parking_slot::Column::AvailableSpaces, expected_available())
            .col_expr(parking_slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(parking_slot::Column::Id.eq(slot_id))
            .filter(Expr::col(parking_slot::Column::AvailableSpaces).ne(expected_available()))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        let corrected = parking_slot::Entity::find_by_id(slot_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .map(|m| m.available_spaces);
        txn.commit().await.map_err(db_err)?;
        Ok(corrected)
    }
}

/// `max(0, total_spaces - open requests on the slot)`, evaluated per row of
/// `parking_slots` in the statement it appears in.
fn expected_available() -> SimpleExpr {
    let open_count = Query::select()
        .expr(Expr::col((parking_request::Entity, parking_request::Column::Id)).count())
        .from(parking_request::Entity)
        .and_where(
            Expr::col((parking_request::Entity, parking_request::Column::SlotId))
                .equals((parking_slot::Entity, parking_slot::Column::Id)),
        )
        .cond_where(open_condition())
        .to_owned();

    let free = Expr::col(parking_slot::Column::TotalSpaces).sub(SimpleExpr::SubQuery(
        None,
        Box::new(SubQueryStatement::SelectStatement(open_count)),
    ));
    Expr::case(Expr::expr(free.clone()).lt(0), 0)
        .finally(free)
        .into()
}
