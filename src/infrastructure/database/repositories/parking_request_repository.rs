//! SeaORM implementation of ParkingRequestRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};

use super::{db_err, is_unique_violation};
use crate::domain::parking_request::{
    ParkingRequest, ParkingRequestRepository, RequestFilter, RequestStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::parking_request;

pub struct SeaOrmParkingRequestRepository {
    db: DatabaseConnection,
}

impl SeaOrmParkingRequestRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn model_to_domain(m: parking_request::Model) -> ParkingRequest {
    let status = RequestStatus::parse(&m.status).unwrap_or_else(|| {
        warn!("Unknown parking request status '{}' on {}", m.status, m.id);
        RequestStatus::Pending
    });

    ParkingRequest {
        id: m.id,
        plate_number: m.plate_number,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        slot_id: m.slot_id,
        check_in: m.check_in,
        expected_check_out: m.expected_check_out,
        check_out: m.check_out,
        charged_amount: m.charged_amount,
        status,
        approved_at: m.approved_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

/// Open = no exit recorded and not rejected. Mirrors the partial index.
pub(super) fn open_condition() -> Condition {
    Condition::all()
        .add(parking_request::Column::CheckOut.is_null())
        .add(parking_request::Column::Status.ne(RequestStatus::Rejected.as_str()))
}

pub(super) fn to_active_model(r: ParkingRequest) -> parking_request::ActiveModel {
    parking_request::ActiveModel {
        id: Set(r.id),
        plate_number: Set(r.plate_number),
        user_id: Set(r.user_id),
        vehicle_id: Set(r.vehicle_id),
        slot_id: Set(r.slot_id),
        check_in: Set(r.check_in),
        expected_check_out: Set(r.expected_check_out),
        check_out: Set(r.check_out),
        charged_amount: Set(r.charged_amount),
        status: Set(r.status.as_str().to_string()),
        approved_at: Set(r.approved_at),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

pub(super) fn unique_plate_err(e: DbErr) -> DomainError {
    if is_unique_violation(&e) {
        DomainError::Conflict("Car is already parked".into())
    } else {
        db_err(e)
    }
}

fn apply_filter(
    mut query: Select<parking_request::Entity>,
    filter: &RequestFilter,
) -> Select<parking_request::Entity> {
    if let Some(status) = filter.status {
        query = query.filter(parking_request::Column::Status.eq(status.as_str()));
    }
    if let Some(user_id) = &filter.user_id {
        query = query.filter(parking_request::Column::UserId.eq(user_id.as_str()));
    }
    if let Some(slot_id) = &filter.slot_id {
        query = query.filter(parking_request::Column::SlotId.eq(slot_id.as_str()));
    }
    if filter.open_only {
        query = query.filter(open_condition());
    }
    query
}

// ── ParkingRequestRepository impl ───────────────────────────────

#[async_trait]
impl ParkingRequestRepository for SeaOrmParkingRequestRepository {
    async fn save(&self, r: ParkingRequest) -> DomainResult<ParkingRequest> {
        debug!("Saving parking request {} for {}", r.id, r.plate_number);

        let inserted = to_active_model(r)
            .insert(&self.db)
            .await
            .map_err(unique_plate_err)?;
        Ok(model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingRequest>> {
        let model = parking_request::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self, filter: &RequestFilter) -> DomainResult<Vec<ParkingRequest>> {
        let models = apply_filter(parking_request::Entity::find(), filter)
            .order_by_desc(parking_request::Column::CheckIn)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingRequest>> {
        let models = parking_request::Entity::find()
            .filter(parking_request::Column::CheckIn.gte(start))
            .filter(parking_request::Column::CheckIn.lte(end))
            .order_by_desc(parking_request::Column::CheckIn)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_open_by_plate(
        &self,
        plate_number: &str,
    ) -> DomainResult<Option<ParkingRequest>> {
        let model = parking_request::Entity::find()
            .filter(parking_request::Column::PlateNumber.eq(plate_number))
            .filter(open_condition())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_open_by_plate_and_slot(
        &self,
        plate_number: &str,
        slot_id: &str,
    ) -> DomainResult<Option<ParkingRequest>> {
        let model = parking_request::Entity::find()
            .filter(parking_request::Column::PlateNumber.eq(plate_number))
            .filter(parking_request::Column::SlotId.eq(slot_id))
            .filter(open_condition())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn count_open_for_slot(&self, slot_id: &str) -> DomainResult<u64> {
        parking_request::Entity::find()
            .filter(parking_request::Column::SlotId.eq(slot_id))
            .filter(open_condition())
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<ParkingRequest>> {
        let models = parking_request::Entity::find()
            .filter(parking_request::Column::Status.eq(RequestStatus::Approved.as_str()))
            .filter(parking_request::Column::CheckOut.is_null())
            .filter(parking_request::Column::SlotId.is_not_null())
            .filter(parking_request::Column::ExpectedCheckOut.lte(now))
            .order_by_asc(parking_request::Column::ExpectedCheckOut)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
