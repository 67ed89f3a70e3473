//! Parking slot API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    CreateSlotRequest, ExitDto, GateEventRequest, ListSlotsParams, ParkingSlotDto, ReportDto,
    ReportRequest, UpdateSlotRequest,
};
use crate::application::services::{OccupancyService, ParkingSlotService};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::parking_requests::{to_dtos, ParkingRequestDto};

#[derive(Clone)]
pub struct ParkingSlotHandlerState {
    pub slots: Arc<ParkingSlotService>,
    pub occupancy: Arc<OccupancyService>,
}

// ── Administration ──────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    request_body = CreateSlotRequest,
    responses(
        (status = 201, description = "Slot created", body = ApiResponse<ParkingSlotDto>),
        (status = 400, description = "Duplicate code or invalid values"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_slot(
    State(state): State<ParkingSlotHandlerState>,
    ValidatedJson(body): ValidatedJson<CreateSlotRequest>,
) -> ApiResult<ParkingSlotDto> {
    let slot = state.slots.create_slot(body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Parking slot created successfully",
            slot.into(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(ListSlotsParams),
    responses(
        (status = 200, description = "Slots ordered by code", body = ApiResponse<Vec<ParkingSlotDto>>)
    )
)]
pub async fn list_slots(
    State(state): State<ParkingSlotHandlerState>,
    Query(params): Query<ListSlotsParams>,
) -> ApiResult<Vec<ParkingSlotDto>> {
    let slots = state.slots.list_slots(&params.into()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking slots fetched successfully",
            slots.into_iter().map(ParkingSlotDto::from).collect(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking slot ID")),
    responses(
        (status = 200, description = "Parking slot", body = ApiResponse<ParkingSlotDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_slot(
    State(state): State<ParkingSlotHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ParkingSlotDto> {
    let slot = state.slots.get_slot(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Parking slot fetched successfully", slot.into())),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking slot ID")),
    request_body = UpdateSlotRequest,
    responses(
        (status = 200, description = "Slot updated", body = ApiResponse<ParkingSlotDto>),
        (status = 400, description = "New capacity below current occupancy"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_slot(
    State(state): State<ParkingSlotHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateSlotRequest>,
) -> ApiResult<ParkingSlotDto> {
    let slot = state.slots.update_slot(&id, body.into()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Parking slot updated successfully", slot.into())),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking slot ID")),
    responses(
        (status = 200, description = "Slot deleted"),
        (status = 400, description = "Slot is occupied"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_slot(
    State(state): State<ParkingSlotHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.slots.delete_slot(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::done("Parking slot deleted successfully")),
    ))
}

// ── Gate ────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots/entry",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    request_body = GateEventRequest,
    responses(
        (status = 201, description = "Entry recorded", body = ApiResponse<ParkingRequestDto>),
        (status = 400, description = "No space or car already parked"),
        (status = 404, description = "Slot not found")
    )
)]
pub async fn record_entry(
    State(state): State<ParkingSlotHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<GateEventRequest>,
) -> ApiResult<ParkingRequestDto> {
    let request = state
        .occupancy
        .record_entry(&body.plate_number, &body.parking_code, Some(&user.user_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Car entry recorded successfully",
            request.into(),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots/exit",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    request_body = GateEventRequest,
    responses(
        (status = 200, description = "Exit recorded and charged", body = ApiResponse<ExitDto>),
        (status = 404, description = "Slot or active parking not found")
    )
)]
pub async fn record_exit(
    State(state): State<ParkingSlotHandlerState>,
    ValidatedJson(body): ValidatedJson<GateEventRequest>,
) -> ApiResult<ExitDto> {
    let receipt = state
        .occupancy
        .record_exit(&body.plate_number, &body.parking_code)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Car exit recorded successfully",
            receipt.into(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/active",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sessions without a recorded exit", body = ApiResponse<Vec<ParkingRequestDto>>)
    )
)]
pub async fn active_parkings(
    State(state): State<ParkingSlotHandlerState>,
) -> ApiResult<Vec<ParkingRequestDto>> {
    let requests = state.occupancy.active_requests().await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Active parkings fetched successfully",
            to_dtos(requests),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots/report",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Sessions checked in within the range, with totals", body = ApiResponse<ReportDto>),
        (status = 400, description = "Unparseable dates or end before start"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn parking_report(
    State(state): State<ParkingSlotHandlerState>,
    ValidatedJson(body): ValidatedJson<ReportRequest>,
) -> ApiResult<ReportDto> {
    let (start, end) = body.bounds()?;
    let report = state.occupancy.report(start, end).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking report generated successfully",
            report.into(),
        )),
    ))
}
