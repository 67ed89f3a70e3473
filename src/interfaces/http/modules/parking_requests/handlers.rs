//! Parking request API handlers
//!
//! Users create requests for their own vehicles and read their own history.
//! Approval, rejection and administrative edits are admin-only; the router
//! puts those routes behind `require_admin`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    to_dtos, ApprovalDto, CreateParkingRequest, ListRequestsParams, ParkingRequestDto,
    UpdateParkingRequest,
};
use crate::application::services::{OccupancyService, RequestUpdate};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct ParkingRequestHandlerState {
    pub occupancy: Arc<OccupancyService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/parking-requests",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    request_body = CreateParkingRequest,
    responses(
        (status = 201, description = "Request created", body = ApiResponse<ParkingRequestDto>),
        (status = 400, description = "Invalid window or vehicle already has an open request"),
        (status = 403, description = "Vehicle belongs to someone else"),
        (status = 404, description = "Vehicle not found")
    )
)]
pub async fn create_request(
    State(state): State<ParkingRequestHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateParkingRequest>,
) -> ApiResult<ParkingRequestDto> {
    let request = state
        .occupancy
        .create_request(&user.user_id, &body.vehicle_id, body.check_in, body.check_out)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Parking request created successfully",
            request.into(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-requests",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(ListRequestsParams),
    responses(
        (status = 200, description = "All parking requests", body = ApiResponse<Vec<ParkingRequestDto>>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_requests(
    State(state): State<ParkingRequestHandlerState>,
    Query(params): Query<ListRequestsParams>,
) -> ApiResult<Vec<ParkingRequestDto>> {
    let filter = params.into_filter()?;
    let requests = state.occupancy.list_requests(&filter).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking requests fetched successfully",
            to_dtos(requests),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-requests/mine",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's parking requests", body = ApiResponse<Vec<ParkingRequestDto>>)
    )
)]
pub async fn my_requests(
    State(state): State<ParkingRequestHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<ParkingRequestDto>> {
    let requests = state.occupancy.user_requests(&user.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking requests fetched successfully",
            to_dtos(requests),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-requests/{id}",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking request ID")),
    responses(
        (status = 200, description = "Parking request", body = ApiResponse<ParkingRequestDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_request(
    State(state): State<ParkingRequestHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ParkingRequestDto> {
    let request = state
        .occupancy
        .get_request_for(&id, &user.user_id, user.is_admin())
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking request fetched successfully",
            request.into(),
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking-requests/{id}",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking request ID")),
    request_body = UpdateParkingRequest,
    responses(
        (status = 200, description = "Parking request updated", body = ApiResponse<ParkingRequestDto>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_request(
    State(state): State<ParkingRequestHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateParkingRequest>,
) -> ApiResult<ParkingRequestDto> {
    let update = RequestUpdate {
        status: body.status()?,
        check_out: body.check_out,
    };
    let request = state.occupancy.update_request(&id, update).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking request updated successfully",
            request.into(),
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parking-requests/{id}",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking request ID")),
    responses(
        (status = 200, description = "Parking request deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_request(
    State(state): State<ParkingRequestHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.occupancy.delete_request(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::done("Parking request deleted successfully")),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking-requests/approve/{id}",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking request ID")),
    responses(
        (status = 200, description = "Request approved and a slot assigned", body = ApiResponse<ApprovalDto>),
        (status = 400, description = "Not pending, or no slot has space"),
        (status = 404, description = "Not found")
    )
)]
pub async fn approve_request(
    State(state): State<ParkingRequestHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ApprovalDto> {
    let approval = state.occupancy.approve(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking request approved successfully",
            ApprovalDto {
                request: approval.request.into(),
                slot_number: approval.slot_code,
            },
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking-requests/reject/{id}",
    tag = "Parking Requests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Parking request ID")),
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<ParkingRequestDto>),
        (status = 400, description = "Not pending"),
        (status = 404, description = "Not found")
    )
)]
pub async fn reject_request(
    State(state): State<ParkingRequestHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<ParkingRequestDto> {
    let request = state.occupancy.reject(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Parking request rejected successfully",
            request.into(),
        )),
    ))
}
