//! Vehicle API handlers
//!
//! Every route is open to authenticated users. Ownership is enforced by
//! [`VehicleService`]: users reach their own vehicles, admins reach all.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{CreateVehicleRequest, UpdateVehicleRequest, VehicleDto};
use crate::application::services::{Actor, VehicleService};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct VehicleHandlerState {
    pub vehicles: Arc<VehicleService>,
}

fn actor(user: &AuthenticatedUser) -> Actor<'_> {
    Actor {
        user_id: &user.user_id,
        is_admin: user.is_admin(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered", body = ApiResponse<VehicleDto>),
        (status = 400, description = "Plate number already registered")
    )
)]
pub async fn create_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateVehicleRequest>,
) -> ApiResult<VehicleDto> {
    let vehicle = state
        .vehicles
        .register(&user.user_id, &body.plate_number, &body.color)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Vehicle created successfully", vehicle.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own vehicles, or all for an admin", body = ApiResponse<Vec<VehicleDto>>)
    )
)]
pub async fn list_vehicles(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<VehicleDto>> {
    let vehicles = state.vehicles.list(actor(&user)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            "Vehicles fetched successfully",
            vehicles.into_iter().map(VehicleDto::from).collect(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle", body = ApiResponse<VehicleDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<VehicleDto> {
    let vehicle = state.vehicles.get(&id, actor(&user)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Vehicle fetched successfully", vehicle.into())),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<VehicleDto>),
        (status = 400, description = "Plate taken, or vehicle currently parked"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateVehicleRequest>,
) -> ApiResult<VehicleDto> {
    let vehicle = state
        .vehicles
        .update(&id, actor(&user), body.into())
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Vehicle updated successfully", vehicle.into())),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle deleted"),
        (status = 400, description = "Vehicle currently parked"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.vehicles.delete(&id, actor(&user)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::done("Vehicle deleted successfully")),
    ))
}
