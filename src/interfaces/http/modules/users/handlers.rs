//! User API handlers
//!
//! Listing, search and deletion by id are admin-only; `/me` lets every
//! authenticated user edit or delete their own account.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{UpdateProfileRequest, UserDto};
use crate::application::services::UserService;
use crate::domain::User;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserHandlerState {
    pub users: Arc<UserService>,
}

fn to_dtos(users: Vec<User>) -> Vec<UserDto> {
    users.into_iter().map(UserDto::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = ApiResponse<Vec<UserDto>>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(State(state): State<UserHandlerState>) -> ApiResult<Vec<UserDto>> {
    let users = state.users.list().await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Users fetched successfully", to_dtos(users))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/search/{query}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("query" = String, Path, description = "Part of a first or last name")),
    responses(
        (status = 200, description = "Matching users", body = ApiResponse<Vec<UserDto>>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn search_users(
    State(state): State<UserHandlerState>,
    Path(query): Path<String>,
) -> ApiResult<Vec<UserDto>> {
    let users = state.users.search(&query).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Users fetched successfully", to_dtos(users))),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "User has an active parking"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.users.delete(&id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::done("User deleted successfully"))))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserDto>),
        (status = 400, description = "E-mail already registered"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_profile(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<UserDto> {
    let updated = state.users.update_profile(&user.user_id, body.into()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("User updated successfully", updated.into())),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Account has an active parking")
    )
)]
pub async fn delete_own_account(
    State(state): State<UserHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<()> {
    state.users.delete(&user.user_id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::done("User deleted successfully"))))
}
