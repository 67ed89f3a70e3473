//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UserInfo};
use crate::application::services::AuthService;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub auth: Arc<AuthService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let result = state.auth.login(&request.email, &request.password).await?;

    let response = LoginResponse {
        token: result.token,
        token_type: result.token_type,
        expires_in: result.expires_in,
        user: result.user.into(),
    };

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("Login successful", response)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserInfo>),
        (status = 400, description = "Weak password or e-mail already registered"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<UserInfo> {
    let user = state.auth.register(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", user.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<UserInfo> {
    let user = state.auth.current_user(&user.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success("User fetched successfully", user.into())),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new password"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .auth
        .change_password(&user.user_id, &request.current_password, &request.new_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::done("Password updated successfully")),
    ))
}
