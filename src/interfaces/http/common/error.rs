//! Mapping of domain errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::DomainError;

/// Handler result: a status plus the enveloped payload, or a domain error.
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// Wraps a [`DomainError`] so handlers can use `?` on service calls.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation(_)
            | DomainError::Conflict(_)
            | DomainError::CapacityExceeded(_)
            | DomainError::InvalidState(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            DomainError::Storage(raw) => {
                error!(error = %raw, "Storage failure while handling request");
                "Internal server error".to_string()
            }
            DomainError::Unauthorized(msg) | DomainError::Forbidden(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()>::error(self.message());
        (status, Json(body)).into_response()
    }
}
