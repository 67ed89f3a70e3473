//! Response envelope

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope shared by every REST endpoint.
///
/// Success: `{"success": true, "message": "...", "data": {...}}`,
/// failure: `{"success": false, "message": "...", "data": null}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// Payload. `null` on failure
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload (deletes and the like)
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}
