//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::services::ProfileUpdate;
use crate::domain::User;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            role: u.role.as_str().to_string(),
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "firstName must be 1-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "lastName must be 1-50 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
        }
    }
}
