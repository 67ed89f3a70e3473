//! Vehicle DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::services::VehicleUpdate;
use crate::domain::Vehicle;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: String,
    pub plate_number: String,
    pub color: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            plate_number: v.plate_number,
            color: v.color,
            owner_id: v.owner_id,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 20, message = "plateNumber must be 1-20 characters"))]
    pub plate_number: String,
    #[validate(length(min = 1, max = 30, message = "color is required"))]
    pub color: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 20, message = "plateNumber must be 1-20 characters"))]
    pub plate_number: Option<String>,
    #[validate(length(min = 1, max = 30, message = "color must not be empty"))]
    pub color: Option<String>,
}

impl From<UpdateVehicleRequest> for VehicleUpdate {
    fn from(r: UpdateVehicleRequest) -> Self {
        Self {
            plate_number: r.plate_number,
            color: r.color,
        }
    }
}
