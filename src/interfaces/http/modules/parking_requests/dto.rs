//! Parking request DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{DomainError, ParkingRequest, RequestFilter, RequestStatus};

/// Parking request (occupancy session) API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParkingRequestDto {
    pub id: String,
    pub plate_number: String,
    pub user_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub slot_id: Option<String>,
    pub check_in: DateTime<Utc>,
    pub expected_check_out: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub charged_amount: f64,
    /// PENDING, APPROVED or REJECTED
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingRequest> for ParkingRequestDto {
    fn from(r: ParkingRequest) -> Self {
        Self {
            id: r.id,
            plate_number: r.plate_number,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            slot_id: r.slot_id,
            check_in: r.check_in,
            expected_check_out: r.expected_check_out,
            check_out: r.check_out,
            charged_amount: r.charged_amount,
            status: r.status.as_str().to_string(),
            approved_at: r.approved_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub fn to_dtos(requests: Vec<ParkingRequest>) -> Vec<ParkingRequestDto> {
    requests.into_iter().map(ParkingRequestDto::from).collect()
}

/// Ask for a space for one of the caller's vehicles
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateParkingRequest {
    #[validate(length(min = 1, message = "vehicleId is required"))]
    pub vehicle_id: String,
    pub check_in: DateTime<Utc>,
    /// End of the requested window
    pub check_out: Option<DateTime<Utc>>,
}

/// Administrative override
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParkingRequest {
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    pub check_out: Option<DateTime<Utc>>,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match RequestStatus::parse(status) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("status")
            .with_message("status must be PENDING, APPROVED or REJECTED".into())),
    }
}

impl UpdateParkingRequest {
    pub fn status(&self) -> Result<Option<RequestStatus>, DomainError> {
        self.status
            .as_deref()
            .map(|s| {
                RequestStatus::parse(s)
                    .ok_or_else(|| DomainError::Validation(format!("Unknown status '{}'", s)))
            })
            .transpose()
    }
}

/// Approval result
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDto {
    pub request: ParkingRequestDto,
    /// Code of the assigned slot
    pub slot_number: String,
}

/// Listing filters (admin)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListRequestsParams {
    /// PENDING, APPROVED or REJECTED
    pub status: Option<String>,
    pub slot_id: Option<String>,
    pub user_id: Option<String>,
    /// Only sessions without a recorded exit
    #[serde(default)]
    pub open_only: bool,
}

impl ListRequestsParams {
    pub fn into_filter(self) -> Result<RequestFilter, DomainError> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                RequestStatus::parse(s)
                    .ok_or_else(|| DomainError::Validation(format!("Unknown status '{}'", s)))
            })
            .transpose()?;
        Ok(RequestFilter {
            status,
            user_id: self.user_id,
            slot_id: self.slot_id,
            open_only: self.open_only,
        })
    }
}
