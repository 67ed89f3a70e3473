//! Parking slot DTOs

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::services::{ExitReceipt, NewSlot, ParkingReport, SlotUpdate};
use crate::domain::{DomainError, ParkingSlot, SlotFilter};
use crate::interfaces::http::modules::parking_requests::{to_dtos, ParkingRequestDto};

/// Parking slot API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSlotDto {
    pub id: String,
    pub code: String,
    pub name: String,
    pub location: String,
    pub total_spaces: i32,
    pub available_spaces: i32,
    /// Price per hour
    pub charging_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingSlot> for ParkingSlotDto {
    fn from(s: ParkingSlot) -> Self {
        Self {
            id: s.id,
            code: s.code,
            name: s.name,
            location: s.location,
            total_spaces: s.total_spaces,
            available_spaces: s.available_spaces,
            charging_fee: s.charging_fee,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "location is required"))]
    pub location: String,
    #[validate(range(min = 1, message = "totalSpaces must be at least 1"))]
    pub total_spaces: i32,
    #[validate(range(min = 0.0, message = "chargingFee must not be negative"))]
    pub charging_fee: f64,
}

impl From<CreateSlotRequest> for NewSlot {
    fn from(r: CreateSlotRequest) -> Self {
        Self {
            code: r.code,
            name: r.name,
            location: r.location,
            total_spaces: r.total_spaces,
            charging_fee: r.charging_fee,
        }
    }
}

/// Partial update. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlotRequest {
    #[validate(length(min = 1, max = 100, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "location must not be empty"))]
    pub location: Option<String>,
    #[validate(range(min = 1, message = "totalSpaces must be at least 1"))]
    pub total_spaces: Option<i32>,
    #[validate(range(min = 0.0, message = "chargingFee must not be negative"))]
    pub charging_fee: Option<f64>,
}

impl From<UpdateSlotRequest> for SlotUpdate {
    fn from(r: UpdateSlotRequest) -> Self {
        Self {
            name: r.name,
            location: r.location,
            total_spaces: r.total_spaces,
            charging_fee: r.charging_fee,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSlotsParams {
    /// Only slots with at least one free space
    #[serde(default)]
    pub available_only: bool,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
}

impl From<ListSlotsParams> for SlotFilter {
    fn from(p: ListSlotsParams) -> Self {
        Self {
            available_only: p.available_only,
            location: p.location,
        }
    }
}

/// A vehicle passing the gate of a slot (entry or exit)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GateEventRequest {
    #[validate(length(min = 1, max = 20, message = "plateNumber is required"))]
    pub plate_number: String,
    #[validate(length(min = 1, message = "parkingCode is required"))]
    pub parking_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExitDto {
    pub parking_request: ParkingRequestDto,
    /// Billed hours, two decimals
    pub duration: f64,
    pub charged_amount: f64,
}

impl From<ExitReceipt> for ExitDto {
    fn from(r: ExitReceipt) -> Self {
        Self {
            parking_request: r.request.into(),
            duration: (r.duration_hours * 100.0).round() / 100.0,
            charged_amount: r.charged_amount,
        }
    }
}

/// Report bounds. RFC 3339 timestamps or plain `YYYY-MM-DD` dates; a plain
/// end date covers that whole day.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[validate(length(min = 1, message = "startDate is required"))]
    pub start_date: String,
    #[validate(length(min = 1, message = "endDate is required"))]
    pub end_date: String,
}

impl ReportRequest {
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), DomainError> {
        Ok((
            parse_bound(&self.start_date, NaiveTime::MIN)?,
            parse_bound(&self.end_date, end_of_day())?,
        ))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(raw: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, DomainError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| Utc.from_utc_datetime(&d.and_time(time_of_day)))
        .map_err(|_| DomainError::Validation(format!("Invalid date '{}'", raw)))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryDto {
    pub total_entries: usize,
    pub active_entries: usize,
    pub completed_entries: usize,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportDto {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub parking_requests: Vec<ParkingRequestDto>,
    pub total_charged: f64,
    pub active_parkings: Vec<ParkingRequestDto>,
    pub completed_parkings: Vec<ParkingRequestDto>,
    pub summary: ReportSummaryDto,
}

impl From<ParkingReport> for ReportDto {
    fn from(r: ParkingReport) -> Self {
        Self {
            start_date: r.start,
            end_date: r.end,
            parking_requests: to_dtos(r.requests),
            total_charged: r.total_charged,
            active_parkings: to_dtos(r.active),
            completed_parkings: to_dtos(r.completed),
            summary: ReportSummaryDto {
                total_entries: r.summary.total_entries,
                active_entries: r.summary.active_entries,
                completed_entries: r.summary.completed_entries,
                total_revenue: r.summary.total_revenue,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_cover_whole_days() {
        let req = ReportRequest {
            start_date: "2024-03-01".into(),
            end_date: "2024-03-01".into(),
        };
        let (start, end) = req.bounds().unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(end > start);
        assert_eq!(end.date_naive(), start.date_naive());
    }

    #[test]
    fn timestamps_keep_their_offset() {
        let req = ReportRequest {
            start_date: "2024-03-01T10:00:00+02:00".into(),
            end_date: "2024-03-02T00:00:00Z".into(),
        };
        let (start, _) = req.bounds().unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn garbage_is_a_validation_error() {
        let req = ReportRequest {
            start_date: "yesterday".into(),
            end_date: "2024-03-02".into(),
        };
        assert!(matches!(req.bounds(), Err(DomainError::Validation(_))));
    }
}
