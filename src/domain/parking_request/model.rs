//! Parking request (occupancy session) domain entity

use chrono::{DateTime, Utc};

/// Approval status of a parking request.
///
/// "Exited" is not a status of its own: an APPROVED request with a
/// `check_out` is a closed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vehicle's occupancy record, from check-in to check-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingRequest {
    pub id: String,
    /// Normalized plate, see [`normalize_plate`]
    pub plate_number: String,
    /// Owning user. `None` for anonymous gate entries.
    pub user_id: Option<String>,
    pub vehicle_id: Option<String>,
    /// Assigned slot. `None` until approval for request-then-approve sessions.
    pub slot_id: Option<String>,
    pub check_in: DateTime<Utc>,
    /// End of the window declared when the request was made
    pub expected_check_out: Option<DateTime<Utc>>,
    /// Actual exit time
    pub check_out: Option<DateTime<Utc>>,
    pub charged_amount: f64,
    pub status: RequestStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParkingRequest {
    /// A vehicle arriving at the gate. The slot is taken immediately.
    pub fn direct_entry(
        plate_number: &str,
        slot_id: &str,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plate_number: normalize_plate(plate_number),
            user_id,
            vehicle_id: None,
            slot_id: Some(slot_id.to_string()),
            check_in: now,
            expected_check_out: None,
            check_out: None,
            charged_amount: 0.0,
            status: RequestStatus::Pending,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A user asking for a space ahead of time. No slot until approval.
    pub fn requested(
        plate_number: &str,
        user_id: &str,
        vehicle_id: &str,
        check_in: DateTime<Utc>,
        expected_check_out: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plate_number: normalize_plate(plate_number),
            user_id: Some(user_id.to_string()),
            vehicle_id: Some(vehicle_id.to_string()),
            slot_id: None,
            check_in,
            expected_check_out,
            check_out: None,
            charged_amount: 0.0,
            status: RequestStatus::Pending,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// No exit recorded and not rejected.
    pub fn is_open(&self) -> bool {
        self.check_out.is_none() && self.status != RequestStatus::Rejected
    }

    /// Open and holding a space on a slot.
    pub fn occupies_slot(&self) -> bool {
        self.is_open() && self.slot_id.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.check_out.is_some()
    }

    /// End of the billed interval for an exit at `exit_at`.
    ///
    /// Sessions with a declared window are billed for that window;
    /// gate entries are billed up to the actual exit.
    pub fn billable_end(&self, exit_at: DateTime<Utc>) -> DateTime<Utc> {
        self.expected_check_out.unwrap_or(exit_at).max(self.check_in)
    }

    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Canonical plate form: surrounding whitespace trimmed, inner runs of
/// whitespace collapsed to one space, upper-cased.
pub fn normalize_plate(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Filter for request listings
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub user_id: Option<String>,
    pub slot_id: Option<String>,
    pub open_only: bool,
}

impl RequestFilter {
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Default::default()
        }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &ParkingRequest) -> bool {
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if !request.owned_by(user_id) {
                return false;
            }
        }
        if let Some(slot_id) = &self.slot_id {
            if request.slot_id.as_deref() != Some(slot_id.as_str()) {
                return false;
            }
        }
        !self.open_only || request.is_open()
    }
}
