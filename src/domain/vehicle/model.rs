//! Vehicle domain entity

use chrono::{DateTime, Utc};

use crate::domain::parking_request::normalize_plate;

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub plate_number: String,
    pub color: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(owner_id: &str, plate_number: &str, color: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plate_number: normalize_plate(plate_number),
            color: color.trim().to_string(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
