//! Parking slot domain entity

use chrono::{DateTime, Utc};

use crate::domain::{DomainError, DomainResult};

/// A parking location with a fixed capacity and an hourly fee.
///
/// `available_spaces` is a derived counter: it always equals
/// `total_spaces` minus the number of open requests parked here.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingSlot {
    pub id: String,
    /// Unique, human-readable code used at the gate (e.g. `A-01`)
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

impl ParkingSlot {
    /// Build a new, empty slot. Availability starts at full capacity.
    pub fn new(
        code: &str,
        name: &str,
        location: &str,
        total_spaces: i32,
        charging_fee: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::Validation("Parking code is required".into()));
        }
        validate_capacity(total_spaces)?;
        validate_fee(charging_fee)?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.trim().to_string(),
            location: location.trim().to_string(),
            total_spaces,
            available_spaces: total_spaces,
            charging_fee,
            created_at: now,
            updated_at: now,
        })
    }

    /// Spaces currently held by open requests according to the counter.
    pub fn occupied_spaces(&self) -> i32 {
        self.total_spaces - self.available_spaces
    }

    pub fn has_space(&self) -> bool {
        self.available_spaces > 0
    }

    pub fn is_vacant(&self) -> bool {
        self.available_spaces == self.total_spaces
    }
}

pub fn validate_capacity(total_spaces: i32) -> DomainResult<()> {
    if total_spaces < 1 {
        return Err(DomainError::Validation(
            "Total spaces must be at least 1".into(),
        ));
    }
    Ok(())
}

pub fn validate_fee(charging_fee: f64) -> DomainResult<()> {
    if !charging_fee.is_finite() || charging_fee < 0.0 {
        return Err(DomainError::Validation(
            "Charging fee must be a non-negative number".into(),
        ));
    }
    Ok(())
}

/// Filter for slot listings
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    /// Only slots with at least one free space
    pub available_only: bool,
    /// Case-insensitive substring match on `location`
    pub location: Option<String>,
}

impl SlotFilter {
    pub fn matches(&self, slot: &ParkingSlot) -> bool {
        if self.available_only && !slot.has_space() {
            return false;
        }
        match &self.location {
            Some(loc) => slot
                .location
                .to_lowercase()
                .contains(&loc.to_lowercase()),
            None => true,
        }
    }
}

/// Compare-and-swap on a slot's capacity counters.
///
/// Applied only while the stored counters still equal the observed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityChange {
    pub observed_total: i32,
    pub observed_available: i32,
    pub new_total: i32,
    pub new_available: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn new_slot_starts_fully_available() {
        let slot = ParkingSlot::new(" A-01 ", "North", "Kigali", 5, 2.0, now()).unwrap();
        assert_eq!(slot.code, "A-01");
        assert_eq!(slot.available_spaces, 5);
        assert_eq!(slot.occupied_spaces(), 0);
        assert!(slot.is_vacant());
    }

    #[test]
    fn rejects_zero_capacity_and_negative_fee() {
        assert!(matches!(
            ParkingSlot::new("A", "n", "l", 0, 1.0, now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ParkingSlot::new("A", "n", "l", 1, -0.5, now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ParkingSlot::new("  ", "n", "l", 1, 1.0, now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn filter_by_availability_and_location() {
        let mut slot = ParkingSlot::new("A", "n", "Kigali Heights", 1, 1.0, now()).unwrap();
        let filter = SlotFilter {
            available_only: true,
            location: Some("heights".into()),
        };
        assert!(filter.matches(&slot));

        slot.available_spaces = 0;
        assert!(!filter.matches(&slot));
        assert!(SlotFilter::default().matches(&slot));
    }
}
