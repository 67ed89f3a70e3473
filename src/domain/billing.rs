//! Duration-based charge computation
//!
//! `amount = hours × fee`, computed in decimal arithmetic from the exact
//! elapsed milliseconds and rounded to 2 decimal places (half away from
//! zero). Only the reported duration is rounded before display; the amount
//! is derived from the unrounded duration.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use super::{DomainError, DomainResult};

const MILLIS_PER_HOUR: i64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    /// Billed duration in hours, rounded to 2 decimals
    pub duration_hours: f64,
    /// Amount due, rounded to 2 decimals
    pub amount: f64,
}

/// Charge for parking from `start` to `end` at `fee_per_hour`.
///
/// An `end` before `start` is billed as zero duration.
pub fn compute_charge(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    fee_per_hour: f64,
) -> DomainResult<Charge> {
    let fee = Decimal::from_f64(fee_per_hour)
        .filter(|f| !f.is_sign_negative())
        .ok_or_else(|| {
            DomainError::Validation(format!("Invalid charging fee: {}", fee_per_hour))
        })?;

    let millis = Decimal::from((end - start).num_milliseconds().max(0));
    let per_hour = Decimal::from(MILLIS_PER_HOUR);

    let amount = millis
        .checked_mul(fee)
        .map(|total| total / per_hour)
        .ok_or_else(|| DomainError::Validation("Charge is out of range".into()))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    let hours =
        (millis / per_hour).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(Charge {
        duration_hours: hours.to_f64().unwrap_or_default(),
        amount: amount.to_f64().unwrap_or_default(),
    })
}
