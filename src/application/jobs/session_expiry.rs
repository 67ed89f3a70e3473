//! Background task that closes approved sessions past their declared
//! check-out.
//!
//! Each overdue session is closed at its `expected_check_out`, charged for
//! the declared window, and its space is given back.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use crate::domain::{compute_charge, DomainResult, ParkingRequest, RepositoryProvider};
use crate::shared::clock::SharedClock;
use crate::shared::shutdown::ShutdownSignal;

pub struct SessionExpiry {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl SessionExpiry {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    /// Close every overdue session. Returns how many were closed.
    pub async fn run_once(&self) -> DomainResult<usize> {
        let overdue = self
            .repos
            .parking_requests()
            .find_overdue(self.clock.now())
            .await?;

        if overdue.is_empty() {
            return Ok(0);
        }

        info!(count = overdue.len(), "Closing overdue parking sessions");

        let mut closed = 0;
        for request in overdue {
            match self.close(&request).await {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => warn!(request_id = %request.id, error = %e, "Failed to close overdue session"),
            }
        }
        Ok(closed)
    }

    async fn close(&self, request: &ParkingRequest) -> DomainResult<bool> {
        let (Some(slot_id), Some(due)) = (&request.slot_id, request.expected_check_out) else {
            return Ok(false);
        };
        let Some(slot) = self.repos.parking_slots().find_by_id(slot_id).await? else {
            return Ok(false);
        };

        let check_out = due.max(request.check_in);
        let charge = compute_charge(request.check_in, check_out, slot.charging_fee)?;

        // A concurrent exit may have closed it first.
        if !self
            .repos
            .ledger()
            .close(&request.id, check_out, charge.amount)
            .await?
        {
            return Ok(false);
        }

        metrics::counter!("parking_exits_total", "slot" => slot.code.clone()).increment(1);
        metrics::histogram!("parking_charged_amount").record(charge.amount);
        info!(
            request_id = %request.id,
            plate = %request.plate_number,
            amount = charge.amount,
            "⏰ Overdue parking session closed"
        );
        Ok(true)
    }
}

/// Start the session expiry background task.
pub fn start_session_expiry_task(
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    let expiry = SessionExpiry::new(repos, clock);

    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "⏰ Session expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = expiry.run_once().await {
                        warn!(error = %e, "Session expiry check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("⏰ Session expiry task shutting down");
                    break;
                }
            }
        }

        info!("⏰ Session expiry task stopped");
    });
}
