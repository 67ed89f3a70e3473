//! Background task that keeps slot availability in step with occupancy.
//!
//! For every slot, `available` is recomputed as `total - open requests`
//! (clamped to `[0, total]`) and written only when it differs. Counting and
//! writing happen inside one ledger operation, so an entry or exit can never
//! fall between them. Running it twice in a row changes nothing the second
//! time.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{DomainResult, RepositoryProvider, SlotFilter};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub slots_checked: usize,
    pub slots_corrected: usize,
}

pub struct AvailabilityReconciler {
    repos: Arc<dyn RepositoryProvider>,
}

impl AvailabilityReconciler {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// One reconciliation pass over every slot.
    pub async fn run_once(&self) -> DomainResult<ReconcileReport> {
        let slots = self
            .repos
            .parking_slots()
            .find_all(&SlotFilter::default())
            .await?;

        let mut report = ReconcileReport::default();
        for slot in slots {
            report.slots_checked += 1;

            if let Some(corrected) = self.repos.ledger().reconcile(&slot.id).await? {
                warn!(
                    slot = %slot.code,
                    stored = slot.available_spaces,
                    corrected,
                    "Corrected parking slot availability"
                );
                report.slots_corrected += 1;
            }
        }

        if report.slots_corrected > 0 {
            metrics::counter!("parking_reconciler_corrections_total")
                .increment(report.slots_corrected as u64);
        }
        debug!(
            checked = report.slots_checked,
            corrected = report.slots_corrected,
            "Availability reconciled"
        );
        Ok(report)
    }
}

/// Start the availability reconciler background task.
pub fn start_availability_reconciler_task(
    repos: Arc<dyn RepositoryProvider>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    let reconciler = AvailabilityReconciler::new(repos);

    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "🔄 Availability reconciler started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = reconciler.run_once().await {
                        warn!(error = %e, "Availability reconciliation error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("🔄 Availability reconciler shutting down");
                    break;
                }
            }
        }

        info!("🔄 Availability reconciler stopped");
    });
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::application::services::OccupancyService;
    use crate::domain::{ParkingRequest, ParkingSlot, RequestFilter};
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::clock::SystemClock;

    #[tokio::test]
    async fn corrects_drift_and_is_idempotent() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let slot = ParkingSlot::new("A-01", "Lot", "Kigali", 4, 1.0, Utc::now()).unwrap();
        let slot = repos.parking_slots().save(slot).await.unwrap();
        let other = ParkingSlot::new("B-01", "Lot", "Kigali", 2, 1.0, Utc::now()).unwrap();
        repos.parking_slots().save(other).await.unwrap();

        // two open requests but the counter was never decremented
        for plate in ["RAA 1", "RAA 2"] {
            let r = ParkingRequest::direct_entry(plate, &slot.id, None, Utc::now());
            repos.parking_requests().save(r).await.unwrap();
        }

        let reconciler = AvailabilityReconciler::new(repos.clone());
        let first = reconciler.run_once().await.unwrap();
        assert_eq!(
            first,
            ReconcileReport {
                slots_checked: 2,
                slots_corrected: 1
            }
        );
        let stored = repos.parking_slots().find_by_id(&slot.id).await.unwrap().unwrap();
        assert_eq!(stored.available_spaces, 2);

        let second = reconciler.run_once().await.unwrap();
        assert_eq!(second.slots_corrected, 0);
    }

    #[tokio::test]
    async fn clamps_at_zero_when_overbooked() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let slot = ParkingSlot::new("A-01", "Lot", "Kigali", 1, 1.0, Utc::now()).unwrap();
        let slot = repos.parking_slots().save(slot).await.unwrap();
        for plate in ["RAA 1", "RAA 2", "RAA 3"] {
            let r = ParkingRequest::direct_entry(plate, &slot.id, None, Utc::now());
            repos.parking_requests().save(r).await.unwrap();
        }

        AvailabilityReconciler::new(repos.clone()).run_once().await.unwrap();
        let stored = repos.parking_slots().find_by_id(&slot.id).await.unwrap().unwrap();
        assert_eq!(stored.available_spaces, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn passes_during_gate_traffic_find_nothing_to_fix() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let slot = ParkingSlot::new("A-01", "Lot", "Kigali", 3, 1.0, Utc::now()).unwrap();
        let slot = repos.parking_slots().save(slot).await.unwrap();
        let occupancy = Arc::new(OccupancyService::new(repos.clone(), Arc::new(SystemClock)));

        let gates: Vec<_> = (0..6)
            .map(|car| {
                let occupancy = occupancy.clone();
                tokio::spawn(async move {
                    let plate = format!("RAC {car}");
                    for _ in 0..25 {
                        if occupancy.record_entry(&plate, "A-01", None).await.is_ok() {
                            occupancy.record_exit(&plate, "A-01").await.unwrap();
                        }
                    }
                })
            })
            .collect();

        let reconciler = AvailabilityReconciler::new(repos.clone());
        let mut passes = 0;
        while gates.iter().any(|g| !g.is_finished()) {
            let report = reconciler.run_once().await.unwrap();
            assert_eq!(report.slots_corrected, 0, "pass {passes} saw a moving counter");
            passes += 1;
            tokio::task::yield_now().await;
        }
        for gate in gates {
            gate.await.unwrap();
        }

        assert_eq!(reconciler.run_once().await.unwrap().slots_corrected, 0);
        let stored = repos.parking_slots().find_by_id(&slot.id).await.unwrap().unwrap();
        assert_eq!(stored.available_spaces, 3);

        let open = RequestFilter {
            slot_id: Some(slot.id.clone()),
            open_only: true,
            ..RequestFilter::default()
        };
        assert!(repos.parking_requests().find_all(&open).await.unwrap().is_empty());
    }
}
