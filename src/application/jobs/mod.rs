//! Periodic background jobs

pub mod availability_reconciler;
pub mod session_expiry;

pub use availability_reconciler::{
    start_availability_reconciler_task, AvailabilityReconciler, ReconcileReport,
};
pub use session_expiry::{start_session_expiry_task, SessionExpiry};
