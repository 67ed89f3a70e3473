pub mod jobs;
pub mod notifications;
pub mod services;

// Re-export key types for convenience
pub use jobs::{
    start_availability_reconciler_task, start_session_expiry_task, AvailabilityReconciler,
    ReconcileReport, SessionExpiry,
};
pub use notifications::{LogNotifier, Notification, NotificationDispatcher, Notifier};
pub use services::{
    AuthService, OccupancyService, ParkingSlotService, VehicleService,
};
