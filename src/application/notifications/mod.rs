//! User notifications for parking request outcomes

pub mod dispatcher;
pub mod notifier;

pub use dispatcher::NotificationDispatcher;
pub use notifier::{LogNotifier, Notification, Notifier, NotifyError};
