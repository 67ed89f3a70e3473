//! Outbound notification port and the logging implementation

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// A rendered message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Confirmation sent when a parking request is approved.
    pub fn request_approved(recipient: &str, names: &str, plate: &str, slot_code: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: "Parking Slot Confirmation".to_string(),
            body: format!(
                "Dear {names},\n\n\
                 We are pleased to confirm your parking request for {plate}.\n\
                 Your assigned parking slot is: {slot_code}\n\n\
                 Best regards,\nParking Management Team"
            ),
        }
    }

    pub fn request_rejected(recipient: &str, names: &str, plate: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: "Parking Request Rejected".to_string(),
            body: format!(
                "Dear {names},\n\n\
                 We regret to inform you that your parking request for {plate} \
                 has been rejected.\n\
                 This may be due to limited availability. Please try again later.\n\n\
                 Best regards,\nParking Management Team"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Worth another attempt (timeouts, unavailable transport)
    #[error("transient delivery failure: {0}")]
    Transient(String),

    #[error("delivery failed: {0}")]
    Permanent(String),
}

impl NotifyError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Delivers rendered notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes each notification to the log instead of a mail transport.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("noreply@parking.local")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            from = %self.sender,
            to = %notification.recipient,
            subject = %notification.subject,
            "✉️  {}",
            notification.body.replace('\n', " ")
        );
        Ok(())
    }
}
