//! Fire-and-forget delivery of request outcome notifications
//!
//! Each delivery runs on its own task after the state change has been
//! committed. Failures are retried with backoff and then logged; they never
//! reach the caller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::notifier::{Notification, Notifier};
use crate::domain::{ParkingRequest, RepositoryProvider};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

#[derive(Clone)]
pub struct NotificationDispatcher {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Option<Arc<dyn Notifier>>,
    retry: RetryConfig,
}

enum Outcome {
    Approved { slot_code: String },
    Rejected,
}

impl NotificationDispatcher {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repos,
            notifier: Some(notifier),
            retry: RetryConfig::default(),
        }
    }

    /// Dispatcher that drops every notification.
    pub fn disabled(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repos,
            notifier: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn request_approved(
        &self,
        request: &ParkingRequest,
        slot_code: &str,
    ) -> Option<JoinHandle<()>> {
        self.dispatch(
            request,
            Outcome::Approved {
                slot_code: slot_code.to_string(),
            },
        )
    }

    pub fn request_rejected(&self, request: &ParkingRequest) -> Option<JoinHandle<()>> {
        self.dispatch(request, Outcome::Rejected)
    }

    fn dispatch(&self, request: &ParkingRequest, outcome: Outcome) -> Option<JoinHandle<()>> {
        let notifier = self.notifier.clone()?;
        let Some(user_id) = request.user_id.clone() else {
            debug!(request_id = %request.id, "No owner to notify");
            return None;
        };

        let repos = self.repos.clone();
        let retry = self.retry.clone();
        let request_id = request.id.clone();
        let plate = request.plate_number.clone();

        Some(tokio::spawn(async move {
            let user = match repos.users().find_by_id(&user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(%request_id, %user_id, "Notification skipped: owner not found");
                    return;
                }
                Err(e) => {
                    warn!(%request_id, error = %e, "Notification skipped: owner lookup failed");
                    return;
                }
            };

            let (notification, name) = match &outcome {
                Outcome::Approved { slot_code } => (
                    Notification::request_approved(&user.email, &user.full_name(), &plate, slot_code),
                    "notify_request_approved",
                ),
                Outcome::Rejected => (
                    Notification::request_rejected(&user.email, &user.full_name(), &plate),
                    "notify_request_rejected",
                ),
            };

            let result = retry_with_backoff(
                retry,
                || notifier.send(&notification),
                |e| e.is_transient(),
                name,
            )
            .await;

            if let Err(e) = result {
                warn!(%request_id, recipient = %notification.recipient, error = %e, "Notification not delivered");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::application::notifications::notifier::NotifyError;
    use crate::domain::{User, UserRole};
    use crate::infrastructure::InMemoryRepositoryProvider;

    /// Fails the first `failures` sends with a transient error.
    struct FlakyNotifier {
        failures: u32,
        attempts: AtomicU32,
        delivered: Mutex<Vec<Notification>>,
    }

    impl FlakyNotifier {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(NotifyError::Transient("smtp timeout".into()));
            }
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_millis(1),
        }
    }

    async fn setup(failures: u32) -> (NotificationDispatcher, Arc<FlakyNotifier>, ParkingRequest) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let user = User::new("Ada", "Lovelace", "ada@example.com", "h".into(), UserRole::User, Utc::now());
        let user = repos.users().save(user).await.unwrap();

        let notifier = Arc::new(FlakyNotifier::new(failures));
        let dispatcher =
            NotificationDispatcher::new(repos, notifier.clone()).with_retry(fast_retry());
        let request =
            ParkingRequest::requested("RAB 123C", &user.id, "v1", Utc::now(), None, Utc::now());
        (dispatcher, notifier, request)
    }

    #[tokio::test]
    async fn approval_is_delivered_to_owner_email() {
        let (dispatcher, notifier, request) = setup(0).await;

        dispatcher
            .request_approved(&request, "A-01")
            .unwrap()
            .await
            .unwrap();

        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].recipient, "ada@example.com");
        assert!(delivered[0].body.contains("A-01"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (dispatcher, notifier, request) = setup(2).await;

        dispatcher.request_rejected(&request).unwrap().await.unwrap();

        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (dispatcher, notifier, request) = setup(10).await;

        dispatcher.request_rejected(&request).unwrap().await.unwrap();

        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
        assert!(notifier.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_and_disabled_send_nothing() {
        let (dispatcher, _notifier, _) = setup(0).await;
        let gate = ParkingRequest::direct_entry("RAB 1", "s1", None, Utc::now());
        assert!(dispatcher.request_rejected(&gate).is_none());

        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let disabled = NotificationDispatcher::disabled(repos);
        let owned = ParkingRequest::requested("RAB 2", "u1", "v1", Utc::now(), None, Utc::now());
        assert!(disabled.request_approved(&owned, "A-01").is_none());
    }
}
