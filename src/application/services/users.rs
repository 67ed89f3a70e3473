//! User administration and self-service profile management

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, DomainResult, RepositoryProvider, RequestFilter, User};
use crate::shared::clock::SharedClock;

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl UserService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn list(&self) -> DomainResult<Vec<User>> {
        self.repos.users().find_all().await
    }

    pub async fn search(&self, query: &str) -> DomainResult<Vec<User>> {
        if query.trim().is_empty() {
            return Err(DomainError::Validation("Search query is required".into()));
        }
        self.repos.users().search_by_name(query).await
    }

    pub async fn get(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    /// Change names and/or e-mail. Fields left out keep their value.
    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> DomainResult<User> {
        let mut user = self.get(id).await?;

        if let Some(first_name) = update.first_name {
            user.first_name = required("First name", &first_name)?;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = required("Last name", &last_name)?;
        }
        if let Some(email) = update.email {
            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                return Err(DomainError::Validation("Invalid email address".into()));
            }
            user.email = email;
        }
        user.updated_at = self.clock.now();

        self.repos.users().update(&user).await?;
        info!(user_id = %user.id, "User profile updated");
        Ok(user)
    }

    /// Delete an account together with its vehicles.
    ///
    /// Refused with `Conflict` while the user, or one of their vehicles,
    /// still has an open parking request. Closed requests stay for reporting
    /// with the owner cleared.
    pub async fn delete(&self, id: &str) -> DomainResult<()> {
        let user = self.get(id).await?;
        if self.has_open_session(&user).await? {
            return Err(DomainError::Conflict(
                "Cannot delete a user with an active parking".into(),
            ));
        }

        let vehicles = self.repos.vehicles();
        for vehicle in vehicles.find_all(Some(&user.id)).await? {
            vehicles.delete(&vehicle.id).await?;
        }
        if !self.repos.users().delete(&user.id).await? {
            return Err(DomainError::not_found("User", "id", id));
        }

        metrics::counter!("parking_users_deleted_total").increment(1);
        info!(user_id = %user.id, email = %user.email, "🗑️ User deleted");
        Ok(())
    }

    async fn has_open_session(&self, user: &User) -> DomainResult<bool> {
        let requests = self.repos.parking_requests();
        let own = RequestFilter {
            user_id: Some(user.id.clone()),
            open_only: true,
            ..RequestFilter::default()
        };
        if !requests.find_all(&own).await?.is_empty() {
            return Ok(true);
        }

        for vehicle in self.repos.vehicles().find_all(Some(&user.id)).await? {
            if requests
                .find_open_by_plate(&vehicle.plate_number)
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{ParkingRequest, ParkingSlot, UserRole, Vehicle};
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::clock::SystemClock;

    fn service() -> (Arc<InMemoryRepositoryProvider>, UserService) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let service = UserService::new(repos.clone(), Arc::new(SystemClock));
        (repos, service)
    }

    async fn user(repos: &InMemoryRepositoryProvider, first: &str, last: &str) -> User {
        let email = format!("{}@example.com", first.to_lowercase());
        let user = User::new(first, last, &email, "hash".into(), UserRole::User, Utc::now());
        repos.users().save(user).await.unwrap()
    }

    #[tokio::test]
    async fn list_and_search_by_name() {
        let (repos, service) = service();
        user(&repos, "Grace", "Hopper").await;
        user(&repos, "Ada", "Lovelace").await;
        user(&repos, "Alan", "Turing").await;

        let names: Vec<_> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.last_name)
            .collect();
        assert_eq!(names, vec!["Hopper", "Lovelace", "Turing"]);

        let found = service.search("a").await.unwrap();
        assert_eq!(found.len(), 3);
        let found = service.search("ada love").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(service.search("nobody").await.unwrap().is_empty());
        assert!(matches!(
            service.search("  ").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn profile_update_keeps_omitted_fields() {
        let (repos, service) = service();
        let ada = user(&repos, "Ada", "Lovelace").await;
        user(&repos, "Grace", "Hopper").await;

        let updated = service
            .update_profile(
                &ada.id,
                ProfileUpdate {
                    last_name: Some(" King ".into()),
                    email: Some("Countess@Example.com".into()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "King");
        assert_eq!(updated.email, "countess@example.com");
        assert_eq!(updated.password_hash, "hash");

        let taken = ProfileUpdate {
            email: Some("grace@example.com".into()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            service.update_profile(&ada.id, taken).await,
            Err(DomainError::Conflict(_))
        ));
        let blank = ProfileUpdate {
            first_name: Some(" ".into()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            service.update_profile(&ada.id, blank).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn user_with_open_request_cannot_be_deleted() {
        let (repos, service) = service();
        let ada = user(&repos, "Ada", "Lovelace").await;
        let slot = ParkingSlot::new("A-01", "Lot", "Kigali", 2, 1.0, Utc::now()).unwrap();
        let slot = repos.parking_slots().save(slot).await.unwrap();

        let entry = ParkingRequest::direct_entry("RAA 1", &slot.id, Some(ada.id.clone()), Utc::now());
        let entry = repos.ledger().open(entry).await.unwrap().unwrap();
        assert!(matches!(
            service.delete(&ada.id).await,
            Err(DomainError::Conflict(_))
        ));

        repos.ledger().close(&entry.id, Utc::now(), 1.0).await.unwrap();
        service.delete(&ada.id).await.unwrap();
        assert!(matches!(
            service.get(&ada.id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(repos.parking_requests().find_by_id(&entry.id).await.unwrap().is_some());
        assert!(matches!(
            service.delete(&ada.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn parked_vehicle_blocks_its_owner_deletion() {
        let (repos, service) = service();
        let ada = user(&repos, "Ada", "Lovelace").await;
        let vehicle = repos
            .vehicles()
            .save(Vehicle::new(&ada.id, "RAB 123C", "blue", Utc::now()))
            .await
            .unwrap();
        let slot = ParkingSlot::new("A-01", "Lot", "Kigali", 2, 1.0, Utc::now()).unwrap();
        let slot = repos.parking_slots().save(slot).await.unwrap();

        // entered at the gate by someone else
        let entry = ParkingRequest::direct_entry("RAB 123C", &slot.id, None, Utc::now());
        let entry = repos.ledger().open(entry).await.unwrap().unwrap();
        assert!(matches!(
            service.delete(&ada.id).await,
            Err(DomainError::Conflict(_))
        ));

        repos.ledger().close(&entry.id, Utc::now(), 1.0).await.unwrap();
        service.delete(&ada.id).await.unwrap();
        assert!(repos.vehicles().find_by_id(&vehicle.id).await.unwrap().is_none());
        assert!(repos.vehicles().find_by_plate("RAB 123C").await.unwrap().is_none());
    }
}
