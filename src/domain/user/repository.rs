//! User repository interface

use async_trait::async_trait;

use super::model::User;
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. `Conflict` when the e-mail is already registered.
    async fn save(&self, user: User) -> DomainResult<User>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// All users, ordered by last then first name.
    async fn find_all(&self) -> DomainResult<Vec<User>>;

    /// Users whose first name, last name or full name contains `query`,
    /// ignoring case. Same order as [`UserRepository::find_all`].
    async fn search_by_name(&self, query: &str) -> DomainResult<Vec<User>>;

    /// Overwrite names, e-mail and password hash. `Conflict` when the new
    /// e-mail belongs to another user, `NotFound` when the user is gone.
    async fn update(&self, user: &User) -> DomainResult<()>;

    async fn delete(&self, id: &str) -> DomainResult<bool>;

    async fn count(&self) -> DomainResult<u64>;
}
