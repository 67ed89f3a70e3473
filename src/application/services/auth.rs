//! Registration, login and the bootstrap administrator
//!
//! HTTP handlers are thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, DomainResult, RepositoryProvider, User, UserRole};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password_with_cost, verify_password};
use crate::shared::clock::SharedClock;

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    repos: Arc<dyn RepositoryProvider>,
    jwt_config: JwtConfig,
    clock: SharedClock,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, jwt_config: JwtConfig, clock: SharedClock) -> Self {
        Self {
            repos,
            jwt_config,
            clock,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Lower the hashing cost. Tests only.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Authentication ──────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthResult> {
        let Some(user) = self.repos.users().find_by_email(email).await? else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        let token = create_token(&user.id, &user.email, user.role.as_str(), &self.jwt_config)
            .map_err(|e| DomainError::Validation(format!("Failed to create token: {}", e)))?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new user with the `user` role.
    pub async fn register(&self, registration: Registration) -> DomainResult<User> {
        validate_password_strength(&registration.password)?;
        if !registration.email.contains('@') {
            return Err(DomainError::Validation("Invalid email address".into()));
        }

        let user = self
            .create_user(
                &registration.first_name,
                &registration.last_name,
                &registration.email,
                &registration.password,
                UserRole::User,
            )
            .await?;

        info!(user_id = %user.id, email = %user.email, "New user registered");
        Ok(user)
    }

    pub async fn current_user(&self, user_id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        let mut user = self.current_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash).unwrap_or(false) {
            return Err(DomainError::Validation("Invalid current password".into()));
        }
        validate_password_strength(new_password)?;

        user.password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;
        user.updated_at = self.clock.now();
        self.repos.users().update(&user).await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Create the configured administrator when no user exists yet.
    ///
    /// Returns the created admin, or `None` when users already exist.
    pub async fn ensure_default_admin(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> DomainResult<Option<User>> {
        if self.repos.users().count().await? > 0 {
            return Ok(None);
        }

        info!("Creating default admin user...");
        let admin = self
            .create_user(first_name, last_name, email, password, UserRole::Admin)
            .await?;
        info!("Default admin created: {}", admin.email);
        info!("⚠️  Please change the admin password immediately!");
        Ok(Some(admin))
    }

    async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> DomainResult<User> {
        if self.repos.users().find_by_email(email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".into()));
        }

        let password_hash = hash_password_with_cost(password, self.bcrypt_cost)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        let user = User::new(
            first_name,
            last_name,
            email,
            password_hash,
            role,
            self.clock.now(),
        );
        self.repos.users().save(user).await
    }
}

/// At least 6 characters with an uppercase letter, a digit and a symbol.
pub fn validate_password_strength(password: &str) -> DomainResult<()> {
    let long_enough = password.chars().count() >= 6;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if long_enough && has_upper && has_digit && has_symbol {
        Ok(())
    } else {
        Err(DomainError::Validation(
            "Password must have at least 6 characters, one symbol, one number, and one uppercase letter".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::crypto::jwt::verify_token;
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::clock::SystemClock;

    fn service() -> AuthService {
        let jwt = JwtConfig {
            secret: "test-secret".into(),
            expiration_hours: 1,
            issuer: "parking-service".into(),
        };
        AuthService::new(
            Arc::new(InMemoryRepositoryProvider::new()),
            jwt,
            Arc::new(SystemClock),
        )
        .with_bcrypt_cost(4)
    }

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let service = service();
        let user = service
            .register(registration("Ada@Example.com", "Secret1!"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::User);

        let auth = service.login("ada@example.com", "Secret1!").await.unwrap();
        let claims = verify_token(&auth.token, service.jwt_config()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "user");
        assert_eq!(auth.expires_in, 3600);

        assert!(matches!(
            service.login("ada@example.com", "wrong").await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            service.login("nobody@example.com", "Secret1!").await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_and_weak_password_are_refused() {
        let service = service();
        service
            .register(registration("ada@example.com", "Secret1!"))
            .await
            .unwrap();

        assert!(matches!(
            service.register(registration("ADA@example.com", "Secret1!")).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            service.register(registration("bob@example.com", "password")).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn default_admin_only_on_empty_store() {
        let service = service();
        let admin = service
            .ensure_default_admin("admin@parking.local", "Admin123!", "System", "Admin")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());

        let again = service
            .ensure_default_admin("other@parking.local", "Admin123!", "System", "Admin")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() {
        let service = service();
        let user = service
            .register(registration("ada@example.com", "Secret1!"))
            .await
            .unwrap();

        assert!(matches!(
            service.change_password(&user.id, "wrong", "Better2@").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.change_password(&user.id, "Secret1!", "weak").await,
            Err(DomainError::Validation(_))
        ));
        service
            .change_password(&user.id, "Secret1!", "Better2@")
            .await
            .unwrap();

        assert!(service.login("ada@example.com", "Secret1!").await.is_err());
        service.login("ada@example.com", "Better2@").await.unwrap();
        assert!(matches!(
            service.change_password("missing", "Better2@", "Better3#").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn password_rules() {
        assert!(validate_password_strength("Abc12!").is_ok());
        assert!(validate_password_strength("Ab1!").is_err());
        assert!(validate_password_strength("abc123!").is_err());
        assert!(validate_password_strength("Abcdef!").is_err());
        assert!(validate_password_strength("Abc1234").is_err());
    }
}
