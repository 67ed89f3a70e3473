//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use super::{db_err, is_unique_violation};
use crate::domain::user::{by_name, User, UserRepository, UserRole};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::User => UserRole::User,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::User => user::UserRole::User,
    }
}

fn duplicate_email(e: DbErr) -> DomainError {
    if is_unique_violation(&e) {
        DomainError::Conflict("Email already registered".into())
    } else {
        db_err(e)
    }
}

/// `%query%` for LIKE with `!` as the escape character.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::from("%");
    for c in query.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '!') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn sorted(models: Vec<user::Model>) -> Vec<User> {
    let mut users: Vec<User> = models.into_iter().map(model_to_domain).collect();
    users.sort_by(by_name);
    users
}

fn model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn save(&self, u: User) -> DomainResult<User> {
        let model = user::ActiveModel {
            id: Set(u.id),
            first_name: Set(u.first_name),
            last_name: Set(u.last_name),
            email: Set(u.email),
            password_hash: Set(u.password_hash),
            role: Set(domain_role_to_entity(u.role)),
            created_at: Set(u.created_at),
            updated_at: Set(u.updated_at),
        };

        let inserted = model.insert(&self.db).await.map_err(duplicate_email)?;
        Ok(model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find().all(&self.db).await.map_err(db_err)?;
        Ok(sorted(models))
    }

    async fn search_by_name(&self, query: &str) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .filter(Expr::cust_with_values(
                "lower(first_name || ' ' || last_name) LIKE ? ESCAPE '!'",
                [contains_pattern(query)],
            ))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        debug!("search_by_name({:?}): {} match(es)", query, models.len());
        Ok(sorted(models))
    }

    async fn update(&self, u: &User) -> DomainResult<()> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::FirstName, Expr::value(u.first_name.clone()))
            .col_expr(user::Column::LastName, Expr::value(u.last_name.clone()))
            .col_expr(user::Column::Email, Expr::value(u.email.clone()))
            .col_expr(user::Column::PasswordHash, Expr::value(u.password_hash.clone()))
            .col_expr(user::Column::UpdatedAt, Expr::value(u.updated_at))
            .filter(user::Column::Id.eq(u.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(duplicate_email)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("User", "id", u.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let result = user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn count(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }
}
