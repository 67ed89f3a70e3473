//! User domain entity

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: String,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Case-insensitive substring match on first, last or full name.
    pub fn name_matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        self.full_name().to_lowercase().contains(&query)
    }
}

/// Name order used by user listings.
pub fn by_name(a: &User, b: &User) -> std::cmp::Ordering {
    a.last_name
        .to_lowercase()
        .cmp(&b.last_name.to_lowercase())
        .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        .then_with(|| a.created_at.cmp(&b.created_at))
}
