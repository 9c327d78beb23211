//! Database models for user accounts.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_admin: bool,
    pub password_hash: Option<String>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDBResponse {
    /// Whether the account is currently locked out of login.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(locked_until: Option<DateTime<Utc>>) -> UserDBResponse {
        UserDBResponse {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            role: Role::Teacher,
            is_active: true,
            is_admin: false,
            password_hash: None,
            failed_login_attempts: 0,
            locked_until,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lock_expires() {
        let now = Utc::now();
        assert!(!user(None).is_locked(now));
        assert!(user(Some(now + chrono::Duration::minutes(5))).is_locked(now));
        assert!(!user(Some(now - chrono::Duration::minutes(5))).is_locked(now));
    }
}
