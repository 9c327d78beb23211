//! API request/response models for user accounts.

use super::pagination::Pagination;
use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Role tag carried on every account, keyed into the permission map.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Bursar,
    Teacher,
    Student,
    Parent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Initial password; when omitted a temporary one is generated and
    /// returned once in the response.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned once from account-provisioning endpoints when the password was
/// generated server-side. The hash is all that is stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProvisionedUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by role
    pub role: Option<Role>,

    /// Case-insensitive substring match over username and email
    pub search: Option<String>,
}

/// The authenticated caller, as carried in the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            role: db.role,
            is_active: db.is_active,
            is_admin: db.is_admin,
            last_login: db.last_login,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            role: db.role,
            is_admin: db.is_admin,
        }
    }
}
