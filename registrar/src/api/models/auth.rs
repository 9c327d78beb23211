//! API request/response models for authentication.
//!
//! Login and registration responses carry a Set-Cookie header alongside the
//! JSON body, so they have dedicated response types implementing
//! [`IntoResponse`] instead of plain `Json<T>`.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::UserResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body shared by login and registration responses. The token is also set as
/// an HttpOnly cookie for browser clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Login body plus the session cookie.
#[derive(Debug)]
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        ([(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}

/// Registration body plus the session cookie; created status.
#[derive(Debug)]
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::CREATED,
            [(header::SET_COOKIE, self.cookie)],
            Json(self.auth_response),
        )
            .into_response()
    }
}

/// Logout body plus the expired cookie that clears the session.
#[derive(Debug)]
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        ([(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}
