//! Authentication handlers: login with lockout, logout, registration,
//! password change and the current-user endpoint.

use axum::{Json, extract::State};
use chrono::Utc;

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginRequest, LoginResponse, LogoutResponse,
            RegisterRequest, RegisterResponse,
        },
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{password, session},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or locked account"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    if !user.is_active {
        return Err(Error::Unauthenticated {
            message: Some("Account is deactivated".to_string()),
        });
    }

    // Locked accounts are rejected before the password is even looked at
    if user.is_locked(Utc::now()) {
        return Err(Error::Unauthenticated {
            message: Some("Account is locked due to repeated failed logins. Try again later.".to_string()),
        });
    }

    let password_hash = user.password_hash.clone().ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    })?;

    // Verify password on a blocking thread to avoid blocking the async runtime
    let candidate = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        let lockout = &state.config.auth.native.lockout;
        let locked_until = Utc::now() + lockout.lock_duration;
        user_repo
            .record_failed_login(user.id, lockout.max_failed_attempts, locked_until)
            .await?;
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    let user = user_repo.record_successful_login(user.id).await?;
    let user_response = UserResponse::from(user);

    let current_user: CurrentUser = CurrentUser {
        id: user_response.id,
        username: user_response.username.clone(),
        email: user_response.email.clone(),
        role: user_response.role.clone(),
        is_admin: user_response.is_admin,
    };
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user_response,
            token,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear the session cookie)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    let session_config = &state.config.auth.native.session;
    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_secure, session_config.cookie_same_site
    );

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie,
    })
}

/// Register a new student account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or registration disabled"),
        (status = 409, description = "Username or email already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    validate_password_length(&request.password, &state.config)?;

    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Self-registration only ever creates student accounts
    let created = user_repo
        .create(&UserCreateDBRequest {
            username: request.username,
            email: request.email,
            role: Role::Student,
            is_admin: false,
            password_hash: Some(password_hash),
        })
        .await?;

    let user_response = UserResponse::from(created);
    let current_user = CurrentUser {
        id: user_response.id,
        username: user_response.username.clone(),
        email: user_response.email.clone(),
        role: user_response.role.clone(),
        is_admin: user_response.is_admin,
    };
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            user: user_response,
            token,
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

/// Current authenticated user
#[utoipa::path(
    get,
    path = "/authentication/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User no longer exists".to_string()),
    })?;

    Ok(Json(UserResponse::from(user)))
}

/// Change password for the authenticated user
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthSuccessResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    let password_hash = user.password_hash.clone().ok_or_else(|| Error::BadRequest {
        message: "Account has no password set".to_string(),
    })?;

    let current_password = request.current_password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current_password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    validate_password_length(&request.new_password, &state.config)?;

    let new_password = request.new_password.clone();
    let new_password_hash = tokio::task::spawn_blocking(move || password::hash_string(&new_password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    user_repo
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_password_hash),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Validate a candidate password against the configured length rules.
pub(crate) fn validate_password_length(candidate: &str, config: &crate::config::Config) -> Result<(), Error> {
    let password_config = &config.auth.native.password;
    if candidate.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if candidate.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }
    Ok(())
}

/// Session cookie carrying the JWT, capped to the token's own lifetime.
pub(crate) fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let max_age = config.auth.security.jwt_expiry.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config, create_test_user_with_password};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_login_round_trip(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, Role::Teacher, "correct horse battery").await;

        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": user.email, "password": "correct horse battery"}))
            .await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());

        let body: AuthResponse = response.json();
        assert_eq!(body.user.email, user.email);
        assert!(!body.token.is_empty());

        // The issued token authenticates /authentication/me
        let me = server
            .get("/authentication/me")
            .add_header("authorization", format!("Bearer {}", body.token))
            .await;
        me.assert_status_ok();
        let me_body: UserResponse = me.json();
        assert_eq!(me_body.id, body.user.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_login_lockout_after_repeated_failures(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, Role::Teacher, "right-password").await;
        let max_attempts = create_test_config().auth.native.lockout.max_failed_attempts;

        for _ in 0..max_attempts {
            let response = server
                .post("/authentication/login")
                .json(&serde_json::json!({"email": user.email, "password": "wrong-password"}))
                .await;
            response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        }

        // Even the correct password is now rejected before verification
        let locked = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": user.email, "password": "right-password"}))
            .await;
        locked.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = locked.json();
        assert!(body["message"].as_str().unwrap().contains("locked"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_registration_gated_by_config(pool: PgPool) {
        // Default test config disallows self-registration
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/authentication/register")
            .json(&serde_json::json!({
                "username": "newstudent",
                "email": "newstudent@example.com",
                "password": "password123"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_change_password_requires_current(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, Role::Bursar, "old-password").await;

        let login: AuthResponse = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": user.email, "password": "old-password"}))
            .await
            .json();

        let rejected = server
            .post("/authentication/password-change")
            .add_header("authorization", format!("Bearer {}", login.token))
            .json(&serde_json::json!({"current_password": "not-it", "new_password": "new-password-1"}))
            .await;
        rejected.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let accepted = server
            .post("/authentication/password-change")
            .add_header("authorization", format!("Bearer {}", login.token))
            .json(&serde_json::json!({"current_password": "old-password", "new_password": "new-password-1"}))
            .await;
        accepted.assert_status_ok();

        // The new password now logs in
        let relogin = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": user.email, "password": "new-password-1"}))
            .await;
        relogin.assert_status_ok();
    }
}
