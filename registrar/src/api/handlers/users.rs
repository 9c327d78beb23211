//! User account management handlers (admin surface).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::users::{ListUsersQuery, ProvisionedUserResponse, UserCreate, UserResponse, UserUpdate},
    auth::{
        password,
        permissions::{RequiresPermission, operation, resource},
    },
    db::{
        handlers::{Repository, Users, users::UserFilter},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    types::UserId,
};

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<Vec<UserResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = UserFilter::new(skip, limit).with_role(query.role).with_search(query.search);

    let users = repo.list(&filter).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = ProvisionedUserResponse),
        (status = 409, description = "Username or email already taken"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Users, operation::CreateAll>,
    Json(create): Json<UserCreate>,
) -> Result<(StatusCode, Json<ProvisionedUserResponse>)> {
    // Use the supplied password or provision a temporary one returned once
    let (raw_password, generated_password) = match create.password {
        Some(password) => {
            super::auth::validate_password_length(&password, &state.config)?;
            (password, None)
        }
        None => {
            let generated = password::generate_temporary_password();
            (generated.clone(), Some(generated))
        }
    };

    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&raw_password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let user = repo
        .create(&UserCreateDBRequest {
            username: create.username,
            email: create.email,
            role: create.role,
            is_admin: false,
            password_hash: Some(password_hash),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProvisionedUserResponse {
            user: UserResponse::from(user),
            generated_password,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get user",
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<UserResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let user = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    // An admin cannot lock themselves out by deactivating their own account
    if id == current_user.id && update.is_active == Some(false) {
        return Err(Error::BadRequest {
            message: "You cannot deactivate your own account".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let user = repo
        .update(
            id,
            &UserUpdateDBRequest {
                email: update.email,
                role: update.role,
                is_active: update.is_active,
                password_hash: None,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    summary = "Delete user",
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: RequiresPermission<resource::Users, operation::DeleteAll>,
) -> Result<StatusCode> {
    if id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_user};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_user_crud_requires_admin(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let teacher = create_test_user(&pool, Role::Teacher).await;

        // A teacher cannot list users
        let (name, value) = auth_header(&teacher);
        let forbidden = server.get("/api/v1/users").add_header(name, value).await;
        forbidden.assert_status(axum::http::StatusCode::FORBIDDEN);

        // The admin can, and sees both accounts
        let (name, value) = auth_header(&admin);
        let listed = server.get("/api/v1/users").add_header(name, value).await;
        listed.assert_status_ok();
        let users: Vec<UserResponse> = listed.json();
        assert!(users.len() >= 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_create_user_generates_password_once(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/users")
            .add_header(name, value)
            .json(&serde_json::json!({
                "username": "bursar.new",
                "email": "bursar.new@example.com",
                "role": "bursar"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["role"], "bursar");
        let generated = body["generated_password"].as_str().unwrap();

        // The generated password works for login
        let login = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "bursar.new@example.com", "password": generated}))
            .await;
        login.assert_status_ok();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_self_deletion_guard(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .delete(&format!("/api/v1/users/{}", admin.id))
            .add_header(name, value)
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&admin);
        let response = server
            .patch(&format!("/api/v1/users/{}", admin.id))
            .add_header(name, value)
            .json(&serde_json::json!({"is_active": false}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
