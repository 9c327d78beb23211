//! Database repository for user accounts.

use crate::types::{UserId, abbrev_uuid};
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            role: None,
            search: None,
        }
    }

    pub fn with_role(mut self, role: Option<Role>) -> Self {
        self.role = role;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (id, username, email, role, is_admin, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.role)
        .bind(request.is_admin)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR username ILIKE '%' || $2 || '%' OR email ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.role)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                role = COALESCE($3::user_role, role),
                is_active = COALESCE($4, is_active),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.email)
        .bind(&request.role)
        .bind(request.is_active)
        .bind(&request.password_hash)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, username), err)]
    pub async fn get_user_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Record a failed login attempt; when the incremented counter reaches
    /// `max_attempts` the account is locked until `locked_until`.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_failed_login(
        &mut self,
        id: UserId,
        max_attempts: i32,
        locked_until: DateTime<Utc>,
    ) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                failed_login_attempts = failed_login_attempts + 1,
                locked_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .bind(locked_until)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }

    /// Clear the lockout counter and stamp `last_login` after a successful login.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_successful_login(&mut self, id: UserId) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use sqlx::PgPool;

    fn user_create(username: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role,
            is_admin: false,
            password_hash: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_create_and_fetch_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&user_create("testuser", Role::Teacher)).await.unwrap();
        assert_eq!(created.username, "testuser");
        assert_eq!(created.role, Role::Teacher);
        assert_eq!(created.failed_login_attempts, 0);

        let fetched = repo.get_user_by_email("testuser@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_duplicate_email_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&user_create("first", Role::Student)).await.unwrap();

        let mut duplicate = user_create("second", Role::Student);
        duplicate.email = "first@example.com".to_string();
        let err = repo.create(&duplicate).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_lockout_counter(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&user_create("lockme", Role::Teacher)).await.unwrap();
        let until = Utc::now() + chrono::Duration::minutes(30);

        for expected in 1..=4 {
            let updated = repo.record_failed_login(user.id, 5, until).await.unwrap();
            assert_eq!(updated.failed_login_attempts, expected);
            assert!(updated.locked_until.is_none());
        }

        // Fifth failure trips the lock
        let locked = repo.record_failed_login(user.id, 5, until).await.unwrap();
        assert_eq!(locked.failed_login_attempts, 5);
        assert!(locked.is_locked(Utc::now()));

        // Successful login clears everything
        let cleared = repo.record_successful_login(user.id).await.unwrap();
        assert_eq!(cleared.failed_login_attempts, 0);
        assert!(cleared.locked_until.is_none());
        assert!(cleared.last_login.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_list_filters(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&user_create("alice.smith", Role::Teacher)).await.unwrap();
        repo.create(&user_create("bob.jones", Role::Bursar)).await.unwrap();

        let teachers = repo.list(&UserFilter::new(0, 50).with_role(Some(Role::Teacher))).await.unwrap();
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].username, "alice.smith");

        let found = repo
            .list(&UserFilter::new(0, 50).with_search(Some("JONES".to_string())))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "bob.jones");
    }
}
