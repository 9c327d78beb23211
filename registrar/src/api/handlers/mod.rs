//! HTTP request handlers, one module per resource family.
//!
//! Each handler validates the request, checks the caller's permission through
//! [`crate::auth::permissions::RequiresPermission`], runs the database work
//! through the repositories and serializes the response. Errors surface as
//! [`crate::errors::Error`], which maps to status codes and structured JSON
//! at the boundary.

use sqlx::PgConnection;

use crate::{
    api::models::users::CurrentUser,
    auth::permissions::has_permission,
    db::handlers::{Parents, Students},
    errors::{Error, Result},
    types::{Operation, Permission, Resource, StudentId},
};

pub mod academics;
pub mod attendance;
pub mod auth;
pub mod finance;
pub mod grades;
pub mod payroll;
pub mod people;
pub mod timetable;
pub mod users;

fn read_denied(resource: Resource) -> Error {
    Error::InsufficientPermissions {
        required: Permission::Any(vec![
            Permission::Allow(resource, Operation::ReadAll),
            Permission::Allow(resource, Operation::ReadOwn),
        ]),
        action: Operation::ReadOwn,
        resource: format!("{resource:?}"),
    }
}

/// Reject callers that hold neither the All nor the Own read permission
/// before any data is touched.
pub(crate) fn ensure_some_read_access(user: &CurrentUser, resource: Resource) -> Result<()> {
    if has_permission(user, resource, Operation::ReadAll) || has_permission(user, resource, Operation::ReadOwn) {
        Ok(())
    } else {
        Err(read_denied(resource))
    }
}

/// Gate for endpoints that serve both staff and self-scoped callers.
///
/// ReadAll passes outright. ReadOwn passes only when the requested student is
/// the caller's own linked record, or one of their children when the caller
/// is the linked parent.
pub(crate) async fn ensure_can_read_student(
    user: &CurrentUser,
    resource: Resource,
    student_id: StudentId,
    conn: &mut PgConnection,
) -> Result<()> {
    if has_permission(user, resource, Operation::ReadAll) {
        return Ok(());
    }

    let denied = read_denied(resource);

    if !has_permission(user, resource, Operation::ReadOwn) {
        return Err(denied);
    }

    let student = {
        let mut students = Students::new(&mut *conn);
        students.get_by_id(student_id).await?
    };
    let Some(student) = student else {
        // Hide existence from callers without read-all access
        return Err(denied);
    };

    if student.user_id == Some(user.id) {
        return Ok(());
    }

    if let Some(parent_id) = student.parent_id {
        let parent = {
            let mut parents = Parents::new(&mut *conn);
            parents.get_by_id(parent_id).await?
        };
        if parent.is_some_and(|p| p.user_id == Some(user.id)) {
            return Ok(());
        }
    }

    Err(denied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_user, link_student_to_user, seed_school};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_students_read_only_their_own_records(pool: PgPool) {
        let fixture = seed_school(&pool).await;
        let student_user = create_test_user(&pool, Role::Student).await;
        link_student_to_user(&pool, fixture.student_id, student_user.id).await;

        let mut conn = pool.acquire().await.unwrap();

        // Own record passes
        ensure_can_read_student(&student_user, Resource::Grades, fixture.student_id, &mut conn)
            .await
            .unwrap();

        // Another student's record does not
        let err = ensure_can_read_student(&student_user, Resource::Grades, fixture.other_student_id, &mut conn)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_teachers_read_any_student(pool: PgPool) {
        let fixture = seed_school(&pool).await;
        let teacher = create_test_user(&pool, Role::Teacher).await;

        let mut conn = pool.acquire().await.unwrap();
        ensure_can_read_student(&teacher, Resource::Attendance, fixture.student_id, &mut conn)
            .await
            .unwrap();
    }
}
