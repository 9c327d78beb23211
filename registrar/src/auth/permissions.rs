//! Role-based permission checking.
//!
//! Authorization is a fixed lookup table from [`Role`] to the set of
//! [`Resource`]/[`Operation`] pairs that role may perform, rather than
//! conditional checks scattered through handlers. Admin accounts bypass the
//! table entirely.
//!
//! Handlers declare their requirement through the [`RequiresPermission`]
//! extractor:
//!
//! ```ignore
//! async fn list_students(
//!     State(state): State<AppState>,
//!     _: RequiresPermission<resource::Students, operation::ReadAll>,
//! ) -> Result<Json<Vec<StudentResponse>>> { ... }
//! ```
//!
//! Endpoints that serve both privileged and self-scoped callers (a student
//! reading their own grades) extract [`CurrentUser`] directly and combine
//! [`has_permission`] checks for the All and Own variants.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};

/// Permission set for each non-admin role.
///
/// Admin (and any account with `is_admin`) is not listed: it passes every
/// check. Own-scoped entries still require the handler to resolve ownership.
fn role_permissions(role: &Role) -> &'static [(Resource, Operation)] {
    use Operation::*;
    use Resource::*;

    match role {
        Role::Admin => &[],
        Role::Bursar => &[
            (Students, ReadAll),
            (Parents, ReadAll),
            (Staff, ReadAll),
            (Academic, ReadAll),
            (Finance, CreateAll),
            (Finance, ReadAll),
            (Finance, UpdateAll),
            (Finance, DeleteAll),
            (Expenditures, CreateAll),
            (Expenditures, ReadAll),
            (Expenditures, UpdateAll),
            (Expenditures, DeleteAll),
            (Payroll, CreateAll),
            (Payroll, ReadAll),
            (Payroll, UpdateAll),
            (Payroll, DeleteAll),
        ],
        Role::Teacher => &[
            (Students, ReadAll),
            (Parents, ReadAll),
            (Academic, ReadAll),
            (Attendance, CreateAll),
            (Attendance, ReadAll),
            (Attendance, UpdateAll),
            (Grades, CreateAll),
            (Grades, ReadAll),
            (Grades, UpdateAll),
            (Timetable, ReadAll),
        ],
        Role::Student => &[
            (Academic, ReadAll),
            (Timetable, ReadAll),
            (Grades, ReadOwn),
            (Attendance, ReadOwn),
            (Finance, ReadOwn),
        ],
        Role::Parent => &[
            (Timetable, ReadAll),
            (Grades, ReadOwn),
            (Attendance, ReadOwn),
            (Finance, ReadOwn),
        ],
    }
}

/// Check whether a user may perform `operation` on `resource`.
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    if user.is_admin || user.role == Role::Admin {
        return true;
    }
    role_permissions(&user.role).contains(&(resource, operation))
}

/// Marker types for resources, used as type parameters of [`RequiresPermission`].
pub mod resource {
    use crate::types::Resource;

    pub trait ResourceType {
        const RESOURCE: Resource;
    }

    macro_rules! resource_marker {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;
                impl ResourceType for $name {
                    const RESOURCE: Resource = Resource::$name;
                }
            )*
        };
    }

    resource_marker!(
        Users,
        Students,
        Parents,
        Staff,
        Academic,
        Attendance,
        Grades,
        Finance,
        Expenditures,
        Payroll,
        Timetable,
    );
}

/// Marker types for operations, used as type parameters of [`RequiresPermission`].
pub mod operation {
    use crate::types::Operation;

    pub trait OperationType {
        const OPERATION: Operation;
    }

    macro_rules! operation_marker {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;
                impl OperationType for $name {
                    const OPERATION: Operation = Operation::$name;
                }
            )*
        };
    }

    operation_marker!(CreateAll, ReadAll, ReadOwn, UpdateAll, DeleteAll);
}

/// Extractor that authenticates the caller and requires a specific permission.
///
/// Dereferences to the authenticated [`CurrentUser`] so handlers can still
/// read the caller's identity.
pub struct RequiresPermission<R, O> {
    pub user: CurrentUser,
    _marker: PhantomData<fn() -> (R, O)>,
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: resource::ResourceType,
    O: operation::OperationType,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !has_permission(&user, R::RESOURCE, O::OPERATION) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: format!("{:?}", R::RESOURCE),
            });
        }

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            role,
            is_admin: false,
        }
    }

    #[test]
    fn admin_bypasses_the_map() {
        let mut user = user_with_role(Role::Student);
        user.is_admin = true;
        assert!(has_permission(&user, Resource::Payroll, Operation::DeleteAll));

        let role_admin = user_with_role(Role::Admin);
        assert!(has_permission(&role_admin, Resource::Users, Operation::CreateAll));
    }

    #[test]
    fn teacher_can_enter_grades_but_not_process_payroll() {
        let teacher = user_with_role(Role::Teacher);
        assert!(has_permission(&teacher, Resource::Grades, Operation::CreateAll));
        assert!(has_permission(&teacher, Resource::Attendance, Operation::UpdateAll));
        assert!(!has_permission(&teacher, Resource::Payroll, Operation::CreateAll));
        assert!(!has_permission(&teacher, Resource::Users, Operation::ReadAll));
    }

    #[test]
    fn bursar_owns_money_surfaces_only() {
        let bursar = user_with_role(Role::Bursar);
        assert!(has_permission(&bursar, Resource::Finance, Operation::CreateAll));
        assert!(has_permission(&bursar, Resource::Expenditures, Operation::DeleteAll));
        assert!(!has_permission(&bursar, Resource::Grades, Operation::CreateAll));
    }

    #[test]
    fn students_read_their_own_records_only() {
        let student = user_with_role(Role::Student);
        assert!(has_permission(&student, Resource::Grades, Operation::ReadOwn));
        assert!(!has_permission(&student, Resource::Grades, Operation::ReadAll));
        assert!(!has_permission(&student, Resource::Attendance, Operation::CreateAll));
    }
}
