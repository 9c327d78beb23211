//! Handlers for student, parent and staff records.
//!
//! Student registration and staff onboarding are multi-row writes (inline
//! parent, login account, salary structure) and run inside one transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    api::models::{
        academics::EnrollmentResponse,
        people::{
            ListParentsQuery, ListStaffQuery, ListStudentsQuery, ParentCreate, ParentResponse, ParentUpdate, StaffCreate,
            StaffCreatedResponse, StaffResponse, StaffType, StaffUpdate, StudentCreate, StudentResponse, StudentUpdate,
            TransferRequest,
        },
        users::Role,
    },
    auth::{
        password,
        permissions::{RequiresPermission, operation, resource},
    },
    db::{
        handlers::{
            Enrollments, Parents, Repository, SalaryStructures, Staff, Students, Users,
            people::{ParentFilter, StaffFilter, StudentFilter},
        },
        models::{
            academics::{EnrollmentCreateDBRequest, EnrollmentUpdateDBRequest},
            payroll::SalaryStructureCreateDBRequest,
            people::{ParentCreateDBRequest, ParentUpdateDBRequest, StaffCreateDBRequest, StaffUpdateDBRequest,
                     StudentCreateDBRequest, StudentUpdateDBRequest},
            users::UserCreateDBRequest,
        },
    },
    errors::{Error, Result},
    types::{ParentId, StaffId, StudentId},
};

// ---------------------------------------------------------------------------
// Students

#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    summary = "List students",
    params(ListStudentsQuery),
    responses(
        (status = 200, description = "List of students", body = Vec<StudentResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<ListStudentsQuery>,
    _: RequiresPermission<resource::Students, operation::ReadAll>,
) -> Result<Json<Vec<StudentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Students::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = StudentFilter::new(skip, limit).with_status(query.status).with_search(query.search);

    let students = repo.list(&filter).await?;
    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    summary = "Register student",
    request_body = StudentCreate,
    responses(
        (status = 201, description = "Student registered", body = StudentResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Admission number already in use"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_student(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Students, operation::CreateAll>,
    Json(create): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>)> {
    if create.parent_id.is_some() && create.parent.is_some() {
        return Err(Error::BadRequest {
            message: "Provide either parent_id or an inline parent, not both".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Inline parent is created in the same transaction as the student
    let parent_id = match (&create.parent_id, &create.parent) {
        (Some(parent_id), _) => {
            let mut parents = Parents::new(&mut tx);
            parents.get_by_id(*parent_id).await?.ok_or_else(|| Error::NotFound {
                resource: "Parent".to_string(),
                id: parent_id.to_string(),
            })?;
            Some(*parent_id)
        }
        (None, Some(parent)) => {
            let mut parents = Parents::new(&mut tx);
            let created = parents
                .create(&ParentCreateDBRequest {
                    user_id: None,
                    first_name: parent.first_name.clone(),
                    last_name: parent.last_name.clone(),
                    phone_number: parent.phone_number.clone(),
                    email: parent.email.clone(),
                    address: parent.address.clone(),
                })
                .await?;
            Some(created.id)
        }
        (None, None) => None,
    };

    let student = {
        let mut students = Students::new(&mut tx);
        students
            .create(&StudentCreateDBRequest {
                user_id: None,
                parent_id,
                admission_number: create.admission_number,
                first_name: create.first_name,
                last_name: create.last_name,
                date_of_birth: create.date_of_birth,
                gender: create.gender,
                admission_date: create.admission_date,
                address: create.address,
            })
            .await?
    };

    // Optional enrollment on registration
    if let Some(class_id) = create.class_id {
        let mut enrollments = Enrollments::new(&mut tx);
        enrollments
            .create(&EnrollmentCreateDBRequest {
                student_id: student.id,
                class_id,
                roll_number: None,
            })
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    summary = "Get student",
    responses(
        (status = 200, description = "Student", body = StudentResponse),
        (status = 404, description = "Student not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
    _: RequiresPermission<resource::Students, operation::ReadAll>,
) -> Result<Json<StudentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Students::new(&mut pool_conn);

    let student = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Student".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    patch,
    path = "/students/{id}",
    tag = "students",
    summary = "Update student",
    request_body = StudentUpdate,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 404, description = "Student not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
    _: RequiresPermission<resource::Students, operation::UpdateAll>,
    Json(update): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Students::new(&mut pool_conn);

    let student = repo
        .update(
            id,
            &StudentUpdateDBRequest {
                first_name: update.first_name,
                last_name: update.last_name,
                date_of_birth: update.date_of_birth,
                gender: update.gender,
                status: update.status,
                address: update.address,
                parent_id: update.parent_id,
            },
        )
        .await?;

    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    summary = "Delete student",
    description = "Deletes the student and, by cascade, their enrollments, grades, attendance and invoices. The parent record survives.",
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
    _: RequiresPermission<resource::Students, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Students::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    post,
    path = "/students/{id}/transfer",
    tag = "students",
    summary = "Transfer student to another class",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "New enrollment", body = EnrollmentResponse),
        (status = 400, description = "No active enrollment or already in the class"),
        (status = 404, description = "Student not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn transfer_student(
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
    _: RequiresPermission<resource::Students, operation::UpdateAll>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<EnrollmentResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut students = Students::new(&mut tx);
        students.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Student".to_string(),
            id: id.to_string(),
        })?;
    }

    let mut enrollments = Enrollments::new(&mut tx);
    let active = enrollments
        .get_active_for_student(id)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Student has no active enrollment to transfer from".to_string(),
        })?;

    if active.class_id == request.class_id {
        return Err(Error::BadRequest {
            message: "Student is already enrolled in this class".to_string(),
        });
    }

    // Withdraw from the old class and enroll in the new one atomically
    enrollments
        .update(
            active.id,
            &EnrollmentUpdateDBRequest {
                status: Some(crate::api::models::academics::EnrollmentStatus::Withdrawn),
                roll_number: None,
            },
        )
        .await?;

    let created = enrollments
        .create(&EnrollmentCreateDBRequest {
            student_id: id,
            class_id: request.class_id,
            roll_number: None,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(EnrollmentResponse::from(created)))
}

// ---------------------------------------------------------------------------
// Parents

#[utoipa::path(
    get,
    path = "/parents",
    tag = "parents",
    summary = "List parents",
    params(ListParentsQuery),
    responses(
        (status = 200, description = "List of parents", body = Vec<ParentResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_parents(
    State(state): State<AppState>,
    Query(query): Query<ListParentsQuery>,
    _: RequiresPermission<resource::Parents, operation::ReadAll>,
) -> Result<Json<Vec<ParentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Parents::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = ParentFilter::new(skip, limit).with_search(query.search);

    let parents = repo.list(&filter).await?;
    Ok(Json(parents.into_iter().map(ParentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/parents",
    tag = "parents",
    summary = "Create parent",
    request_body = ParentCreate,
    responses(
        (status = 201, description = "Parent created", body = ParentResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_parent(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Parents, operation::CreateAll>,
    Json(create): Json<ParentCreate>,
) -> Result<(StatusCode, Json<ParentResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Parents::new(&mut pool_conn);

    let parent = repo
        .create(&ParentCreateDBRequest {
            user_id: None,
            first_name: create.first_name,
            last_name: create.last_name,
            phone_number: create.phone_number,
            email: create.email,
            address: create.address,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ParentResponse::from(parent))))
}

#[utoipa::path(
    get,
    path = "/parents/{id}",
    tag = "parents",
    summary = "Get parent",
    responses(
        (status = 200, description = "Parent", body = ParentResponse),
        (status = 404, description = "Parent not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_parent(
    State(state): State<AppState>,
    Path(id): Path<ParentId>,
    _: RequiresPermission<resource::Parents, operation::ReadAll>,
) -> Result<Json<ParentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Parents::new(&mut pool_conn);

    let parent = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Parent".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(ParentResponse::from(parent)))
}

#[utoipa::path(
    patch,
    path = "/parents/{id}",
    tag = "parents",
    summary = "Update parent",
    request_body = ParentUpdate,
    responses(
        (status = 200, description = "Parent updated", body = ParentResponse),
        (status = 404, description = "Parent not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_parent(
    State(state): State<AppState>,
    Path(id): Path<ParentId>,
    _: RequiresPermission<resource::Parents, operation::UpdateAll>,
    Json(update): Json<ParentUpdate>,
) -> Result<Json<ParentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Parents::new(&mut pool_conn);

    let parent = repo
        .update(
            id,
            &ParentUpdateDBRequest {
                first_name: update.first_name,
                last_name: update.last_name,
                phone_number: update.phone_number,
                email: update.email,
                address: update.address,
            },
        )
        .await?;

    Ok(Json(ParentResponse::from(parent)))
}

#[utoipa::path(
    delete,
    path = "/parents/{id}",
    tag = "parents",
    summary = "Delete parent",
    description = "Deletes the parent; linked students keep their records with the parent reference cleared.",
    responses(
        (status = 204, description = "Parent deleted"),
        (status = 404, description = "Parent not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_parent(
    State(state): State<AppState>,
    Path(id): Path<ParentId>,
    _: RequiresPermission<resource::Parents, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Parents::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Parent".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/parents/{id}/children",
    tag = "parents",
    summary = "List a parent's children",
    responses(
        (status = 200, description = "Students linked to the parent", body = Vec<StudentResponse>),
        (status = 404, description = "Parent not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_parent_children(
    State(state): State<AppState>,
    Path(id): Path<ParentId>,
    _: RequiresPermission<resource::Parents, operation::ReadAll>,
) -> Result<Json<Vec<StudentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut parents = Parents::new(&mut pool_conn);
        parents.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Parent".to_string(),
            id: id.to_string(),
        })?;
    }

    let mut students = Students::new(&mut pool_conn);
    let children = students.list_by_parent(id).await?;
    Ok(Json(children.into_iter().map(StudentResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Staff

#[utoipa::path(
    get,
    path = "/staff",
    tag = "staff",
    summary = "List staff",
    params(ListStaffQuery),
    responses(
        (status = 200, description = "List of staff", body = Vec<StaffResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_staff(
    State(state): State<AppState>,
    Query(query): Query<ListStaffQuery>,
    _: RequiresPermission<resource::Staff, operation::ReadAll>,
) -> Result<Json<Vec<StaffResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Staff::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = StaffFilter::new(skip, limit)
        .with_staff_type(query.staff_type)
        .with_search(query.search);

    let staff = repo.list(&filter).await?;
    Ok(Json(staff.into_iter().map(StaffResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/staff",
    tag = "staff",
    summary = "Onboard staff member",
    description = "Creates the login account, the staff profile and an optional initial salary structure in one transaction. Login details are generated from the name when not supplied; a generated password is returned once.",
    request_body = StaffCreate,
    responses(
        (status = 201, description = "Staff member created", body = StaffCreatedResponse),
        (status = 409, description = "Username or email already taken"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_staff(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Staff, operation::CreateAll>,
    Json(create): Json<StaffCreate>,
) -> Result<(StatusCode, Json<StaffCreatedResponse>)> {
    let (raw_password, generated_password) = match &create.password {
        Some(password) => {
            super::auth::validate_password_length(password, &state.config)?;
            (password.clone(), None)
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

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let username = match &create.username {
        Some(username) => username.clone(),
        None => {
            let mut users = Users::new(&mut tx);
            derive_unique_username(&mut users, &create.first_name, &create.last_name).await?
        }
    };
    let email = create
        .email
        .clone()
        .unwrap_or_else(|| format!("{username}@{}", email_domain(&state.config.admin_email)));

    // Teaching staff enter grades and attendance; the rest get the finance role
    let role = match create.staff_type {
        StaffType::Teaching => Role::Teacher,
        StaffType::NonTeaching => Role::Bursar,
    };

    let user = {
        let mut users = Users::new(&mut tx);
        users
            .create(&UserCreateDBRequest {
                username: username.clone(),
                email,
                role,
                is_admin: false,
                password_hash: Some(password_hash),
            })
            .await?
    };

    let staff = {
        let mut staff_repo = Staff::new(&mut tx);
        staff_repo
            .create(&StaffCreateDBRequest {
                user_id: Some(user.id),
                first_name: create.first_name,
                last_name: create.last_name,
                gender: create.gender,
                date_of_birth: create.date_of_birth,
                address: create.address,
                health_info: create.health_info,
                staff_type: create.staff_type,
                specialization: create.specialization,
                employment_date: create.employment_date,
            })
            .await?
    };

    if let Some(salary) = create.salary {
        let mut structures = SalaryStructures::new(&mut tx);
        structures
            .create(&SalaryStructureCreateDBRequest {
                staff_id: staff.id,
                base_salary: salary.base_salary,
                housing_allowance: salary.housing_allowance,
                transport_allowance: salary.transport_allowance,
                other_allowances: salary.other_allowances,
                effective_from: salary
                    .effective_from
                    .or(staff.employment_date)
                    .unwrap_or_else(|| Utc::now().date_naive()),
            })
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(StaffCreatedResponse {
            staff: StaffResponse::from(staff),
            username,
            generated_password,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/staff/{id}",
    tag = "staff",
    summary = "Get staff member",
    responses(
        (status = 200, description = "Staff member", body = StaffResponse),
        (status = 404, description = "Staff member not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_staff(
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    _: RequiresPermission<resource::Staff, operation::ReadAll>,
) -> Result<Json<StaffResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Staff::new(&mut pool_conn);

    let staff = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Staff".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(StaffResponse::from(staff)))
}

#[utoipa::path(
    patch,
    path = "/staff/{id}",
    tag = "staff",
    summary = "Update staff member",
    request_body = StaffUpdate,
    responses(
        (status = 200, description = "Staff member updated", body = StaffResponse),
        (status = 404, description = "Staff member not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    _: RequiresPermission<resource::Staff, operation::UpdateAll>,
    Json(update): Json<StaffUpdate>,
) -> Result<Json<StaffResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Staff::new(&mut pool_conn);

    let staff = repo
        .update(
            id,
            &StaffUpdateDBRequest {
                first_name: update.first_name,
                last_name: update.last_name,
                gender: update.gender,
                date_of_birth: update.date_of_birth,
                address: update.address,
                health_info: update.health_info,
                specialization: update.specialization,
                employment_date: update.employment_date,
            },
        )
        .await?;

    Ok(Json(StaffResponse::from(staff)))
}

#[utoipa::path(
    delete,
    path = "/staff/{id}",
    tag = "staff",
    summary = "Delete staff member",
    description = "Deletes the staff profile; classes and subject assignments that referenced the teacher keep their rows with the reference cleared.",
    responses(
        (status = 204, description = "Staff member deleted"),
        (status = 404, description = "Staff member not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_staff(
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    _: RequiresPermission<resource::Staff, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Staff::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Staff".to_string(),
            id: id.to_string(),
        })
    }
}

/// `first.last`, lowercased and stripped to ascii alphanumerics, with a
/// numeric suffix when the name is already taken.
async fn derive_unique_username(users: &mut Users<'_>, first_name: &str, last_name: &str) -> Result<String> {
    let base: String = format!("{}.{}", first_name.trim().to_lowercase(), last_name.trim().to_lowercase())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();

    if users.get_user_by_username(&base).await?.is_none() {
        return Ok(base);
    }

    for suffix in 2.. {
        let candidate = format!("{base}{suffix}");
        if users.get_user_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    unreachable!("suffix search is unbounded")
}

fn email_domain(admin_email: &str) -> &str {
    admin_email.rsplit('@').next().unwrap_or("school.local")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, seed_school};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_register_student_with_inline_parent(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/students")
            .add_header(name, value)
            .json(&serde_json::json!({
                "admission_number": "ADM-900",
                "first_name": "Tari",
                "last_name": "Briggs",
                "parent": {
                    "first_name": "Boma",
                    "last_name": "Briggs",
                    "phone_number": "0800-000-0000"
                }
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let student: StudentResponse = response.json();
        assert!(student.parent_id.is_some());

        // The inline parent is retrievable and lists the student as its child
        let (name, value) = auth_header(&admin);
        let children = server
            .get(&format!("/api/v1/parents/{}/children", student.parent_id.unwrap()))
            .add_header(name, value)
            .await;
        children.assert_status_ok();
        let children: Vec<StudentResponse> = children.json();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, student.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_staff_onboarding_provisions_login(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/staff")
            .add_header(name, value)
            .json(&serde_json::json!({
                "first_name": "Amina",
                "last_name": "Yusuf",
                "staff_type": "teaching",
                "specialization": "Biology",
                "salary": {
                    "base_salary": "55000",
                    "housing_allowance": "5000"
                }
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["username"], "amina.yusuf");
        let generated = body["generated_password"].as_str().unwrap();
        let staff_id = body["staff"]["id"].as_str().unwrap();

        // The provisioned account logs in with the teacher role
        let login = server
            .post("/authentication/login")
            .json(&serde_json::json!({
                "email": format!("amina.yusuf@{}", email_domain(&crate::test_utils::create_test_config().admin_email)),
                "password": generated
            }))
            .await;
        login.assert_status_ok();
        let login_body: serde_json::Value = login.json();
        assert_eq!(login_body["user"]["role"], "teacher");

        // The salary structure landed in the same transaction
        let mut conn = pool.acquire().await.unwrap();
        let structure = crate::db::handlers::SalaryStructures::new(&mut conn)
            .effective_for_staff(staff_id.parse().unwrap(), chrono::Utc::now().date_naive())
            .await
            .unwrap();
        assert!(structure.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_transfer_withdraws_and_enrolls(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post(&format!("/api/v1/students/{}/transfer", fixture.student_id))
            .add_header(name, value)
            .json(&serde_json::json!({"class_id": fixture.other_class_id}))
            .await;
        response.assert_status_ok();

        let enrollment: EnrollmentResponse = response.json();
        assert_eq!(enrollment.class_id, fixture.other_class_id);

        // The old enrollment is withdrawn, not deleted
        let mut conn = pool.acquire().await.unwrap();
        let old = crate::db::handlers::Enrollments::new(&mut conn)
            .get_by_id(fixture.enrollment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.status, crate::api::models::academics::EnrollmentStatus::Withdrawn);
    }
}
