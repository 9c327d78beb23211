//! Handlers for academic structure: years, subjects, classes, enrollments and
//! subject assignments.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::academics::{
        AcademicYearCreate, AcademicYearResponse, AcademicYearUpdate, ClassCreate, ClassDetailResponse, ClassResponse,
        ClassUpdate, EnrollmentCreate, EnrollmentResponse, EnrollmentUpdate, ListClassesQuery, ListEnrollmentsQuery,
        ListSubjectsQuery, SubjectAssignmentCreate, SubjectAssignmentResponse, SubjectAssignmentUpdate, SubjectCreate,
        SubjectResponse, SubjectUpdate,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{
            AcademicYears, Classes, Enrollments, Repository, SubjectAssignments, Subjects,
            academics::{AcademicYearFilter, ClassFilter, EnrollmentFilter, SubjectAssignmentFilter, SubjectFilter},
        },
        models::academics::{
            AcademicYearCreateDBRequest, AcademicYearUpdateDBRequest, ClassCreateDBRequest, ClassUpdateDBRequest,
            EnrollmentCreateDBRequest, EnrollmentUpdateDBRequest, SubjectAssignmentCreateDBRequest, SubjectCreateDBRequest,
            SubjectUpdateDBRequest,
        },
    },
    errors::{Error, Result},
    types::{AcademicYearId, ClassId, EnrollmentId, SubjectAssignmentId, SubjectId},
};

// ---------------------------------------------------------------------------
// Academic years

#[utoipa::path(
    get,
    path = "/academic-years",
    tag = "academics",
    summary = "List academic years",
    responses(
        (status = 200, description = "List of academic years", body = Vec<AcademicYearResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_academic_years(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<Vec<AcademicYearResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AcademicYears::new(&mut pool_conn);

    let years = repo.list(&AcademicYearFilter::new(0, 100)).await?;
    Ok(Json(years.into_iter().map(AcademicYearResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/academic-years",
    tag = "academics",
    summary = "Create academic year",
    request_body = AcademicYearCreate,
    responses(
        (status = 201, description = "Academic year created", body = AcademicYearResponse),
        (status = 400, description = "Invalid dates"),
        (status = 409, description = "Year name already exists"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_academic_year(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::CreateAll>,
    Json(create): Json<AcademicYearCreate>,
) -> Result<(StatusCode, Json<AcademicYearResponse>)> {
    if create.start_date >= create.end_date {
        return Err(Error::BadRequest {
            message: "start_date must be before end_date".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AcademicYears::new(&mut pool_conn);

    let year = repo
        .create(&AcademicYearCreateDBRequest {
            year_name: create.year_name,
            start_date: create.start_date,
            end_date: create.end_date,
            is_current: create.is_current,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AcademicYearResponse::from(year))))
}

#[utoipa::path(
    get,
    path = "/academic-years/{id}",
    tag = "academics",
    summary = "Get academic year",
    responses(
        (status = 200, description = "Academic year", body = AcademicYearResponse),
        (status = 404, description = "Academic year not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_academic_year(
    State(state): State<AppState>,
    Path(id): Path<AcademicYearId>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<AcademicYearResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AcademicYears::new(&mut pool_conn);

    let year = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "AcademicYear".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(AcademicYearResponse::from(year)))
}

#[utoipa::path(
    patch,
    path = "/academic-years/{id}",
    tag = "academics",
    summary = "Update academic year",
    request_body = AcademicYearUpdate,
    responses(
        (status = 200, description = "Academic year updated", body = AcademicYearResponse),
        (status = 404, description = "Academic year not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_academic_year(
    State(state): State<AppState>,
    Path(id): Path<AcademicYearId>,
    _: RequiresPermission<resource::Academic, operation::UpdateAll>,
    Json(update): Json<AcademicYearUpdate>,
) -> Result<Json<AcademicYearResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AcademicYears::new(&mut pool_conn);

    let year = repo
        .update(
            id,
            &AcademicYearUpdateDBRequest {
                year_name: update.year_name,
                start_date: update.start_date,
                end_date: update.end_date,
                is_current: update.is_current,
            },
        )
        .await?;

    Ok(Json(AcademicYearResponse::from(year)))
}

#[utoipa::path(
    delete,
    path = "/academic-years/{id}",
    tag = "academics",
    summary = "Delete academic year",
    responses(
        (status = 204, description = "Academic year deleted"),
        (status = 404, description = "Academic year not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_academic_year(
    State(state): State<AppState>,
    Path(id): Path<AcademicYearId>,
    _: RequiresPermission<resource::Academic, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AcademicYears::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "AcademicYear".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Subjects

#[utoipa::path(
    get,
    path = "/subjects",
    tag = "academics",
    summary = "List subjects",
    params(ListSubjectsQuery),
    responses(
        (status = 200, description = "List of subjects", body = Vec<SubjectResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_subjects(
    State(state): State<AppState>,
    Query(query): Query<ListSubjectsQuery>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<Vec<SubjectResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subjects::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let subjects = repo.list(&SubjectFilter::new(skip, limit).with_search(query.search)).await?;
    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/subjects",
    tag = "academics",
    summary = "Create subject",
    request_body = SubjectCreate,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 409, description = "Subject code already exists"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_subject(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::CreateAll>,
    Json(create): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subjects::new(&mut pool_conn);

    let subject = repo
        .create(&SubjectCreateDBRequest {
            subject_name: create.subject_name,
            subject_code: create.subject_code,
            grade_level: create.grade_level,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SubjectResponse::from(subject))))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}",
    tag = "academics",
    summary = "Get subject",
    responses(
        (status = 200, description = "Subject", body = SubjectResponse),
        (status = 404, description = "Subject not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<SubjectResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subjects::new(&mut pool_conn);

    let subject = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Subject".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(SubjectResponse::from(subject)))
}

#[utoipa::path(
    patch,
    path = "/subjects/{id}",
    tag = "academics",
    summary = "Update subject",
    request_body = SubjectUpdate,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 404, description = "Subject not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
    _: RequiresPermission<resource::Academic, operation::UpdateAll>,
    Json(update): Json<SubjectUpdate>,
) -> Result<Json<SubjectResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subjects::new(&mut pool_conn);

    let subject = repo
        .update(
            id,
            &SubjectUpdateDBRequest {
                subject_name: update.subject_name,
                grade_level: update.grade_level,
            },
        )
        .await?;

    Ok(Json(SubjectResponse::from(subject)))
}

#[utoipa::path(
    delete,
    path = "/subjects/{id}",
    tag = "academics",
    summary = "Delete subject",
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
    _: RequiresPermission<resource::Academic, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subjects::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Subject".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Classes

#[utoipa::path(
    get,
    path = "/classes",
    tag = "academics",
    summary = "List classes",
    params(ListClassesQuery),
    responses(
        (status = 200, description = "List of classes", body = Vec<ClassResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_classes(
    State(state): State<AppState>,
    Query(query): Query<ListClassesQuery>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<Vec<ClassResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Classes::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = ClassFilter::new(skip, limit)
        .with_academic_year(query.academic_year_id)
        .with_search(query.search);

    let classes = repo.list(&filter).await?;
    Ok(Json(classes.into_iter().map(ClassResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/classes",
    tag = "academics",
    summary = "Create class",
    request_body = ClassCreate,
    responses(
        (status = 201, description = "Class created", body = ClassResponse),
        (status = 400, description = "Invalid references"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_class(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::CreateAll>,
    Json(create): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Classes::new(&mut pool_conn);

    let class = repo
        .create(&ClassCreateDBRequest {
            class_name: create.class_name,
            academic_year_id: create.academic_year_id,
            class_teacher_id: create.class_teacher_id,
            capacity: create.capacity.unwrap_or(40),
            room_number: create.room_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ClassResponse::from(class))))
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    tag = "academics",
    summary = "Get class with enrollments and subject assignments",
    responses(
        (status = 200, description = "Class detail", body = ClassDetailResponse),
        (status = 404, description = "Class not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<ClassDetailResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let class = {
        let mut repo = Classes::new(&mut tx);
        repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Class".to_string(),
            id: id.to_string(),
        })?
    };

    let enrollments = {
        let mut repo = Enrollments::new(&mut tx);
        repo.list(&EnrollmentFilter::new(0, 1000).with_class(Some(id))).await?
    };

    let assignments = {
        let mut repo = SubjectAssignments::new(&mut tx);
        repo.list(&SubjectAssignmentFilter::new(0, 1000).with_class(Some(id))).await?
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ClassDetailResponse {
        class: ClassResponse::from(class),
        enrollments: enrollments.into_iter().map(EnrollmentResponse::from).collect(),
        subject_assignments: assignments.into_iter().map(SubjectAssignmentResponse::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/classes/{id}",
    tag = "academics",
    summary = "Update class",
    request_body = ClassUpdate,
    responses(
        (status = 200, description = "Class updated", body = ClassResponse),
        (status = 404, description = "Class not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
    _: RequiresPermission<resource::Academic, operation::UpdateAll>,
    Json(update): Json<ClassUpdate>,
) -> Result<Json<ClassResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Classes::new(&mut pool_conn);

    let class = repo
        .update(
            id,
            &ClassUpdateDBRequest {
                class_name: update.class_name,
                class_teacher_id: update.class_teacher_id,
                capacity: update.capacity,
                room_number: update.room_number,
            },
        )
        .await?;

    Ok(Json(ClassResponse::from(class)))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    tag = "academics",
    summary = "Delete class",
    responses(
        (status = 204, description = "Class deleted"),
        (status = 404, description = "Class not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
    _: RequiresPermission<resource::Academic, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Classes::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Class".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Enrollments

#[utoipa::path(
    get,
    path = "/enrollments",
    tag = "academics",
    summary = "List enrollments",
    params(ListEnrollmentsQuery),
    responses(
        (status = 200, description = "List of enrollments", body = Vec<EnrollmentResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(query): Query<ListEnrollmentsQuery>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<Vec<EnrollmentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enrollments::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = EnrollmentFilter::new(skip, limit)
        .with_student(query.student_id)
        .with_class(query.class_id)
        .with_status(query.status);

    let enrollments = repo.list(&filter).await?;
    Ok(Json(enrollments.into_iter().map(EnrollmentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/enrollments",
    tag = "academics",
    summary = "Enroll student in class",
    request_body = EnrollmentCreate,
    responses(
        (status = 201, description = "Enrollment created", body = EnrollmentResponse),
        (status = 409, description = "Student already enrolled in this class"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_enrollment(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::CreateAll>,
    Json(create): Json<EnrollmentCreate>,
) -> Result<(StatusCode, Json<EnrollmentResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enrollments::new(&mut pool_conn);

    // The (student, class) unique constraint turns duplicates into a 409
    let enrollment = repo
        .create(&EnrollmentCreateDBRequest {
            student_id: create.student_id,
            class_id: create.class_id,
            roll_number: create.roll_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(enrollment))))
}

#[utoipa::path(
    get,
    path = "/enrollments/{id}",
    tag = "academics",
    summary = "Get enrollment",
    responses(
        (status = 200, description = "Enrollment", body = EnrollmentResponse),
        (status = 404, description = "Enrollment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<EnrollmentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enrollments::new(&mut pool_conn);

    let enrollment = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Enrollment".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(EnrollmentResponse::from(enrollment)))
}

#[utoipa::path(
    patch,
    path = "/enrollments/{id}",
    tag = "academics",
    summary = "Update enrollment",
    request_body = EnrollmentUpdate,
    responses(
        (status = 200, description = "Enrollment updated", body = EnrollmentResponse),
        (status = 404, description = "Enrollment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_enrollment(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
    _: RequiresPermission<resource::Academic, operation::UpdateAll>,
    Json(update): Json<EnrollmentUpdate>,
) -> Result<Json<EnrollmentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enrollments::new(&mut pool_conn);

    let enrollment = repo
        .update(
            id,
            &EnrollmentUpdateDBRequest {
                status: update.status,
                roll_number: update.roll_number,
            },
        )
        .await?;

    Ok(Json(EnrollmentResponse::from(enrollment)))
}

#[utoipa::path(
    delete,
    path = "/enrollments/{id}",
    tag = "academics",
    summary = "Delete enrollment",
    responses(
        (status = 204, description = "Enrollment deleted"),
        (status = 404, description = "Enrollment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
    _: RequiresPermission<resource::Academic, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enrollments::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Enrollment".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Subject assignments

#[utoipa::path(
    get,
    path = "/subject-assignments",
    tag = "academics",
    summary = "List subject assignments",
    responses(
        (status = 200, description = "List of subject assignments", body = Vec<SubjectAssignmentResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_subject_assignments(
    State(state): State<AppState>,
    Query(query): Query<crate::api::models::pagination::Pagination>,
    _: RequiresPermission<resource::Academic, operation::ReadAll>,
) -> Result<Json<Vec<SubjectAssignmentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SubjectAssignments::new(&mut pool_conn);

    let (skip, limit) = query.params();
    let assignments = repo.list(&SubjectAssignmentFilter::new(skip, limit)).await?;
    Ok(Json(assignments.into_iter().map(SubjectAssignmentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/subject-assignments",
    tag = "academics",
    summary = "Assign subject to class",
    request_body = SubjectAssignmentCreate,
    responses(
        (status = 201, description = "Subject assigned", body = SubjectAssignmentResponse),
        (status = 409, description = "Subject already assigned to this class"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_subject_assignment(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Academic, operation::CreateAll>,
    Json(create): Json<SubjectAssignmentCreate>,
) -> Result<(StatusCode, Json<SubjectAssignmentResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SubjectAssignments::new(&mut pool_conn);

    let assignment = repo
        .create(&SubjectAssignmentCreateDBRequest {
            class_id: create.class_id,
            subject_id: create.subject_id,
            teacher_id: create.teacher_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SubjectAssignmentResponse::from(assignment))))
}

#[utoipa::path(
    patch,
    path = "/subject-assignments/{id}",
    tag = "academics",
    summary = "Reassign teacher",
    request_body = SubjectAssignmentUpdate,
    responses(
        (status = 200, description = "Assignment updated", body = SubjectAssignmentResponse),
        (status = 404, description = "Assignment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_subject_assignment(
    State(state): State<AppState>,
    Path(id): Path<SubjectAssignmentId>,
    _: RequiresPermission<resource::Academic, operation::UpdateAll>,
    Json(update): Json<SubjectAssignmentUpdate>,
) -> Result<Json<SubjectAssignmentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SubjectAssignments::new(&mut pool_conn);

    let assignment = repo.set_teacher(id, update.teacher_id).await?;
    Ok(Json(SubjectAssignmentResponse::from(assignment)))
}

#[utoipa::path(
    delete,
    path = "/subject-assignments/{id}",
    tag = "academics",
    summary = "Remove subject assignment",
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 404, description = "Assignment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_subject_assignment(
    State(state): State<AppState>,
    Path(id): Path<SubjectAssignmentId>,
    _: RequiresPermission<resource::Academic, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SubjectAssignments::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "SubjectAssignment".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, seed_school};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_duplicate_enrollment_conflicts(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // The fixture already enrolled the student in the class
        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/enrollments")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "class_id": fixture.class_id
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);

        let body: serde_json::Value = response.json();
        assert!(body["message"].as_str().unwrap().contains("already enrolled"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_class_detail_resolves_relationships(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .get(&format!("/api/v1/classes/{}", fixture.class_id))
            .add_header(name, value)
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        // Both fixture students are enrolled in the class
        assert_eq!(body["enrollments"].as_array().unwrap().len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_enrollment_fk_validation(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // Unknown student id fails referential integrity, surfaced as 400
        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/enrollments")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": uuid::Uuid::new_v4(),
                "class_id": fixture.class_id
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
