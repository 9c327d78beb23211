//! Handlers for marks entry and the grading reports.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::grades::{
        BulkGradeError, BulkGradesReport, BulkGradesRequest, ClassReportExtreme, ClassReportQuery, ClassReportResponse,
        GradeCreate, GradeDistribution, GradeResponse, GradeUpdate, ListGradesQuery, StudentReportQuery,
        StudentReportResponse, SubjectStatisticsQuery, SubjectStatisticsResponse,
    },
    api::models::users::CurrentUser,
    auth::permissions::{RequiresPermission, has_permission, operation, resource},
    db::{
        handlers::{
            Grades, Repository,
            grades::GradeFilter,
        },
        models::grades::{GradeCreateDBRequest, GradeUpdateDBRequest, letter_grade, percentage},
    },
    errors::{Error, Result},
    types::{GradeId, Operation, Resource, UserId},
};

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

fn to_db_create(create: &GradeCreate, entered_by: UserId) -> GradeCreateDBRequest {
    GradeCreateDBRequest {
        student_id: create.student_id,
        subject_id: create.subject_id,
        enrollment_id: create.enrollment_id,
        marks: create.marks,
        max_marks: create.max_marks.unwrap_or(Decimal::ONE_HUNDRED),
        grade_type: create.grade_type,
        exam_date: create.exam_date,
        term: create.term,
        remarks: create.remarks.clone(),
        entered_by: Some(entered_by),
    }
}

#[utoipa::path(
    get,
    path = "/grades",
    tag = "grades",
    summary = "List grades",
    params(ListGradesQuery),
    responses(
        (status = 200, description = "List of grades", body = Vec<GradeResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_grades(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListGradesQuery>,
) -> Result<Json<Vec<GradeResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Own-scoped callers must name one of their own students
    super::ensure_some_read_access(&current_user, Resource::Grades)?;
    if !has_permission(&current_user, Resource::Grades, Operation::ReadAll) {
        let Some(student_id) = query.student_id else {
            return Err(Error::BadRequest {
                message: "student_id is required when reading your own records".to_string(),
            });
        };
        super::ensure_can_read_student(&current_user, Resource::Grades, student_id, &mut pool_conn).await?;
    }

    let mut repo = Grades::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = GradeFilter::new(skip, limit)
        .with_student(query.student_id)
        .with_subject(query.subject_id)
        .with_enrollment(query.enrollment_id)
        .with_term(query.term)
        .with_grade_type(query.grade_type);

    let grades = repo.list(&filter).await?;
    Ok(Json(grades.into_iter().map(GradeResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/grades",
    tag = "grades",
    summary = "Enter grade",
    request_body = GradeCreate,
    responses(
        (status = 201, description = "Grade entered", body = GradeResponse),
        (status = 400, description = "Marks outside 0..=max_marks or invalid references"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_grade(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Grades, operation::CreateAll>,
    Json(create): Json<GradeCreate>,
) -> Result<(StatusCode, Json<GradeResponse>)> {
    let max_marks = create.max_marks.unwrap_or(Decimal::ONE_HUNDRED);
    if create.marks < Decimal::ZERO || create.marks > max_marks {
        return Err(Error::BadRequest {
            message: "marks must be between 0 and max_marks".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    let grade = repo.create(&to_db_create(&create, current_user.id)).await?;
    Ok((StatusCode::CREATED, Json(GradeResponse::from(grade))))
}

#[utoipa::path(
    get,
    path = "/grades/{id}",
    tag = "grades",
    summary = "Get grade",
    responses(
        (status = 200, description = "Grade", body = GradeResponse),
        (status = 404, description = "Grade not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_grade(
    State(state): State<AppState>,
    Path(id): Path<GradeId>,
    _: RequiresPermission<resource::Grades, operation::ReadAll>,
) -> Result<Json<GradeResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    let grade = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Grade".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(GradeResponse::from(grade)))
}

#[utoipa::path(
    patch,
    path = "/grades/{id}",
    tag = "grades",
    summary = "Update grade",
    request_body = GradeUpdate,
    responses(
        (status = 200, description = "Grade updated", body = GradeResponse),
        (status = 400, description = "Marks outside 0..=max_marks"),
        (status = 404, description = "Grade not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_grade(
    State(state): State<AppState>,
    Path(id): Path<GradeId>,
    _: RequiresPermission<resource::Grades, operation::UpdateAll>,
    Json(update): Json<GradeUpdate>,
) -> Result<Json<GradeResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    let grade = repo
        .update(
            id,
            &GradeUpdateDBRequest {
                marks: update.marks,
                max_marks: update.max_marks,
                grade_type: update.grade_type,
                exam_date: update.exam_date,
                remarks: update.remarks,
            },
        )
        .await?;

    Ok(Json(GradeResponse::from(grade)))
}

#[utoipa::path(
    delete,
    path = "/grades/{id}",
    tag = "grades",
    summary = "Delete grade",
    responses(
        (status = 204, description = "Grade deleted"),
        (status = 404, description = "Grade not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_grade(
    State(state): State<AppState>,
    Path(id): Path<GradeId>,
    _: RequiresPermission<resource::Grades, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Grade".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    post,
    path = "/grades/bulk",
    tag = "grades",
    summary = "Enter grades in bulk",
    description = "Best-effort: invalid entries are reported by index while the rest are created.",
    request_body = BulkGradesRequest,
    responses(
        (status = 200, description = "Mixed created/errors report", body = BulkGradesReport),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all, fields(grades = request.grades.len()))]
pub async fn bulk_create_grades(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Grades, operation::CreateAll>,
    Json(request): Json<BulkGradesRequest>,
) -> Result<Json<BulkGradesReport>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut created = Vec::new();
    let mut errors = Vec::new();

    for (index, entry) in request.grades.iter().enumerate() {
        let max_marks = entry.max_marks.unwrap_or(Decimal::ONE_HUNDRED);
        if entry.marks < Decimal::ZERO || entry.marks > max_marks {
            errors.push(BulkGradeError {
                index,
                error: "marks must be between 0 and max_marks".to_string(),
            });
            continue;
        }

        let mut repo = Grades::new(&mut pool_conn);
        match repo.create(&to_db_create(entry, current_user.id)).await {
            Ok(grade) => created.push(GradeResponse::from(grade)),
            Err(e) => errors.push(BulkGradeError {
                index,
                error: Error::from(e).user_message(),
            }),
        }
    }

    Ok(Json(BulkGradesReport { created, errors }))
}

#[utoipa::path(
    get,
    path = "/grades/student-report",
    tag = "grades",
    summary = "Per-student term report",
    params(StudentReportQuery),
    responses(
        (status = 200, description = "Student grade report", body = StudentReportResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn student_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StudentReportQuery>,
) -> Result<Json<StudentReportResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Students and parents may read their own records only
    super::ensure_can_read_student(&current_user, Resource::Grades, query.student_id, &mut pool_conn).await?;

    let mut repo = Grades::new(&mut pool_conn);
    let grades = repo.list_for_student_term(query.student_id, query.term).await?;

    let total_marks: Decimal = grades.iter().map(|g| g.marks).sum();
    let total_max_marks: Decimal = grades.iter().map(|g| g.max_marks).sum();
    let overall_percentage = percentage(total_marks, total_max_marks);

    Ok(Json(StudentReportResponse {
        student_id: query.student_id,
        term: query.term,
        overall_letter_grade: letter_grade(overall_percentage).to_string(),
        overall_percentage,
        total_marks,
        total_max_marks,
        grades: grades.into_iter().map(GradeResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/grades/class-report",
    tag = "grades",
    summary = "Class report for one subject and term",
    params(ClassReportQuery),
    responses(
        (status = 200, description = "Class grade report", body = ClassReportResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn class_report(
    State(state): State<AppState>,
    Query(query): Query<ClassReportQuery>,
    _: RequiresPermission<resource::Grades, operation::ReadAll>,
) -> Result<Json<ClassReportResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    let grades = repo
        .list_for_class_subject_term(query.class_id, query.subject_id, query.term)
        .await?;

    let extreme = |g: &crate::db::models::grades::GradeDBResponse| ClassReportExtreme {
        student_id: g.student_id,
        marks: g.marks,
        percentage: g.percentage(),
    };

    let highest = grades.iter().max_by_key(|g| g.percentage()).map(extreme);
    let lowest = grades.iter().min_by_key(|g| g.percentage()).map(extreme);

    let average_percentage = if grades.is_empty() {
        Decimal::ZERO
    } else {
        round2(grades.iter().map(|g| g.percentage()).sum::<Decimal>() / Decimal::from(grades.len()))
    };

    Ok(Json(ClassReportResponse {
        class_id: query.class_id,
        subject_id: query.subject_id,
        term: query.term,
        total_students: grades.len(),
        average_percentage,
        highest,
        lowest,
        grades: grades.into_iter().map(GradeResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/grades/subject-statistics",
    tag = "grades",
    summary = "Subject statistics for a term",
    params(SubjectStatisticsQuery),
    responses(
        (status = 200, description = "Subject statistics", body = SubjectStatisticsResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn subject_statistics(
    State(state): State<AppState>,
    Query(query): Query<SubjectStatisticsQuery>,
    _: RequiresPermission<resource::Grades, operation::ReadAll>,
) -> Result<Json<SubjectStatisticsResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Grades::new(&mut pool_conn);

    let grades = repo.list_for_subject_term(query.subject_id, query.term).await?;

    let average_marks = if grades.is_empty() {
        Decimal::ZERO
    } else {
        round2(grades.iter().map(|g| g.marks).sum::<Decimal>() / Decimal::from(grades.len()))
    };

    // Distribution buckets by derived percentage so it always agrees with the
    // per-grade letter
    let mut distribution = GradeDistribution::default();
    for grade in &grades {
        distribution.record(grade.letter_grade());
    }

    Ok(Json(SubjectStatisticsResponse {
        subject_id: query.subject_id,
        term: query.term,
        total_entries: grades.len(),
        average_marks,
        grade_distribution: distribution,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, seed_school};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_grade_entry_validates_marks(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/grades")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "subject_id": fixture.subject_id,
                "enrollment_id": fixture.enrollment_id,
                "marks": "110",
                "max_marks": "100",
                "grade_type": "final",
                "exam_date": "2025-12-01",
                "term": "1"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_grade_response_derives_letter(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/grades")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "subject_id": fixture.subject_id,
                "enrollment_id": fixture.enrollment_id,
                "marks": "85",
                "grade_type": "midterm",
                "exam_date": "2025-10-15",
                "term": "1"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let grade: serde_json::Value = response.json();
        assert_eq!(grade["percentage"], "85.00");
        assert_eq!(grade["letter_grade"], "A");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_bulk_grades_reports_failures_by_index(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/grades/bulk")
            .add_header(name, value)
            .json(&serde_json::json!({
                "grades": [
                    {
                        "student_id": fixture.student_id,
                        "subject_id": fixture.subject_id,
                        "enrollment_id": fixture.enrollment_id,
                        "marks": "70",
                        "grade_type": "quiz",
                        "exam_date": "2025-10-01",
                        "term": "1"
                    },
                    {
                        "student_id": fixture.student_id,
                        "subject_id": fixture.subject_id,
                        "enrollment_id": fixture.enrollment_id,
                        "marks": "150",
                        "grade_type": "quiz",
                        "exam_date": "2025-10-01",
                        "term": "1"
                    }
                ]
            }))
            .await;
        response.assert_status_ok();

        let report: serde_json::Value = response.json();
        assert_eq!(report["created"].as_array().unwrap().len(), 1);
        let errors = report["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["index"], 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_student_report_aggregates_term(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        for marks in ["80", "90"] {
            let (name, value) = auth_header(&admin);
            server
                .post("/api/v1/grades")
                .add_header(name, value)
                .json(&serde_json::json!({
                    "student_id": fixture.student_id,
                    "subject_id": fixture.subject_id,
                    "enrollment_id": fixture.enrollment_id,
                    "marks": marks,
                    "grade_type": "assignment",
                    "exam_date": "2025-10-01",
                    "term": "1"
                }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let (name, value) = auth_header(&admin);
        let response = server
            .get(&format!(
                "/api/v1/grades/student-report?student_id={}&term=1",
                fixture.student_id
            ))
            .add_header(name, value)
            .await;
        response.assert_status_ok();

        let report: serde_json::Value = response.json();
        assert_eq!(report["grades"].as_array().unwrap().len(), 2);
        assert_eq!(report["overall_percentage"], "85.00");
        assert_eq!(report["overall_letter_grade"], "A");
    }
}
