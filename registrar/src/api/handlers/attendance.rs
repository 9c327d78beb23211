//! Handlers for student and staff attendance, bulk marking and the
//! percentage/defaulters reports.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        attendance::{
            AttendanceCreate, AttendanceReportQuery, AttendanceReportResponse, AttendanceResponse, AttendanceUpdate,
            BulkAttendanceError, BulkAttendanceReport, BulkAttendanceRequest, DefaulterResponse, DefaultersQuery,
            ListAttendanceQuery, ListStaffAttendanceQuery, StaffAttendanceCreate, StaffAttendanceResponse,
            StaffAttendanceUpdate,
        },
        users::CurrentUser,
    },
    auth::permissions::{RequiresPermission, has_permission, operation, resource},
    db::{
        handlers::{
            Attendance, Classes, Repository, StaffAttendance,
            attendance::{AttendanceFilter, StaffAttendanceFilter, attendance_percentage},
        },
        models::attendance::{
            AttendanceCreateDBRequest, AttendanceUpdateDBRequest, StaffAttendanceCreateDBRequest,
            StaffAttendanceUpdateDBRequest,
        },
    },
    errors::{Error, Result},
    types::{AttendanceId, Operation, Resource, StaffAttendanceId},
};

#[utoipa::path(
    get,
    path = "/attendance",
    tag = "attendance",
    summary = "List attendance records",
    params(ListAttendanceQuery),
    responses(
        (status = 200, description = "List of attendance records", body = Vec<AttendanceResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListAttendanceQuery>,
) -> Result<Json<Vec<AttendanceResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Own-scoped callers must name one of their own students
    super::ensure_some_read_access(&current_user, Resource::Attendance)?;
    if !has_permission(&current_user, Resource::Attendance, Operation::ReadAll) {
        let Some(student_id) = query.student_id else {
            return Err(Error::BadRequest {
                message: "student_id is required when reading your own records".to_string(),
            });
        };
        super::ensure_can_read_student(&current_user, Resource::Attendance, student_id, &mut pool_conn).await?;
    }

    let mut repo = Attendance::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = AttendanceFilter::new(skip, limit)
        .with_student(query.student_id)
        .with_class(query.class_id)
        .with_status(query.status)
        .with_date_range(query.start_date, query.end_date);

    let records = repo.list(&filter).await?;
    Ok(Json(records.into_iter().map(AttendanceResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/attendance",
    tag = "attendance",
    summary = "Mark attendance",
    request_body = AttendanceCreate,
    responses(
        (status = 201, description = "Attendance marked", body = AttendanceResponse),
        (status = 409, description = "Already marked for this student and date"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_attendance(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Attendance, operation::CreateAll>,
    Json(create): Json<AttendanceCreate>,
) -> Result<(StatusCode, Json<AttendanceResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Attendance::new(&mut pool_conn);

    let record = repo
        .create(&AttendanceCreateDBRequest {
            student_id: create.student_id,
            class_id: create.class_id,
            attendance_date: create.attendance_date,
            status: create.status,
            remarks: create.remarks,
            marked_by: Some(current_user.id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AttendanceResponse::from(record))))
}

#[utoipa::path(
    get,
    path = "/attendance/{id}",
    tag = "attendance",
    summary = "Get attendance record",
    responses(
        (status = 200, description = "Attendance record", body = AttendanceResponse),
        (status = 404, description = "Record not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<AttendanceId>,
    _: RequiresPermission<resource::Attendance, operation::ReadAll>,
) -> Result<Json<AttendanceResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Attendance::new(&mut pool_conn);

    let record = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Attendance".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(AttendanceResponse::from(record)))
}

#[utoipa::path(
    patch,
    path = "/attendance/{id}",
    tag = "attendance",
    summary = "Update attendance record",
    request_body = AttendanceUpdate,
    responses(
        (status = 200, description = "Attendance updated", body = AttendanceResponse),
        (status = 404, description = "Record not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_attendance(
    State(state): State<AppState>,
    Path(id): Path<AttendanceId>,
    _: RequiresPermission<resource::Attendance, operation::UpdateAll>,
    Json(update): Json<AttendanceUpdate>,
) -> Result<Json<AttendanceResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Attendance::new(&mut pool_conn);

    let record = repo
        .update(
            id,
            &AttendanceUpdateDBRequest {
                status: update.status,
                remarks: update.remarks,
            },
        )
        .await?;

    Ok(Json(AttendanceResponse::from(record)))
}

#[utoipa::path(
    delete,
    path = "/attendance/{id}",
    tag = "attendance",
    summary = "Delete attendance record",
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<AttendanceId>,
    _: RequiresPermission<resource::Attendance, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Attendance::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Attendance".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    post,
    path = "/attendance/bulk-mark",
    tag = "attendance",
    summary = "Mark a class-day of attendance",
    description = "Best-effort: records that fail (duplicate day, unknown student) are reported per item while the rest are created.",
    request_body = BulkAttendanceRequest,
    responses(
        (status = 200, description = "Mixed created/errors report", body = BulkAttendanceReport),
        (status = 404, description = "Class not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all, fields(records = request.records.len()))]
pub async fn bulk_mark_attendance(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Attendance, operation::CreateAll>,
    Json(request): Json<BulkAttendanceRequest>,
) -> Result<Json<BulkAttendanceReport>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut classes = Classes::new(&mut pool_conn);
        classes.get_by_id(request.class_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Class".to_string(),
            id: request.class_id.to_string(),
        })?;
    }

    let mut created = Vec::new();
    let mut errors = Vec::new();

    // Each record is its own statement; one failure does not roll back the rest
    for record in &request.records {
        let mut repo = Attendance::new(&mut pool_conn);
        let result = repo
            .create(&AttendanceCreateDBRequest {
                student_id: record.student_id,
                class_id: request.class_id,
                attendance_date: request.attendance_date,
                status: record.status,
                remarks: record.remarks.clone(),
                marked_by: Some(current_user.id),
            })
            .await;

        match result {
            Ok(row) => created.push(AttendanceResponse::from(row)),
            Err(e) => errors.push(BulkAttendanceError {
                student_id: record.student_id,
                error: Error::from(e).user_message(),
            }),
        }
    }

    Ok(Json(BulkAttendanceReport { created, errors }))
}

#[utoipa::path(
    get,
    path = "/attendance/report",
    tag = "attendance",
    summary = "Per-student attendance rollup",
    description = "Days without a record are excluded from the denominator; late and excused days count as marked but not present.",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Attendance report", body = AttendanceReportResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn attendance_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AttendanceReportQuery>,
) -> Result<Json<AttendanceReportResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Students and parents may read their own records only
    super::ensure_can_read_student(&current_user, Resource::Attendance, query.student_id, &mut pool_conn).await?;

    let mut repo = Attendance::new(&mut pool_conn);
    let counts = repo
        .counts_for_student(query.student_id, query.start_date, query.end_date)
        .await?;

    Ok(Json(AttendanceReportResponse {
        student_id: query.student_id,
        total_days: counts.total_days,
        present_days: counts.present_days,
        absent_days: counts.absent_days,
        late_days: counts.late_days,
        excused_days: counts.excused_days,
        attendance_percentage: attendance_percentage(counts.present_days, counts.total_days),
    }))
}

#[utoipa::path(
    get,
    path = "/attendance/defaulters",
    tag = "attendance",
    summary = "Students below the attendance threshold",
    params(DefaultersQuery),
    responses(
        (status = 200, description = "Defaulters in the class", body = Vec<DefaulterResponse>),
        (status = 404, description = "Class not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn attendance_defaulters(
    State(state): State<AppState>,
    Query(query): Query<DefaultersQuery>,
    _: RequiresPermission<resource::Attendance, operation::ReadAll>,
) -> Result<Json<Vec<DefaulterResponse>>> {
    let threshold = query.threshold.unwrap_or(state.config.attendance.defaulter_threshold);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut classes = Classes::new(&mut pool_conn);
        classes.get_by_id(query.class_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Class".to_string(),
            id: query.class_id.to_string(),
        })?;
    }

    let mut repo = Attendance::new(&mut pool_conn);
    let counts = repo
        .counts_for_class(query.class_id, query.start_date, query.end_date)
        .await?;

    // Students with no marked days have no percentage to fall below
    let defaulters = counts
        .into_iter()
        .filter(|row| row.total_days > 0)
        .filter_map(|row| {
            let percentage = attendance_percentage(row.present_days, row.total_days);
            (percentage < threshold).then(|| DefaulterResponse {
                student_id: row.student_id,
                admission_number: row.admission_number,
                first_name: row.first_name,
                last_name: row.last_name,
                total_days: row.total_days,
                present_days: row.present_days,
                attendance_percentage: percentage,
            })
        })
        .collect();

    Ok(Json(defaulters))
}

// ---------------------------------------------------------------------------
// Staff attendance

#[utoipa::path(
    get,
    path = "/staff-attendance",
    tag = "attendance",
    summary = "List staff attendance records",
    params(ListStaffAttendanceQuery),
    responses(
        (status = 200, description = "List of staff attendance records", body = Vec<StaffAttendanceResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_staff_attendance(
    State(state): State<AppState>,
    Query(query): Query<ListStaffAttendanceQuery>,
    _: RequiresPermission<resource::Attendance, operation::ReadAll>,
) -> Result<Json<Vec<StaffAttendanceResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = StaffAttendance::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = StaffAttendanceFilter::new(skip, limit)
        .with_staff(query.staff_id)
        .with_status(query.status)
        .with_date_range(query.start_date, query.end_date);

    let records = repo.list(&filter).await?;
    Ok(Json(records.into_iter().map(StaffAttendanceResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/staff-attendance",
    tag = "attendance",
    summary = "Mark staff attendance",
    request_body = StaffAttendanceCreate,
    responses(
        (status = 201, description = "Staff attendance marked", body = StaffAttendanceResponse),
        (status = 409, description = "Already marked for this staff member and date"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_staff_attendance(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Attendance, operation::CreateAll>,
    Json(create): Json<StaffAttendanceCreate>,
) -> Result<(StatusCode, Json<StaffAttendanceResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = StaffAttendance::new(&mut pool_conn);

    let record = repo
        .create(&StaffAttendanceCreateDBRequest {
            staff_id: create.staff_id,
            attendance_date: create.attendance_date,
            status: create.status,
            check_in: create.check_in,
            check_out: create.check_out,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(StaffAttendanceResponse::from(record))))
}

#[utoipa::path(
    patch,
    path = "/staff-attendance/{id}",
    tag = "attendance",
    summary = "Update staff attendance record",
    request_body = StaffAttendanceUpdate,
    responses(
        (status = 200, description = "Staff attendance updated", body = StaffAttendanceResponse),
        (status = 404, description = "Record not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_staff_attendance(
    State(state): State<AppState>,
    Path(id): Path<StaffAttendanceId>,
    _: RequiresPermission<resource::Attendance, operation::UpdateAll>,
    Json(update): Json<StaffAttendanceUpdate>,
) -> Result<Json<StaffAttendanceResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = StaffAttendance::new(&mut pool_conn);

    let record = repo
        .update(
            id,
            &StaffAttendanceUpdateDBRequest {
                status: update.status,
                check_in: update.check_in,
                check_out: update.check_out,
            },
        )
        .await?;

    Ok(Json(StaffAttendanceResponse::from(record)))
}

#[utoipa::path(
    delete,
    path = "/staff-attendance/{id}",
    tag = "attendance",
    summary = "Delete staff attendance record",
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_staff_attendance(
    State(state): State<AppState>,
    Path(id): Path<StaffAttendanceId>,
    _: RequiresPermission<resource::Attendance, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = StaffAttendance::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "StaffAttendance".to_string(),
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
    async fn test_bulk_mark_is_best_effort(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // Pre-mark the student so the bulk request hits the uniqueness rule
        let (name, value) = auth_header(&admin);
        server
            .post("/api/v1/attendance")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "class_id": fixture.class_id,
                "attendance_date": "2025-09-10",
                "status": "present"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/attendance/bulk-mark")
            .add_header(name, value)
            .json(&serde_json::json!({
                "class_id": fixture.class_id,
                "attendance_date": "2025-09-10",
                "records": [
                    {"student_id": fixture.student_id, "status": "absent"},
                    {"student_id": fixture.other_student_id, "status": "present"}
                ]
            }))
            .await;
        response.assert_status_ok();

        let report: serde_json::Value = response.json();
        assert_eq!(report["created"].as_array().unwrap().len(), 1);
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_report_percentage_excludes_unmarked_days(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // 8 present and 2 absent over ten school days
        for day in 1..=10 {
            let status = if day <= 8 { "present" } else { "absent" };
            let (name, value) = auth_header(&admin);
            server
                .post("/api/v1/attendance")
                .add_header(name, value)
                .json(&serde_json::json!({
                    "student_id": fixture.student_id,
                    "class_id": fixture.class_id,
                    "attendance_date": format!("2025-09-{day:02}"),
                    "status": status
                }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        // The query range spans the whole month; unmarked days do not count
        let (name, value) = auth_header(&admin);
        let response = server
            .get(&format!(
                "/api/v1/attendance/report?student_id={}&start_date=2025-09-01&end_date=2025-09-30",
                fixture.student_id
            ))
            .add_header(name, value)
            .await;
        response.assert_status_ok();

        let report: serde_json::Value = response.json();
        assert_eq!(report["total_days"], 10);
        assert_eq!(report["present_days"], 8);
        assert_eq!(report["attendance_percentage"], "80.00");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_defaulters_report_applies_threshold(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // Student one: 1 of 2 days present (50%); student two: 2 of 2 (100%)
        for (day, student, status) in [
            (1, fixture.student_id, "present"),
            (2, fixture.student_id, "absent"),
            (1, fixture.other_student_id, "present"),
            (2, fixture.other_student_id, "present"),
        ] {
            let (name, value) = auth_header(&admin);
            server
                .post("/api/v1/attendance")
                .add_header(name, value)
                .json(&serde_json::json!({
                    "student_id": student,
                    "class_id": fixture.class_id,
                    "attendance_date": format!("2025-09-0{day}"),
                    "status": status
                }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let (name, value) = auth_header(&admin);
        let response = server
            .get(&format!(
                "/api/v1/attendance/defaulters?class_id={}&start_date=2025-09-01&end_date=2025-09-30&threshold=75",
                fixture.class_id
            ))
            .add_header(name, value)
            .await;
        response.assert_status_ok();

        let defaulters: Vec<serde_json::Value> = response.json();
        assert_eq!(defaulters.len(), 1);
        assert_eq!(defaulters[0]["student_id"], fixture.student_id.to_string());
        assert_eq!(defaulters[0]["attendance_percentage"], "50.00");
    }
}
