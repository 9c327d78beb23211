//! Handlers for the weekly timetable, the advisory conflict check and
//! syllabi.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::timetable::{
        ClassScheduleQuery, ClassScheduleResponse, ConflictCheckRequest, ConflictCheckResponse, DaySchedule,
        ListSyllabiQuery, ListTimetableQuery, SyllabusCreate, SyllabusResponse, SyllabusUpdate, TimetableEntryCreate,
        TimetableEntryResponse, TimetableEntryUpdate, Weekday,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{
            Repository, Syllabi, TimetableEntries,
            timetable::{ConflictProbe, SyllabusFilter, TimetableEntryFilter},
        },
        models::timetable::{
            SyllabusCreateDBRequest, SyllabusUpdateDBRequest, TimetableEntryCreateDBRequest,
            TimetableEntryUpdateDBRequest,
        },
    },
    errors::{Error, Result},
    types::{SyllabusId, TimetableEntryId},
};

#[utoipa::path(
    get,
    path = "/timetable",
    tag = "timetable",
    summary = "List timetable entries",
    params(ListTimetableQuery),
    responses(
        (status = 200, description = "List of timetable entries", body = Vec<TimetableEntryResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_timetable_entries(
    State(state): State<AppState>,
    Query(query): Query<ListTimetableQuery>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
) -> Result<Json<Vec<TimetableEntryResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = TimetableEntryFilter::new(skip, limit)
        .with_class(query.class_id)
        .with_teacher(query.teacher_id)
        .with_day(query.day_of_week);

    let entries = repo.list(&filter).await?;
    Ok(Json(entries.into_iter().map(TimetableEntryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/timetable",
    tag = "timetable",
    summary = "Create timetable entry",
    description = "Overlap with existing entries is not enforced here; run the conflict check first if the answer matters.",
    request_body = TimetableEntryCreate,
    responses(
        (status = 201, description = "Timetable entry created", body = TimetableEntryResponse),
        (status = 400, description = "start_time not before end_time or invalid references"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_timetable_entry(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Timetable, operation::CreateAll>,
    Json(create): Json<TimetableEntryCreate>,
) -> Result<(StatusCode, Json<TimetableEntryResponse>)> {
    if create.start_time >= create.end_time {
        return Err(Error::BadRequest {
            message: "start_time must be before end_time".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let entry = repo
        .create(&TimetableEntryCreateDBRequest {
            class_id: create.class_id,
            subject_id: create.subject_id,
            teacher_id: create.teacher_id,
            day_of_week: create.day_of_week,
            start_time: create.start_time,
            end_time: create.end_time,
            room_number: create.room_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TimetableEntryResponse::from(entry))))
}

#[utoipa::path(
    get,
    path = "/timetable/{id}",
    tag = "timetable",
    summary = "Get timetable entry",
    responses(
        (status = 200, description = "Timetable entry", body = TimetableEntryResponse),
        (status = 404, description = "Entry not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_timetable_entry(
    State(state): State<AppState>,
    Path(id): Path<TimetableEntryId>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
) -> Result<Json<TimetableEntryResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let entry = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "TimetableEntry".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(TimetableEntryResponse::from(entry)))
}

#[utoipa::path(
    patch,
    path = "/timetable/{id}",
    tag = "timetable",
    summary = "Update timetable entry",
    request_body = TimetableEntryUpdate,
    responses(
        (status = 200, description = "Timetable entry updated", body = TimetableEntryResponse),
        (status = 400, description = "start_time not before end_time"),
        (status = 404, description = "Entry not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_timetable_entry(
    State(state): State<AppState>,
    Path(id): Path<TimetableEntryId>,
    _: RequiresPermission<resource::Timetable, operation::UpdateAll>,
    Json(update): Json<TimetableEntryUpdate>,
) -> Result<Json<TimetableEntryResponse>> {
    if let (Some(start), Some(end)) = (update.start_time, update.end_time)
        && start >= end
    {
        return Err(Error::BadRequest {
            message: "start_time must be before end_time".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let entry = repo
        .update(
            id,
            &TimetableEntryUpdateDBRequest {
                subject_id: update.subject_id,
                teacher_id: update.teacher_id,
                day_of_week: update.day_of_week,
                start_time: update.start_time,
                end_time: update.end_time,
                room_number: update.room_number,
            },
        )
        .await?;

    Ok(Json(TimetableEntryResponse::from(entry)))
}

#[utoipa::path(
    delete,
    path = "/timetable/{id}",
    tag = "timetable",
    summary = "Delete timetable entry",
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_timetable_entry(
    State(state): State<AppState>,
    Path(id): Path<TimetableEntryId>,
    _: RequiresPermission<resource::Timetable, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "TimetableEntry".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/timetable/class-schedule",
    tag = "timetable",
    summary = "Weekly schedule for a class",
    params(ClassScheduleQuery),
    responses(
        (status = 200, description = "Entries grouped by weekday in start-time order", body = ClassScheduleResponse),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn class_schedule(
    State(state): State<AppState>,
    Query(query): Query<ClassScheduleQuery>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
) -> Result<Json<ClassScheduleResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let entries = repo.list_for_class(query.class_id).await?;

    let days = Weekday::ALL
        .into_iter()
        .map(|day| {
            let mut day_entries: Vec<TimetableEntryResponse> = entries
                .iter()
                .filter(|entry| entry.day_of_week == day)
                .cloned()
                .map(TimetableEntryResponse::from)
                .collect();
            day_entries.sort_by_key(|entry| entry.start_time);
            DaySchedule {
                day_of_week: day,
                entries: day_entries,
            }
        })
        .collect();

    Ok(Json(ClassScheduleResponse {
        class_id: query.class_id,
        days,
    }))
}

#[utoipa::path(
    post,
    path = "/timetable/check-conflicts",
    tag = "timetable",
    summary = "Check a candidate slot for conflicts",
    description = "Advisory only: reports existing entries for the same class or teacher whose [start, end) interval intersects the candidate on the same day. Nothing is persisted.",
    request_body = ConflictCheckRequest,
    responses(
        (status = 200, description = "Conflict report", body = ConflictCheckResponse),
        (status = 400, description = "start_time not before end_time"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn check_conflicts(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
    Json(request): Json<ConflictCheckRequest>,
) -> Result<Json<ConflictCheckResponse>> {
    if request.start_time >= request.end_time {
        return Err(Error::BadRequest {
            message: "start_time must be before end_time".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TimetableEntries::new(&mut pool_conn);

    let conflicts = repo
        .conflicting(&ConflictProbe {
            class_id: request.class_id,
            teacher_id: request.teacher_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            exclude_entry_id: request.exclude_entry_id,
        })
        .await?;

    Ok(Json(ConflictCheckResponse {
        has_conflicts: !conflicts.is_empty(),
        conflicts: conflicts.into_iter().map(TimetableEntryResponse::from).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Syllabi

#[utoipa::path(
    get,
    path = "/syllabi",
    tag = "timetable",
    summary = "List syllabi",
    params(ListSyllabiQuery),
    responses(
        (status = 200, description = "List of syllabi", body = Vec<SyllabusResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_syllabi(
    State(state): State<AppState>,
    Query(query): Query<ListSyllabiQuery>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
) -> Result<Json<Vec<SyllabusResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Syllabi::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = SyllabusFilter::new(skip, limit)
        .with_subject(query.subject_id)
        .with_teacher(query.teacher_id);

    let syllabi = repo.list(&filter).await?;
    Ok(Json(syllabi.into_iter().map(SyllabusResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/syllabi",
    tag = "timetable",
    summary = "Create syllabus",
    request_body = SyllabusCreate,
    responses(
        (status = 201, description = "Syllabus created", body = SyllabusResponse),
        (status = 400, description = "Invalid week number or references"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_syllabus(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Timetable, operation::CreateAll>,
    Json(create): Json<SyllabusCreate>,
) -> Result<(StatusCode, Json<SyllabusResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Syllabi::new(&mut pool_conn);

    let syllabus = repo
        .create(&SyllabusCreateDBRequest {
            subject_id: create.subject_id,
            teacher_id: create.teacher_id,
            week_number: create.week_number,
            topic_title: create.topic_title,
            content_summary: create.content_summary,
            learning_objectives: create.learning_objectives,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SyllabusResponse::from(syllabus))))
}

#[utoipa::path(
    get,
    path = "/syllabi/{id}",
    tag = "timetable",
    summary = "Get syllabus",
    responses(
        (status = 200, description = "Syllabus", body = SyllabusResponse),
        (status = 404, description = "Syllabus not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_syllabus(
    State(state): State<AppState>,
    Path(id): Path<SyllabusId>,
    _: RequiresPermission<resource::Timetable, operation::ReadAll>,
) -> Result<Json<SyllabusResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Syllabi::new(&mut pool_conn);

    let syllabus = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Syllabus".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(SyllabusResponse::from(syllabus)))
}

#[utoipa::path(
    patch,
    path = "/syllabi/{id}",
    tag = "timetable",
    summary = "Update syllabus",
    request_body = SyllabusUpdate,
    responses(
        (status = 200, description = "Syllabus updated", body = SyllabusResponse),
        (status = 404, description = "Syllabus not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_syllabus(
    State(state): State<AppState>,
    Path(id): Path<SyllabusId>,
    _: RequiresPermission<resource::Timetable, operation::UpdateAll>,
    Json(update): Json<SyllabusUpdate>,
) -> Result<Json<SyllabusResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Syllabi::new(&mut pool_conn);

    let syllabus = repo
        .update(
            id,
            &SyllabusUpdateDBRequest {
                week_number: update.week_number,
                topic_title: update.topic_title,
                content_summary: update.content_summary,
                learning_objectives: update.learning_objectives,
            },
        )
        .await?;

    Ok(Json(SyllabusResponse::from(syllabus)))
}

#[utoipa::path(
    delete,
    path = "/syllabi/{id}",
    tag = "timetable",
    summary = "Delete syllabus",
    responses(
        (status = 204, description = "Syllabus deleted"),
        (status = 404, description = "Syllabus not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_syllabus(
    State(state): State<AppState>,
    Path(id): Path<SyllabusId>,
    _: RequiresPermission<resource::Timetable, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Syllabi::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Syllabus".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, seed_school};
    use sqlx::PgPool;

    async fn create_entry(
        server: &axum_test::TestServer,
        admin: &crate::api::models::users::CurrentUser,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let (name, value) = auth_header(admin);
        let response = server.post("/api/v1/timetable").add_header(name, value).json(&body).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_conflict_check_flags_overlap_not_adjacency(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        create_entry(
            &server,
            &admin,
            serde_json::json!({
                "class_id": fixture.class_id,
                "subject_id": fixture.subject_id,
                "teacher_id": fixture.staff_id,
                "day_of_week": "monday",
                "start_time": "09:00:00",
                "end_time": "10:00:00"
            }),
        )
        .await;

        // Same teacher, overlapping interval on monday
        let (name, value) = auth_header(&admin);
        let overlapping: serde_json::Value = server
            .post("/api/v1/timetable/check-conflicts")
            .add_header(name, value)
            .json(&serde_json::json!({
                "class_id": fixture.other_class_id,
                "teacher_id": fixture.staff_id,
                "day_of_week": "monday",
                "start_time": "09:30:00",
                "end_time": "10:30:00"
            }))
            .await
            .json();
        assert_eq!(overlapping["has_conflicts"], true);
        assert_eq!(overlapping["conflicts"].as_array().unwrap().len(), 1);

        // Back-to-back interval does not conflict
        let (name, value) = auth_header(&admin);
        let adjacent: serde_json::Value = server
            .post("/api/v1/timetable/check-conflicts")
            .add_header(name, value)
            .json(&serde_json::json!({
                "class_id": fixture.class_id,
                "teacher_id": fixture.staff_id,
                "day_of_week": "monday",
                "start_time": "10:00:00",
                "end_time": "11:00:00"
            }))
            .await
            .json();
        assert_eq!(adjacent["has_conflicts"], false);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_class_schedule_groups_by_day(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // Two monday slots created out of order plus one wednesday slot
        for (day, start, end) in [
            ("monday", "11:00:00", "12:00:00"),
            ("monday", "08:00:00", "09:00:00"),
            ("wednesday", "09:00:00", "10:00:00"),
        ] {
            create_entry(
                &server,
                &admin,
                serde_json::json!({
                    "class_id": fixture.class_id,
                    "subject_id": fixture.subject_id,
                    "teacher_id": fixture.staff_id,
                    "day_of_week": day,
                    "start_time": start,
                    "end_time": end
                }),
            )
            .await;
        }

        let (name, value) = auth_header(&admin);
        let schedule: serde_json::Value = server
            .get(&format!("/api/v1/timetable/class-schedule?class_id={}", fixture.class_id))
            .add_header(name, value)
            .await
            .json();

        let days = schedule["days"].as_array().unwrap();
        assert_eq!(days.len(), 5);
        let monday = &days[0];
        assert_eq!(monday["day_of_week"], "monday");
        let monday_entries = monday["entries"].as_array().unwrap();
        assert_eq!(monday_entries.len(), 2);
        // Start-time order within the day
        assert_eq!(monday_entries[0]["start_time"], "08:00:00");
        assert_eq!(monday_entries[1]["start_time"], "11:00:00");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_reversed_times_rejected_before_save(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/timetable")
            .add_header(name, value)
            .json(&serde_json::json!({
                "class_id": fixture.class_id,
                "subject_id": fixture.subject_id,
                "teacher_id": fixture.staff_id,
                "day_of_week": "friday",
                "start_time": "10:00:00",
                "end_time": "09:00:00"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
