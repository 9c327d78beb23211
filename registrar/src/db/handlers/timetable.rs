//! Database repositories for timetable entries and syllabi.
//!
//! The conflict query is advisory only: nothing at the data layer stops two
//! overlapping entries from being saved. Callers run the check before the
//! write and decide what to do with the answer.

use crate::api::models::timetable::Weekday;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::timetable::{
        SyllabusCreateDBRequest, SyllabusDBResponse, SyllabusUpdateDBRequest, TimetableEntryCreateDBRequest,
        TimetableEntryDBResponse, TimetableEntryUpdateDBRequest,
    },
};
use crate::types::{ClassId, StaffId, SubjectId, SyllabusId, TimetableEntryId, abbrev_uuid};
use chrono::NaiveTime;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing timetable entries
#[derive(Debug, Clone, Default)]
pub struct TimetableEntryFilter {
    pub skip: i64,
    pub limit: i64,
    pub class_id: Option<ClassId>,
    pub teacher_id: Option<StaffId>,
    pub day_of_week: Option<Weekday>,
}

impl TimetableEntryFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_id: Option<ClassId>) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_teacher(mut self, teacher_id: Option<StaffId>) -> Self {
        self.teacher_id = teacher_id;
        self
    }

    pub fn with_day(mut self, day_of_week: Option<Weekday>) -> Self {
        self.day_of_week = day_of_week;
        self
    }
}

/// A candidate slot checked against existing entries before save.
#[derive(Debug, Clone)]
pub struct ConflictProbe {
    pub class_id: ClassId,
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub exclude_entry_id: Option<TimetableEntryId>,
}

pub struct TimetableEntries<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for TimetableEntries<'c> {
    type CreateRequest = TimetableEntryCreateDBRequest;
    type UpdateRequest = TimetableEntryUpdateDBRequest;
    type Response = TimetableEntryDBResponse;
    type Id = TimetableEntryId;
    type Filter = TimetableEntryFilter;

    #[instrument(skip(self, request), fields(class_id = %abbrev_uuid(&request.class_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let entry = sqlx::query_as::<_, TimetableEntryDBResponse>(
            r#"
            INSERT INTO timetable_entries (id, class_id, subject_id, teacher_id, day_of_week,
                                           start_time, end_time, room_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.class_id)
        .bind(request.subject_id)
        .bind(request.teacher_id)
        .bind(request.day_of_week)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.room_number)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(entry)
    }

    #[instrument(skip(self), fields(entry_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let entry = sqlx::query_as::<_, TimetableEntryDBResponse>("SELECT * FROM timetable_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(entry)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let entries = sqlx::query_as::<_, TimetableEntryDBResponse>(
            r#"
            SELECT * FROM timetable_entries
            WHERE ($1::uuid IS NULL OR class_id = $1)
              AND ($2::uuid IS NULL OR teacher_id = $2)
              AND ($3::text IS NULL OR day_of_week = $3)
            ORDER BY day_of_week, start_time
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.class_id)
        .bind(filter.teacher_id)
        .bind(filter.day_of_week)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    #[instrument(skip(self), fields(entry_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM timetable_entries WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(entry_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let entry = sqlx::query_as::<_, TimetableEntryDBResponse>(
            r#"
            UPDATE timetable_entries SET
                subject_id = COALESCE($2, subject_id),
                teacher_id = COALESCE($3, teacher_id),
                day_of_week = COALESCE($4, day_of_week),
                start_time = COALESCE($5, start_time),
                end_time = COALESCE($6, end_time),
                room_number = COALESCE($7, room_number)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.subject_id)
        .bind(request.teacher_id)
        .bind(request.day_of_week)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.room_number)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(entry)
    }
}

impl<'c> TimetableEntries<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// All entries for a class, ordered for schedule rendering.
    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&class_id)), err)]
    pub async fn list_for_class(&mut self, class_id: ClassId) -> Result<Vec<TimetableEntryDBResponse>> {
        let entries = sqlx::query_as::<_, TimetableEntryDBResponse>(
            "SELECT * FROM timetable_entries WHERE class_id = $1 ORDER BY day_of_week, start_time",
        )
        .bind(class_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    /// Existing entries that clash with the candidate slot: same day, same
    /// class or same teacher, strictly intersecting [start, end) intervals.
    #[instrument(skip(self, probe), fields(class_id = %abbrev_uuid(&probe.class_id)), err)]
    pub async fn conflicting(&mut self, probe: &ConflictProbe) -> Result<Vec<TimetableEntryDBResponse>> {
        let entries = sqlx::query_as::<_, TimetableEntryDBResponse>(
            r#"
            SELECT * FROM timetable_entries
            WHERE day_of_week = $1
              AND (class_id = $2 OR teacher_id = $3)
              AND ($4::uuid IS NULL OR id != $4)
              AND start_time < $6
              AND $5 < end_time
            ORDER BY start_time
            "#,
        )
        .bind(probe.day_of_week)
        .bind(probe.class_id)
        .bind(probe.teacher_id)
        .bind(probe.exclude_entry_id)
        .bind(probe.start_time)
        .bind(probe.end_time)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Syllabi

#[derive(Debug, Clone, Default)]
pub struct SyllabusFilter {
    pub skip: i64,
    pub limit: i64,
    pub subject_id: Option<SubjectId>,
    pub teacher_id: Option<StaffId>,
}

impl SyllabusFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject_id: Option<SubjectId>) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn with_teacher(mut self, teacher_id: Option<StaffId>) -> Self {
        self.teacher_id = teacher_id;
        self
    }
}

pub struct Syllabi<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Syllabi<'c> {
    type CreateRequest = SyllabusCreateDBRequest;
    type UpdateRequest = SyllabusUpdateDBRequest;
    type Response = SyllabusDBResponse;
    type Id = SyllabusId;
    type Filter = SyllabusFilter;

    #[instrument(skip(self, request), fields(topic = %request.topic_title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let syllabus = sqlx::query_as::<_, SyllabusDBResponse>(
            r#"
            INSERT INTO syllabi (id, subject_id, teacher_id, week_number, topic_title,
                                 content_summary, learning_objectives)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.subject_id)
        .bind(request.teacher_id)
        .bind(request.week_number)
        .bind(&request.topic_title)
        .bind(&request.content_summary)
        .bind(&request.learning_objectives)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(syllabus)
    }

    #[instrument(skip(self), fields(syllabus_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let syllabus = sqlx::query_as::<_, SyllabusDBResponse>("SELECT * FROM syllabi WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(syllabus)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let syllabi = sqlx::query_as::<_, SyllabusDBResponse>(
            r#"
            SELECT * FROM syllabi
            WHERE ($1::uuid IS NULL OR subject_id = $1)
              AND ($2::uuid IS NULL OR teacher_id = $2)
            ORDER BY week_number
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.subject_id)
        .bind(filter.teacher_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(syllabi)
    }

    #[instrument(skip(self), fields(syllabus_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM syllabi WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(syllabus_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let syllabus = sqlx::query_as::<_, SyllabusDBResponse>(
            r#"
            UPDATE syllabi SET
                week_number = COALESCE($2, week_number),
                topic_title = COALESCE($3, topic_title),
                content_summary = COALESCE($4, content_summary),
                learning_objectives = COALESCE($5, learning_objectives)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.week_number)
        .bind(&request.topic_title)
        .bind(&request.content_summary)
        .bind(&request.learning_objectives)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(syllabus)
    }
}

impl<'c> Syllabi<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::api::models::people::StaffType;
    use crate::db::handlers::academics::{AcademicYears, Classes, Subjects};
    use crate::db::handlers::people::Staff;
    use crate::db::models::academics::{AcademicYearCreateDBRequest, ClassCreateDBRequest, SubjectCreateDBRequest};
    use crate::db::models::people::StaffCreateDBRequest;
    use sqlx::PgPool;

    struct Fixture {
        class_id: ClassId,
        other_class_id: ClassId,
        subject_id: SubjectId,
        teacher_id: StaffId,
        other_teacher_id: StaffId,
    }

    async fn seed(conn: &mut PgConnection) -> Fixture {
        let year = AcademicYears::new(conn)
            .create(&AcademicYearCreateDBRequest {
                year_name: "2025/26".to_string(),
                start_date: "2025-09-01".parse().unwrap(),
                end_date: "2026-07-15".parse().unwrap(),
                is_current: true,
            })
            .await
            .unwrap();

        let mut classes = Vec::new();
        for name in ["Form 1A", "Form 1B"] {
            let class = Classes::new(conn)
                .create(&ClassCreateDBRequest {
                    class_name: name.to_string(),
                    academic_year_id: year.id,
                    class_teacher_id: None,
                    capacity: 40,
                    room_number: String::new(),
                })
                .await
                .unwrap();
            classes.push(class.id);
        }

        let subject = Subjects::new(conn)
            .create(&SubjectCreateDBRequest {
                subject_name: "Mathematics".to_string(),
                subject_code: "MTH".to_string(),
                grade_level: String::new(),
            })
            .await
            .unwrap();

        let mut teachers = Vec::new();
        for name in ["Ada", "Chidi"] {
            let staff = Staff::new(conn)
                .create(&StaffCreateDBRequest {
                    user_id: None,
                    first_name: name.to_string(),
                    last_name: "Teacher".to_string(),
                    gender: None,
                    date_of_birth: None,
                    address: String::new(),
                    health_info: String::new(),
                    staff_type: StaffType::Teaching,
                    specialization: String::new(),
                    employment_date: None,
                })
                .await
                .unwrap();
            teachers.push(staff.id);
        }

        Fixture {
            class_id: classes[0],
            other_class_id: classes[1],
            subject_id: subject.id,
            teacher_id: teachers[0],
            other_teacher_id: teachers[1],
        }
    }

    fn entry(f: &Fixture, day: Weekday, start: &str, end: &str) -> TimetableEntryCreateDBRequest {
        TimetableEntryCreateDBRequest {
            class_id: f.class_id,
            subject_id: f.subject_id,
            teacher_id: f.teacher_id,
            day_of_week: day,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            room_number: String::new(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_reversed_times_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let err = TimetableEntries::new(&mut conn)
            .create(&entry(&fixture, Weekday::Monday, "10:00:00", "09:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_same_teacher_overlap_is_a_conflict(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let mut repo = TimetableEntries::new(&mut conn);
        let existing = repo.create(&entry(&fixture, Weekday::Monday, "09:00:00", "10:00:00")).await.unwrap();

        // Same teacher, different class, overlapping interval
        let conflicts = repo
            .conflicting(&ConflictProbe {
                class_id: fixture.other_class_id,
                teacher_id: fixture.teacher_id,
                day_of_week: Weekday::Monday,
                start_time: "09:30:00".parse().unwrap(),
                end_time: "10:30:00".parse().unwrap(),
                exclude_entry_id: None,
            })
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, existing.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_back_to_back_slots_do_not_conflict(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let mut repo = TimetableEntries::new(&mut conn);
        repo.create(&entry(&fixture, Weekday::Monday, "09:00:00", "10:00:00")).await.unwrap();

        let conflicts = repo
            .conflicting(&ConflictProbe {
                class_id: fixture.class_id,
                teacher_id: fixture.teacher_id,
                day_of_week: Weekday::Monday,
                start_time: "10:00:00".parse().unwrap(),
                end_time: "11:00:00".parse().unwrap(),
                exclude_entry_id: None,
            })
            .await
            .unwrap();
        assert!(conflicts.is_empty());

        // A different teacher and class on the same interval is also clean
        let conflicts = repo
            .conflicting(&ConflictProbe {
                class_id: fixture.other_class_id,
                teacher_id: fixture.other_teacher_id,
                day_of_week: Weekday::Monday,
                start_time: "09:00:00".parse().unwrap(),
                end_time: "10:00:00".parse().unwrap(),
                exclude_entry_id: None,
            })
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_excluded_entry_does_not_conflict_with_itself(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let mut repo = TimetableEntries::new(&mut conn);
        let existing = repo.create(&entry(&fixture, Weekday::Tuesday, "09:00:00", "10:00:00")).await.unwrap();

        let conflicts = repo
            .conflicting(&ConflictProbe {
                class_id: fixture.class_id,
                teacher_id: fixture.teacher_id,
                day_of_week: Weekday::Tuesday,
                start_time: "09:00:00".parse().unwrap(),
                end_time: "10:00:00".parse().unwrap(),
                exclude_entry_id: Some(existing.id),
            })
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }
}
