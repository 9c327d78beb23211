//! Database repositories for student and staff attendance, plus the
//! percentage rollups behind the report and defaulter endpoints.

use crate::api::models::attendance::{AttendanceStatus, StaffAttendanceStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::attendance::{
        AttendanceCounts, AttendanceCreateDBRequest, AttendanceDBResponse, AttendanceUpdateDBRequest,
        ClassAttendanceCounts, StaffAttendanceCreateDBRequest, StaffAttendanceDBResponse, StaffAttendanceUpdateDBRequest,
    },
};
use crate::types::{AttendanceId, ClassId, StaffAttendanceId, StaffId, StudentId, abbrev_uuid};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// present_days / total_days * 100, rounded to two decimals.
///
/// Days with no record are not in the denominator; with nothing marked at all
/// the percentage is zero rather than a division error.
pub fn attendance_percentage(present_days: i64, total_days: i64) -> Decimal {
    if total_days <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(present_days) * Decimal::ONE_HUNDRED / Decimal::from(total_days))
        .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Filter for listing attendance records
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub skip: i64,
    pub limit: i64,
    pub student_id: Option<StudentId>,
    pub class_id: Option<ClassId>,
    pub status: Option<AttendanceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_student(mut self, student_id: Option<StudentId>) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn with_class(mut self, class_id: Option<ClassId>) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_status(mut self, status: Option<AttendanceStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_date_range(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }
}

pub struct Attendance<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Attendance<'c> {
    type CreateRequest = AttendanceCreateDBRequest;
    type UpdateRequest = AttendanceUpdateDBRequest;
    type Response = AttendanceDBResponse;
    type Id = AttendanceId;
    type Filter = AttendanceFilter;

    #[instrument(skip(self, request), fields(student_id = %abbrev_uuid(&request.student_id), date = %request.attendance_date), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let record = sqlx::query_as::<_, AttendanceDBResponse>(
            r#"
            INSERT INTO attendance (id, student_id, class_id, attendance_date, status, remarks, marked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.student_id)
        .bind(request.class_id)
        .bind(request.attendance_date)
        .bind(request.status)
        .bind(&request.remarks)
        .bind(request.marked_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(record)
    }

    #[instrument(skip(self), fields(attendance_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let record = sqlx::query_as::<_, AttendanceDBResponse>("SELECT * FROM attendance WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(record)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let records = sqlx::query_as::<_, AttendanceDBResponse>(
            r#"
            SELECT * FROM attendance
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::uuid IS NULL OR class_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::date IS NULL OR attendance_date >= $4)
              AND ($5::date IS NULL OR attendance_date <= $5)
            ORDER BY attendance_date DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.class_id)
        .bind(filter.status)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(records)
    }

    #[instrument(skip(self), fields(attendance_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(attendance_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let record = sqlx::query_as::<_, AttendanceDBResponse>(
            r#"
            UPDATE attendance SET
                status = COALESCE($2, status),
                remarks = COALESCE($3, remarks)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(&request.remarks)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(record)
    }
}

impl<'c> Attendance<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Per-status day counts for one student over a date range.
    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn counts_for_student(
        &mut self,
        student_id: StudentId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AttendanceCounts> {
        let counts = sqlx::query_as::<_, AttendanceCounts>(
            r#"
            SELECT
                COUNT(*) AS total_days,
                COUNT(*) FILTER (WHERE status = 'present') AS present_days,
                COUNT(*) FILTER (WHERE status = 'absent') AS absent_days,
                COUNT(*) FILTER (WHERE status = 'late') AS late_days,
                COUNT(*) FILTER (WHERE status = 'excused') AS excused_days
            FROM attendance
            WHERE student_id = $1 AND attendance_date BETWEEN $2 AND $3
            "#,
        )
        .bind(student_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(counts)
    }

    /// Marked/present day counts for every actively enrolled student of a class.
    ///
    /// Students with no marked days in the range come back with zero counts;
    /// the caller decides whether to skip them (the defaulters report does).
    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&class_id)), err)]
    pub async fn counts_for_class(
        &mut self,
        class_id: ClassId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ClassAttendanceCounts>> {
        let counts = sqlx::query_as::<_, ClassAttendanceCounts>(
            r#"
            SELECT
                s.id AS student_id,
                s.admission_number,
                s.first_name,
                s.last_name,
                COUNT(a.id) AS total_days,
                COUNT(a.id) FILTER (WHERE a.status = 'present') AS present_days
            FROM enrollments e
            JOIN students s ON s.id = e.student_id
            LEFT JOIN attendance a
                ON a.student_id = s.id AND a.attendance_date BETWEEN $2 AND $3
            WHERE e.class_id = $1 AND e.status = 'active'
            GROUP BY s.id, s.admission_number, s.first_name, s.last_name
            ORDER BY s.first_name, s.last_name
            "#,
        )
        .bind(class_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Staff attendance

#[derive(Debug, Clone, Default)]
pub struct StaffAttendanceFilter {
    pub skip: i64,
    pub limit: i64,
    pub staff_id: Option<StaffId>,
    pub status: Option<StaffAttendanceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl StaffAttendanceFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff_id: Option<StaffId>) -> Self {
        self.staff_id = staff_id;
        self
    }

    pub fn with_status(mut self, status: Option<StaffAttendanceStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_date_range(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }
}

pub struct StaffAttendance<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for StaffAttendance<'c> {
    type CreateRequest = StaffAttendanceCreateDBRequest;
    type UpdateRequest = StaffAttendanceUpdateDBRequest;
    type Response = StaffAttendanceDBResponse;
    type Id = StaffAttendanceId;
    type Filter = StaffAttendanceFilter;

    #[instrument(skip(self, request), fields(staff_id = %abbrev_uuid(&request.staff_id), date = %request.attendance_date), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let record = sqlx::query_as::<_, StaffAttendanceDBResponse>(
            r#"
            INSERT INTO staff_attendance (id, staff_id, attendance_date, status, check_in, check_out)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.staff_id)
        .bind(request.attendance_date)
        .bind(request.status)
        .bind(request.check_in)
        .bind(request.check_out)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(record)
    }

    #[instrument(skip(self), fields(record_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let record = sqlx::query_as::<_, StaffAttendanceDBResponse>("SELECT * FROM staff_attendance WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(record)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let records = sqlx::query_as::<_, StaffAttendanceDBResponse>(
            r#"
            SELECT * FROM staff_attendance
            WHERE ($1::uuid IS NULL OR staff_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR attendance_date >= $3)
              AND ($4::date IS NULL OR attendance_date <= $4)
            ORDER BY attendance_date DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.staff_id)
        .bind(filter.status)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(records)
    }

    #[instrument(skip(self), fields(record_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM staff_attendance WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(record_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let record = sqlx::query_as::<_, StaffAttendanceDBResponse>(
            r#"
            UPDATE staff_attendance SET
                status = COALESCE($2, status),
                check_in = COALESCE($3, check_in),
                check_out = COALESCE($4, check_out)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.check_in)
        .bind(request.check_out)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(record)
    }
}

impl<'c> StaffAttendance<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::handlers::academics::{AcademicYears, Classes, Enrollments};
    use crate::db::handlers::people::Students;
    use crate::db::models::academics::{AcademicYearCreateDBRequest, ClassCreateDBRequest, EnrollmentCreateDBRequest};
    use crate::db::models::people::StudentCreateDBRequest;
    use sqlx::PgPool;

    #[test]
    fn percentage_of_eight_present_in_ten_marked_days() {
        assert_eq!(attendance_percentage(8, 10).to_string(), "80.00");
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        // 2/3 -> 66.666... -> 66.67
        assert_eq!(attendance_percentage(2, 3).to_string(), "66.67");
        // 1/3 -> 33.333... -> 33.33
        assert_eq!(attendance_percentage(1, 3).to_string(), "33.33");
    }

    #[test]
    fn percentage_with_no_marked_days_is_zero() {
        assert_eq!(attendance_percentage(0, 0), Decimal::ZERO);
    }

    async fn seed_enrolled_student(conn: &mut PgConnection, admission_number: &str) -> (StudentId, ClassId) {
        let year = AcademicYears::new(conn)
            .create(&AcademicYearCreateDBRequest {
                year_name: format!("Y-{admission_number}"),
                start_date: "2025-09-01".parse().unwrap(),
                end_date: "2026-07-15".parse().unwrap(),
                is_current: false,
            })
            .await
            .unwrap();

        let class = Classes::new(conn)
            .create(&ClassCreateDBRequest {
                class_name: "Form 2B".to_string(),
                academic_year_id: year.id,
                class_teacher_id: None,
                capacity: 40,
                room_number: String::new(),
            })
            .await
            .unwrap();

        let student = Students::new(conn)
            .create(&StudentCreateDBRequest {
                user_id: None,
                parent_id: None,
                admission_number: admission_number.to_string(),
                first_name: "Mark".to_string(),
                last_name: "Mwangi".to_string(),
                date_of_birth: None,
                gender: None,
                admission_date: None,
                address: String::new(),
            })
            .await
            .unwrap();

        Enrollments::new(conn)
            .create(&EnrollmentCreateDBRequest {
                student_id: student.id,
                class_id: class.id,
                roll_number: Some(1),
            })
            .await
            .unwrap();

        (student.id, class.id)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_duplicate_day_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (student_id, class_id) = seed_enrolled_student(&mut conn, "ADM-300").await;

        let mut repo = Attendance::new(&mut conn);
        let request = AttendanceCreateDBRequest {
            student_id,
            class_id,
            attendance_date: "2025-09-10".parse().unwrap(),
            status: AttendanceStatus::Present,
            remarks: String::new(),
            marked_by: None,
        };

        repo.create(&request).await.unwrap();
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_counts_exclude_unmarked_days(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (student_id, class_id) = seed_enrolled_student(&mut conn, "ADM-301").await;

        let mut repo = Attendance::new(&mut conn);
        let days: [(&str, AttendanceStatus); 4] = [
            ("2025-09-08", AttendanceStatus::Present),
            ("2025-09-09", AttendanceStatus::Present),
            ("2025-09-10", AttendanceStatus::Absent),
            ("2025-09-11", AttendanceStatus::Late),
        ];
        for (date, status) in days {
            repo.create(&AttendanceCreateDBRequest {
                student_id,
                class_id,
                attendance_date: date.parse().unwrap(),
                status,
                remarks: String::new(),
                marked_by: None,
            })
            .await
            .unwrap();
        }

        // The range spans a month but only 4 days were marked
        let counts = repo
            .counts_for_student(student_id, "2025-09-01".parse().unwrap(), "2025-09-30".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(counts.total_days, 4);
        assert_eq!(counts.present_days, 2);
        assert_eq!(counts.absent_days, 1);
        assert_eq!(counts.late_days, 1);
        assert_eq!(counts.excused_days, 0);
        assert_eq!(attendance_percentage(counts.present_days, counts.total_days).to_string(), "50.00");
    }
}
