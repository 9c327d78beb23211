//! Database repositories for academic structure: years, subjects, classes,
//! enrollments and subject assignments.

use crate::api::models::academics::EnrollmentStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::academics::{
        AcademicYearCreateDBRequest, AcademicYearDBResponse, AcademicYearUpdateDBRequest, ClassCreateDBRequest,
        ClassDBResponse, ClassUpdateDBRequest, EnrollmentCreateDBRequest, EnrollmentDBResponse, EnrollmentUpdateDBRequest,
        SubjectAssignmentCreateDBRequest, SubjectAssignmentDBResponse, SubjectCreateDBRequest, SubjectDBResponse,
        SubjectUpdateDBRequest,
    },
};
use crate::types::{AcademicYearId, ClassId, EnrollmentId, StudentId, SubjectAssignmentId, SubjectId, abbrev_uuid};
use sqlx::{Connection, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Academic years

#[derive(Debug, Clone)]
pub struct AcademicYearFilter {
    pub skip: i64,
    pub limit: i64,
}

impl AcademicYearFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct AcademicYears<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for AcademicYears<'c> {
    type CreateRequest = AcademicYearCreateDBRequest;
    type UpdateRequest = AcademicYearUpdateDBRequest;
    type Response = AcademicYearDBResponse;
    type Id = AcademicYearId;
    type Filter = AcademicYearFilter;

    #[instrument(skip(self, request), fields(year_name = %request.year_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Only one year may be current at a time
        let mut tx = self.db.begin().await?;

        if request.is_current {
            sqlx::query("UPDATE academic_years SET is_current = FALSE WHERE is_current")
                .execute(&mut *tx)
                .await?;
        }

        let year = sqlx::query_as::<_, AcademicYearDBResponse>(
            r#"
            INSERT INTO academic_years (id, year_name, start_date, end_date, is_current)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.year_name)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.is_current)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(year)
    }

    #[instrument(skip(self), fields(year_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let year = sqlx::query_as::<_, AcademicYearDBResponse>("SELECT * FROM academic_years WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(year)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let years = sqlx::query_as::<_, AcademicYearDBResponse>(
            "SELECT * FROM academic_years ORDER BY start_date DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(years)
    }

    #[instrument(skip(self), fields(year_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM academic_years WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(year_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        if request.is_current == Some(true) {
            sqlx::query("UPDATE academic_years SET is_current = FALSE WHERE is_current AND id != $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let year = sqlx::query_as::<_, AcademicYearDBResponse>(
            r#"
            UPDATE academic_years SET
                year_name = COALESCE($2, year_name),
                start_date = COALESCE($3, start_date),
                end_date = COALESCE($4, end_date),
                is_current = COALESCE($5, is_current)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.year_name)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.is_current)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        tx.commit().await?;
        Ok(year)
    }
}

impl<'c> AcademicYears<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_current(&mut self) -> Result<Option<AcademicYearDBResponse>> {
        let year = sqlx::query_as::<_, AcademicYearDBResponse>("SELECT * FROM academic_years WHERE is_current")
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(year)
    }
}

// ---------------------------------------------------------------------------
// Subjects

#[derive(Debug, Clone)]
pub struct SubjectFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl SubjectFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Subjects<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Subjects<'c> {
    type CreateRequest = SubjectCreateDBRequest;
    type UpdateRequest = SubjectUpdateDBRequest;
    type Response = SubjectDBResponse;
    type Id = SubjectId;
    type Filter = SubjectFilter;

    #[instrument(skip(self, request), fields(subject_code = %request.subject_code), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subject = sqlx::query_as::<_, SubjectDBResponse>(
            r#"
            INSERT INTO subjects (id, subject_name, subject_code, grade_level)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.subject_name)
        .bind(&request.subject_code)
        .bind(&request.grade_level)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subject)
    }

    #[instrument(skip(self), fields(subject_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let subject = sqlx::query_as::<_, SubjectDBResponse>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(subject)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let subjects = sqlx::query_as::<_, SubjectDBResponse>(
            r#"
            SELECT * FROM subjects
            WHERE ($1::text IS NULL OR subject_name ILIKE '%' || $1 || '%' OR subject_code ILIKE '%' || $1 || '%')
            ORDER BY subject_name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(subjects)
    }

    #[instrument(skip(self), fields(subject_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(subject_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let subject = sqlx::query_as::<_, SubjectDBResponse>(
            r#"
            UPDATE subjects SET
                subject_name = COALESCE($2, subject_name),
                grade_level = COALESCE($3, grade_level)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.subject_name)
        .bind(&request.grade_level)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(subject)
    }
}

impl<'c> Subjects<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

// ---------------------------------------------------------------------------
// Classes

#[derive(Debug, Clone)]
pub struct ClassFilter {
    pub skip: i64,
    pub limit: i64,
    pub academic_year_id: Option<AcademicYearId>,
    pub search: Option<String>,
}

impl ClassFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            academic_year_id: None,
            search: None,
        }
    }

    pub fn with_academic_year(mut self, academic_year_id: Option<AcademicYearId>) -> Self {
        self.academic_year_id = academic_year_id;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Classes<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Classes<'c> {
    type CreateRequest = ClassCreateDBRequest;
    type UpdateRequest = ClassUpdateDBRequest;
    type Response = ClassDBResponse;
    type Id = ClassId;
    type Filter = ClassFilter;

    #[instrument(skip(self, request), fields(class_name = %request.class_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let class = sqlx::query_as::<_, ClassDBResponse>(
            r#"
            INSERT INTO classes (id, class_name, academic_year_id, class_teacher_id, capacity, room_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.class_name)
        .bind(request.academic_year_id)
        .bind(request.class_teacher_id)
        .bind(request.capacity)
        .bind(&request.room_number)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(class)
    }

    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let class = sqlx::query_as::<_, ClassDBResponse>("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(class)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let classes = sqlx::query_as::<_, ClassDBResponse>(
            r#"
            SELECT * FROM classes
            WHERE ($1::uuid IS NULL OR academic_year_id = $1)
              AND ($2::text IS NULL OR class_name ILIKE '%' || $2 || '%')
            ORDER BY class_name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.academic_year_id)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(classes)
    }

    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(class_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let class = sqlx::query_as::<_, ClassDBResponse>(
            r#"
            UPDATE classes SET
                class_name = COALESCE($2, class_name),
                class_teacher_id = COALESCE($3, class_teacher_id),
                capacity = COALESCE($4, capacity),
                room_number = COALESCE($5, room_number)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.class_name)
        .bind(request.class_teacher_id)
        .bind(request.capacity)
        .bind(&request.room_number)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(class)
    }
}

impl<'c> Classes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

// ---------------------------------------------------------------------------
// Enrollments

#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub skip: i64,
    pub limit: i64,
    pub student_id: Option<StudentId>,
    pub class_id: Option<ClassId>,
    pub status: Option<EnrollmentStatus>,
}

impl EnrollmentFilter {
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

    pub fn with_status(mut self, status: Option<EnrollmentStatus>) -> Self {
        self.status = status;
        self
    }
}

pub struct Enrollments<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Enrollments<'c> {
    type CreateRequest = EnrollmentCreateDBRequest;
    type UpdateRequest = EnrollmentUpdateDBRequest;
    type Response = EnrollmentDBResponse;
    type Id = EnrollmentId;
    type Filter = EnrollmentFilter;

    #[instrument(skip(self, request), fields(student_id = %abbrev_uuid(&request.student_id), class_id = %abbrev_uuid(&request.class_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            INSERT INTO enrollments (id, student_id, class_id, roll_number)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.student_id)
        .bind(request.class_id)
        .bind(request.roll_number)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(enrollment)
    }

    #[instrument(skip(self), fields(enrollment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>("SELECT * FROM enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(enrollment)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let enrollments = sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            SELECT * FROM enrollments
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::uuid IS NULL OR class_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY enrollment_date DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.class_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(enrollments)
    }

    #[instrument(skip(self), fields(enrollment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(enrollment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>(
            r#"
            UPDATE enrollments SET
                status = COALESCE($2, status),
                roll_number = COALESCE($3, roll_number)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.roll_number)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(enrollment)
    }
}

impl<'c> Enrollments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The student's currently active enrollment, if any.
    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn get_active_for_student(&mut self, student_id: StudentId) -> Result<Option<EnrollmentDBResponse>> {
        let enrollment = sqlx::query_as::<_, EnrollmentDBResponse>(
            "SELECT * FROM enrollments WHERE student_id = $1 AND status = 'active' ORDER BY enrollment_date DESC LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(enrollment)
    }

    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&class_id)), err)]
    pub async fn list_active_by_class(&mut self, class_id: ClassId) -> Result<Vec<EnrollmentDBResponse>> {
        let enrollments = sqlx::query_as::<_, EnrollmentDBResponse>(
            "SELECT * FROM enrollments WHERE class_id = $1 AND status = 'active' ORDER BY roll_number NULLS LAST",
        )
        .bind(class_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(enrollments)
    }
}

// ---------------------------------------------------------------------------
// Subject assignments

#[derive(Debug, Clone, Default)]
pub struct SubjectAssignmentFilter {
    pub skip: i64,
    pub limit: i64,
    pub class_id: Option<ClassId>,
    pub subject_id: Option<SubjectId>,
}

impl SubjectAssignmentFilter {
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
}

pub struct SubjectAssignments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SubjectAssignments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&mut self, request: &SubjectAssignmentCreateDBRequest) -> Result<SubjectAssignmentDBResponse> {
        let assignment = sqlx::query_as::<_, SubjectAssignmentDBResponse>(
            r#"
            INSERT INTO subject_assignments (id, class_id, subject_id, teacher_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.class_id)
        .bind(request.subject_id)
        .bind(request.teacher_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(assignment)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(&mut self, filter: &SubjectAssignmentFilter) -> Result<Vec<SubjectAssignmentDBResponse>> {
        let assignments = sqlx::query_as::<_, SubjectAssignmentDBResponse>(
            r#"
            SELECT * FROM subject_assignments
            WHERE ($1::uuid IS NULL OR class_id = $1)
              AND ($2::uuid IS NULL OR subject_id = $2)
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.class_id)
        .bind(filter.subject_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(assignments)
    }

    #[instrument(skip(self), fields(assignment_id = %abbrev_uuid(&id)), err)]
    pub async fn set_teacher(
        &mut self,
        id: SubjectAssignmentId,
        teacher_id: Option<crate::types::StaffId>,
    ) -> Result<SubjectAssignmentDBResponse> {
        let assignment = sqlx::query_as::<_, SubjectAssignmentDBResponse>(
            "UPDATE subject_assignments SET teacher_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(teacher_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(assignment)
    }

    #[instrument(skip(self), fields(assignment_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: SubjectAssignmentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subject_assignments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::handlers::people::Students;
    use crate::db::models::people::StudentCreateDBRequest;
    use sqlx::PgPool;

    async fn seed_class(conn: &mut PgConnection) -> (AcademicYearDBResponse, ClassDBResponse) {
        let year = AcademicYears::new(conn)
            .create(&AcademicYearCreateDBRequest {
                year_name: "2025/26".to_string(),
                start_date: "2025-09-01".parse().unwrap(),
                end_date: "2026-07-15".parse().unwrap(),
                is_current: true,
            })
            .await
            .unwrap();

        let class = Classes::new(conn)
            .create(&ClassCreateDBRequest {
                class_name: "Form 1A".to_string(),
                academic_year_id: year.id,
                class_teacher_id: None,
                capacity: 40,
                room_number: "R1".to_string(),
            })
            .await
            .unwrap();

        (year, class)
    }

    async fn seed_student(conn: &mut PgConnection, admission_number: &str) -> crate::db::models::people::StudentDBResponse {
        Students::new(conn)
            .create(&StudentCreateDBRequest {
                user_id: None,
                parent_id: None,
                admission_number: admission_number.to_string(),
                first_name: "Test".to_string(),
                last_name: "Student".to_string(),
                date_of_birth: None,
                gender: None,
                admission_date: None,
                address: String::new(),
            })
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_duplicate_enrollment_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (_year, class) = seed_class(&mut conn).await;
        let student = seed_student(&mut conn, "ADM-100").await;

        let mut repo = Enrollments::new(&mut conn);
        let request = EnrollmentCreateDBRequest {
            student_id: student.id,
            class_id: class.id,
            roll_number: Some(1),
        };

        repo.create(&request).await.unwrap();
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_only_one_current_year(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = AcademicYears::new(&mut conn);

        let first = repo
            .create(&AcademicYearCreateDBRequest {
                year_name: "2024/25".to_string(),
                start_date: "2024-09-01".parse().unwrap(),
                end_date: "2025-07-15".parse().unwrap(),
                is_current: true,
            })
            .await
            .unwrap();

        let second = repo
            .create(&AcademicYearCreateDBRequest {
                year_name: "2025/26".to_string(),
                start_date: "2025-09-01".parse().unwrap(),
                end_date: "2026-07-15".parse().unwrap(),
                is_current: true,
            })
            .await
            .unwrap();

        let current = repo.get_current().await.unwrap().unwrap();
        assert_eq!(current.id, second.id);

        let first_reloaded = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert!(!first_reloaded.is_current);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_deleting_student_cascades_to_enrollment(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (_year, class) = seed_class(&mut conn).await;
        let student = seed_student(&mut conn, "ADM-200").await;

        let enrollment = Enrollments::new(&mut conn)
            .create(&EnrollmentCreateDBRequest {
                student_id: student.id,
                class_id: class.id,
                roll_number: None,
            })
            .await
            .unwrap();

        assert!(Students::new(&mut conn).delete(student.id).await.unwrap());

        let gone = Enrollments::new(&mut conn).get_by_id(enrollment.id).await.unwrap();
        assert!(gone.is_none());
    }
}
