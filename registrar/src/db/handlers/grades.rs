//! Database repository for grades and the report queries over them.

use crate::api::models::grades::{GradeType, Term};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::grades::{GradeCreateDBRequest, GradeDBResponse, GradeUpdateDBRequest},
};
use crate::types::{ClassId, EnrollmentId, GradeId, StudentId, SubjectId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing grades
#[derive(Debug, Clone, Default)]
pub struct GradeFilter {
    pub skip: i64,
    pub limit: i64,
    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub enrollment_id: Option<EnrollmentId>,
    pub term: Option<Term>,
    pub grade_type: Option<GradeType>,
}

impl GradeFilter {
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

    pub fn with_subject(mut self, subject_id: Option<SubjectId>) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn with_enrollment(mut self, enrollment_id: Option<EnrollmentId>) -> Self {
        self.enrollment_id = enrollment_id;
        self
    }

    pub fn with_term(mut self, term: Option<Term>) -> Self {
        self.term = term;
        self
    }

    pub fn with_grade_type(mut self, grade_type: Option<GradeType>) -> Self {
        self.grade_type = grade_type;
        self
    }
}

pub struct Grades<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Grades<'c> {
    type CreateRequest = GradeCreateDBRequest;
    type UpdateRequest = GradeUpdateDBRequest;
    type Response = GradeDBResponse;
    type Id = GradeId;
    type Filter = GradeFilter;

    #[instrument(skip(self, request), fields(student_id = %abbrev_uuid(&request.student_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let grade = sqlx::query_as::<_, GradeDBResponse>(
            r#"
            INSERT INTO grades (id, student_id, subject_id, enrollment_id, marks, max_marks,
                                grade_type, exam_date, term, remarks, entered_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.student_id)
        .bind(request.subject_id)
        .bind(request.enrollment_id)
        .bind(request.marks)
        .bind(request.max_marks)
        .bind(request.grade_type)
        .bind(request.exam_date)
        .bind(request.term)
        .bind(&request.remarks)
        .bind(request.entered_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(grade)
    }

    #[instrument(skip(self), fields(grade_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let grade = sqlx::query_as::<_, GradeDBResponse>("SELECT * FROM grades WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(grade)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let grades = sqlx::query_as::<_, GradeDBResponse>(
            r#"
            SELECT * FROM grades
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::uuid IS NULL OR subject_id = $2)
              AND ($3::uuid IS NULL OR enrollment_id = $3)
              AND ($4::text IS NULL OR term = $4)
              AND ($5::text IS NULL OR grade_type = $5)
            ORDER BY exam_date DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.subject_id)
        .bind(filter.enrollment_id)
        .bind(filter.term)
        .bind(filter.grade_type)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(grades)
    }

    #[instrument(skip(self), fields(grade_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(grade_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let grade = sqlx::query_as::<_, GradeDBResponse>(
            r#"
            UPDATE grades SET
                marks = COALESCE($2, marks),
                max_marks = COALESCE($3, max_marks),
                grade_type = COALESCE($4, grade_type),
                exam_date = COALESCE($5, exam_date),
                remarks = COALESCE($6, remarks),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.marks)
        .bind(request.max_marks)
        .bind(request.grade_type)
        .bind(request.exam_date)
        .bind(&request.remarks)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(grade)
    }
}

impl<'c> Grades<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// All grades of one student for a term, newest exam first.
    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn list_for_student_term(&mut self, student_id: StudentId, term: Term) -> Result<Vec<GradeDBResponse>> {
        let grades = sqlx::query_as::<_, GradeDBResponse>(
            "SELECT * FROM grades WHERE student_id = $1 AND term = $2 ORDER BY exam_date DESC",
        )
        .bind(student_id)
        .bind(term)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(grades)
    }

    /// Grades for one subject across a class's active enrollments in a term.
    #[instrument(skip(self), fields(class_id = %abbrev_uuid(&class_id), subject_id = %abbrev_uuid(&subject_id)), err)]
    pub async fn list_for_class_subject_term(
        &mut self,
        class_id: ClassId,
        subject_id: SubjectId,
        term: Term,
    ) -> Result<Vec<GradeDBResponse>> {
        let grades = sqlx::query_as::<_, GradeDBResponse>(
            r#"
            SELECT g.* FROM grades g
            JOIN enrollments e ON e.id = g.enrollment_id
            WHERE e.class_id = $1 AND e.status = 'active' AND g.subject_id = $2 AND g.term = $3
            ORDER BY g.marks DESC
            "#,
        )
        .bind(class_id)
        .bind(subject_id)
        .bind(term)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(grades)
    }

    /// All grades for a subject in a term, across every class.
    #[instrument(skip(self), fields(subject_id = %abbrev_uuid(&subject_id)), err)]
    pub async fn list_for_subject_term(&mut self, subject_id: SubjectId, term: Term) -> Result<Vec<GradeDBResponse>> {
        let grades = sqlx::query_as::<_, GradeDBResponse>("SELECT * FROM grades WHERE subject_id = $1 AND term = $2")
            .bind(subject_id)
            .bind(term)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(grades)
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
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    struct Fixture {
        student_id: StudentId,
        subject_id: SubjectId,
        enrollment_id: EnrollmentId,
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

        let class = Classes::new(conn)
            .create(&ClassCreateDBRequest {
                class_name: "Form 3C".to_string(),
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
                admission_number: "ADM-400".to_string(),
                first_name: "Nia".to_string(),
                last_name: "Okoye".to_string(),
                date_of_birth: None,
                gender: None,
                admission_date: None,
                address: String::new(),
            })
            .await
            .unwrap();

        let enrollment = Enrollments::new(conn)
            .create(&EnrollmentCreateDBRequest {
                student_id: student.id,
                class_id: class.id,
                roll_number: Some(7),
            })
            .await
            .unwrap();

        let subject = crate::db::handlers::academics::Subjects::new(conn)
            .create(&crate::db::models::academics::SubjectCreateDBRequest {
                subject_name: "Physics".to_string(),
                subject_code: "PHY".to_string(),
                grade_level: String::new(),
            })
            .await
            .unwrap();

        Fixture {
            student_id: student.id,
            subject_id: subject.id,
            enrollment_id: enrollment.id,
        }
    }

    fn grade_create(f: &Fixture, marks: i64, max_marks: i64) -> GradeCreateDBRequest {
        GradeCreateDBRequest {
            student_id: f.student_id,
            subject_id: f.subject_id,
            enrollment_id: f.enrollment_id,
            marks: Decimal::new(marks, 0),
            max_marks: Decimal::new(max_marks, 0),
            grade_type: GradeType::Quiz,
            exam_date: "2025-10-01".parse().unwrap(),
            term: Term::One,
            remarks: String::new(),
            entered_by: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_marks_above_max_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let mut repo = Grades::new(&mut conn);
        let err = repo.create(&grade_create(&fixture, 110, 100)).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        let err = repo
            .create(&GradeCreateDBRequest {
                marks: Decimal::new(-1, 0),
                ..grade_create(&fixture, 0, 100)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_grade_derivations_round_trip(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let mut repo = Grades::new(&mut conn);
        let grade = repo.create(&grade_create(&fixture, 85, 100)).await.unwrap();

        assert_eq!(grade.percentage().to_string(), "85.00");
        assert_eq!(grade.letter_grade(), "A");
        assert_eq!(grade.term, Term::One);

        let listed = repo.list_for_student_term(fixture.student_id, Term::One).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, grade.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_deleting_student_cascades_to_grades(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let fixture = seed(&mut conn).await;

        let grade = Grades::new(&mut conn).create(&grade_create(&fixture, 70, 100)).await.unwrap();

        assert!(Students::new(&mut conn).delete(fixture.student_id).await.unwrap());

        let gone = Grades::new(&mut conn).get_by_id(grade.id).await.unwrap();
        assert!(gone.is_none());
    }
}
