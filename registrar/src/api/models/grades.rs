//! API request/response models for grading.

use super::pagination::Pagination;
use crate::db::models::grades::GradeDBResponse;
use crate::types::{ClassId, EnrollmentId, GradeId, StudentId, SubjectId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GradeType {
    Assignment,
    Quiz,
    Midterm,
    Final,
    Project,
}

/// Term within an academic year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
pub enum Term {
    #[sqlx(rename = "1")]
    #[serde(rename = "1")]
    One,
    #[sqlx(rename = "2")]
    #[serde(rename = "2")]
    Two,
    #[sqlx(rename = "3")]
    #[serde(rename = "3")]
    Three,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GradeCreate {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub enrollment_id: EnrollmentId,
    #[schema(value_type = String)]
    pub marks: Decimal,
    /// Defaults to 100
    #[schema(value_type = Option<String>)]
    pub max_marks: Option<Decimal>,
    pub grade_type: GradeType,
    pub exam_date: NaiveDate,
    pub term: Term,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GradeUpdate {
    #[schema(value_type = Option<String>)]
    pub marks: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub max_marks: Option<Decimal>,
    pub grade_type: Option<GradeType>,
    pub exam_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GradeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: GradeId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub enrollment_id: EnrollmentId,
    #[schema(value_type = String)]
    pub marks: Decimal,
    #[schema(value_type = String)]
    pub max_marks: Decimal,
    pub grade_type: GradeType,
    pub exam_date: NaiveDate,
    pub term: Term,
    pub remarks: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub entered_by: Option<UserId>,
    #[schema(value_type = String)]
    pub percentage: Decimal,
    pub letter_grade: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GradeDBResponse> for GradeResponse {
    fn from(db: GradeDBResponse) -> Self {
        let percentage = db.percentage();
        let letter_grade = db.letter_grade().to_string();
        Self {
            id: db.id,
            student_id: db.student_id,
            subject_id: db.subject_id,
            enrollment_id: db.enrollment_id,
            marks: db.marks,
            max_marks: db.max_marks,
            grade_type: db.grade_type,
            exam_date: db.exam_date,
            term: db.term,
            remarks: db.remarks,
            entered_by: db.entered_by,
            percentage,
            letter_grade,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListGradesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub enrollment_id: Option<EnrollmentId>,
    pub term: Option<Term>,
    pub grade_type: Option<GradeType>,
}

/// Bulk grade entry; best-effort, per-item failures are reported back.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkGradesRequest {
    pub grades: Vec<GradeCreate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkGradesReport {
    pub created: Vec<GradeResponse>,
    pub errors: Vec<BulkGradeError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkGradeError {
    /// Position of the failed entry in the submitted array
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct StudentReportQuery {
    #[param(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub term: Term,
}

/// Per-student term report: every grade plus the aggregate line.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentReportResponse {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub term: Term,
    pub grades: Vec<GradeResponse>,
    #[schema(value_type = String)]
    pub total_marks: Decimal,
    #[schema(value_type = String)]
    pub total_max_marks: Decimal,
    #[schema(value_type = String)]
    pub overall_percentage: Decimal,
    pub overall_letter_grade: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ClassReportQuery {
    #[param(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[param(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    pub term: Term,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassReportResponse {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    pub term: Term,
    pub total_students: usize,
    #[schema(value_type = String)]
    pub average_percentage: Decimal,
    pub highest: Option<ClassReportExtreme>,
    pub lowest: Option<ClassReportExtreme>,
    pub grades: Vec<GradeResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassReportExtreme {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String)]
    pub marks: Decimal,
    #[schema(value_type = String)]
    pub percentage: Decimal,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SubjectStatisticsQuery {
    #[param(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    pub term: Term,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectStatisticsResponse {
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    pub term: Term,
    pub total_entries: usize,
    #[schema(value_type = String)]
    pub average_marks: Decimal,
    /// Entries per letter grade, keyed A+ through F
    pub grade_distribution: GradeDistribution,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct GradeDistribution {
    #[serde(rename = "A+")]
    pub a_plus: usize,
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "C")]
    pub c: usize,
    #[serde(rename = "D")]
    pub d: usize,
    #[serde(rename = "F")]
    pub f: usize,
}

impl GradeDistribution {
    pub fn record(&mut self, letter: &str) {
        match letter {
            "A+" => self.a_plus += 1,
            "A" => self.a += 1,
            "B" => self.b += 1,
            "C" => self.c += 1,
            "D" => self.d += 1,
            _ => self.f += 1,
        }
    }
}
