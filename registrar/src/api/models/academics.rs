//! API request/response models for academic structure: years, subjects,
//! classes, enrollments and subject assignments.

use super::pagination::Pagination;
use crate::db::models::academics::{
    AcademicYearDBResponse, ClassDBResponse, EnrollmentDBResponse, SubjectAssignmentDBResponse, SubjectDBResponse,
};
use crate::types::{AcademicYearId, ClassId, EnrollmentId, StaffId, StudentId, SubjectAssignmentId, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Withdrawn,
}

// ---------------------------------------------------------------------------
// Academic years

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcademicYearCreate {
    /// e.g. "2025/26"
    pub year_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcademicYearUpdate {
    pub year_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcademicYearResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AcademicYearId,
    pub year_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

impl From<AcademicYearDBResponse> for AcademicYearResponse {
    fn from(db: AcademicYearDBResponse) -> Self {
        Self {
            id: db.id,
            year_name: db.year_name,
            start_date: db.start_date,
            end_date: db.end_date,
            is_current: db.is_current,
        }
    }
}

// ---------------------------------------------------------------------------
// Subjects

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubjectCreate {
    pub subject_name: String,
    pub subject_code: String,
    #[serde(default)]
    pub grade_level: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubjectUpdate {
    pub subject_name: Option<String>,
    pub grade_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub grade_level: String,
}

impl From<SubjectDBResponse> for SubjectResponse {
    fn from(db: SubjectDBResponse) -> Self {
        Self {
            id: db.id,
            subject_name: db.subject_name,
            subject_code: db.subject_code,
            grade_level: db.grade_level,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListSubjectsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match over subject name and code
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Classes

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassCreate {
    pub class_name: String,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub class_teacher_id: Option<StaffId>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub room_number: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassUpdate {
    pub class_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub class_teacher_id: Option<StaffId>,
    pub capacity: Option<i32>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ClassId,
    pub class_name: String,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub class_teacher_id: Option<StaffId>,
    pub capacity: i32,
    pub room_number: String,
}

impl From<ClassDBResponse> for ClassResponse {
    fn from(db: ClassDBResponse) -> Self {
        Self {
            id: db.id,
            class_name: db.class_name,
            academic_year_id: db.academic_year_id,
            class_teacher_id: db.class_teacher_id,
            capacity: db.capacity,
            room_number: db.room_number,
        }
    }
}

/// Class detail with its enrollments and subject assignments resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassDetailResponse {
    #[serde(flatten)]
    pub class: ClassResponse,
    pub enrollments: Vec<EnrollmentResponse>,
    pub subject_assignments: Vec<SubjectAssignmentResponse>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListClassesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by academic year
    pub academic_year_id: Option<AcademicYearId>,

    /// Case-insensitive substring match over the class name
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Enrollments

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollmentCreate {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub roll_number: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollmentUpdate {
    pub status: Option<EnrollmentStatus>,
    pub roll_number: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EnrollmentId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub roll_number: Option<i32>,
}

impl From<EnrollmentDBResponse> for EnrollmentResponse {
    fn from(db: EnrollmentDBResponse) -> Self {
        Self {
            id: db.id,
            student_id: db.student_id,
            class_id: db.class_id,
            enrollment_date: db.enrollment_date,
            status: db.status,
            roll_number: db.roll_number,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListEnrollmentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub student_id: Option<StudentId>,
    pub class_id: Option<ClassId>,
    pub status: Option<EnrollmentStatus>,
}

// ---------------------------------------------------------------------------
// Subject assignments

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubjectAssignmentCreate {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub teacher_id: Option<StaffId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubjectAssignmentUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub teacher_id: Option<StaffId>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectAssignmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubjectAssignmentId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub teacher_id: Option<StaffId>,
}

impl From<SubjectAssignmentDBResponse> for SubjectAssignmentResponse {
    fn from(db: SubjectAssignmentDBResponse) -> Self {
        Self {
            id: db.id,
            class_id: db.class_id,
            subject_id: db.subject_id,
            teacher_id: db.teacher_id,
        }
    }
}
