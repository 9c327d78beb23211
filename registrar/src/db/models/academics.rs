//! Database models for academic structure.

use crate::api::models::academics::EnrollmentStatus;
use crate::types::{AcademicYearId, ClassId, EnrollmentId, StaffId, StudentId, SubjectAssignmentId, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct AcademicYearCreateDBRequest {
    pub year_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AcademicYearUpdateDBRequest {
    pub year_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AcademicYearDBResponse {
    pub id: AcademicYearId,
    pub year_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone)]
pub struct SubjectCreateDBRequest {
    pub subject_name: String,
    pub subject_code: String,
    pub grade_level: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectUpdateDBRequest {
    pub subject_name: Option<String>,
    pub grade_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubjectDBResponse {
    pub id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub grade_level: String,
}

#[derive(Debug, Clone)]
pub struct ClassCreateDBRequest {
    pub class_name: String,
    pub academic_year_id: AcademicYearId,
    pub class_teacher_id: Option<StaffId>,
    pub capacity: i32,
    pub room_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClassUpdateDBRequest {
    pub class_name: Option<String>,
    pub class_teacher_id: Option<StaffId>,
    pub capacity: Option<i32>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassDBResponse {
    pub id: ClassId,
    pub class_name: String,
    pub academic_year_id: AcademicYearId,
    pub class_teacher_id: Option<StaffId>,
    pub capacity: i32,
    pub room_number: String,
}

#[derive(Debug, Clone)]
pub struct EnrollmentCreateDBRequest {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub roll_number: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct EnrollmentUpdateDBRequest {
    pub status: Option<EnrollmentStatus>,
    pub roll_number: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentDBResponse {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub roll_number: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct SubjectAssignmentCreateDBRequest {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: Option<StaffId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubjectAssignmentDBResponse {
    pub id: SubjectAssignmentId,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: Option<StaffId>,
}
