//! API request/response models for student and staff attendance.

use super::pagination::Pagination;
use crate::db::models::attendance::{AttendanceDBResponse, StaffAttendanceDBResponse};
use crate::types::{AttendanceId, ClassId, StaffAttendanceId, StaffId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffAttendanceStatus {
    Present,
    Absent,
    OnLeave,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceCreate {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceUpdate {
    pub status: Option<AttendanceStatus>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AttendanceId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub marked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<AttendanceDBResponse> for AttendanceResponse {
    fn from(db: AttendanceDBResponse) -> Self {
        Self {
            id: db.id,
            student_id: db.student_id,
            class_id: db.class_id,
            attendance_date: db.attendance_date,
            status: db.status,
            remarks: db.remarks,
            marked_by: db.marked_by,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListAttendanceQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub student_id: Option<StudentId>,
    pub class_id: Option<ClassId>,
    pub status: Option<AttendanceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One class-day of attendance marked in a single request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkAttendanceRequest {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub records: Vec<BulkAttendanceRecord>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkAttendanceRecord {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: String,
}

/// Best-effort bulk result: successes and per-record failures side by side.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkAttendanceReport {
    pub created: Vec<AttendanceResponse>,
    pub errors: Vec<BulkAttendanceError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkAttendanceError {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceReportQuery {
    #[param(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Per-student attendance rollup over a date range. Days without a record do
/// not count toward the denominator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub late_days: i64,
    pub excused_days: i64,
    /// present_days / total_days * 100, rounded to two decimals
    #[schema(value_type = String)]
    pub attendance_percentage: Decimal,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DefaultersQuery {
    #[param(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Percentage below which a student is reported; defaults from config
    #[param(value_type = Option<String>)]
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DefaulterResponse {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub admission_number: String,
    pub first_name: String,
    pub last_name: String,
    pub total_days: i64,
    pub present_days: i64,
    #[schema(value_type = String)]
    pub attendance_percentage: Decimal,
}

// ---------------------------------------------------------------------------
// Staff attendance

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StaffAttendanceCreate {
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    pub attendance_date: NaiveDate,
    pub status: StaffAttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StaffAttendanceUpdate {
    pub status: Option<StaffAttendanceStatus>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffAttendanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StaffAttendanceId,
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    pub attendance_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: StaffAttendanceStatus,
}

impl From<StaffAttendanceDBResponse> for StaffAttendanceResponse {
    fn from(db: StaffAttendanceDBResponse) -> Self {
        Self {
            id: db.id,
            staff_id: db.staff_id,
            attendance_date: db.attendance_date,
            check_in: db.check_in,
            check_out: db.check_out,
            status: db.status,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListStaffAttendanceQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub staff_id: Option<StaffId>,
    pub status: Option<StaffAttendanceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
