//! Database models for attendance records.

use crate::api::models::attendance::{AttendanceStatus, StaffAttendanceStatus};
use crate::types::{AttendanceId, ClassId, StaffAttendanceId, StaffId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct AttendanceCreateDBRequest {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: String,
    pub marked_by: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceUpdateDBRequest {
    pub status: Option<AttendanceStatus>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceDBResponse {
    pub id: AttendanceId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: String,
    pub marked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Per-status day counts for one student over a date range.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceCounts {
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub late_days: i64,
    pub excused_days: i64,
}

/// Aggregate row for the defaulters report, one per enrolled student.
#[derive(Debug, Clone, FromRow)]
pub struct ClassAttendanceCounts {
    pub student_id: StudentId,
    pub admission_number: String,
    pub first_name: String,
    pub last_name: String,
    pub total_days: i64,
    pub present_days: i64,
}

#[derive(Debug, Clone)]
pub struct StaffAttendanceCreateDBRequest {
    pub staff_id: StaffId,
    pub attendance_date: NaiveDate,
    pub status: StaffAttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct StaffAttendanceUpdateDBRequest {
    pub status: Option<StaffAttendanceStatus>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffAttendanceDBResponse {
    pub id: StaffAttendanceId,
    pub staff_id: StaffId,
    pub attendance_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: StaffAttendanceStatus,
}
