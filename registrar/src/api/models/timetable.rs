//! API request/response models for the weekly timetable and syllabi.

use super::pagination::Pagination;
use crate::db::models::timetable::{SyllabusDBResponse, TimetableEntryDBResponse};
use crate::types::{ClassId, StaffId, SubjectId, SyllabusId, TimetableEntryId};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// School days; the timetable has no weekend slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];
}

// ---------------------------------------------------------------------------
// Timetable entries

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TimetableEntryCreate {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub room_number: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TimetableEntryUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subject_id: Option<SubjectId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub teacher_id: Option<StaffId>,
    pub day_of_week: Option<Weekday>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimetableEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TimetableEntryId,
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    #[schema(value_type = String)]
    pub start_time: NaiveTime,
    #[schema(value_type = String)]
    pub end_time: NaiveTime,
    pub room_number: String,
}

impl From<TimetableEntryDBResponse> for TimetableEntryResponse {
    fn from(db: TimetableEntryDBResponse) -> Self {
        Self {
            id: db.id,
            class_id: db.class_id,
            subject_id: db.subject_id,
            teacher_id: db.teacher_id,
            day_of_week: db.day_of_week,
            start_time: db.start_time,
            end_time: db.end_time,
            room_number: db.room_number,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListTimetableQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub class_id: Option<ClassId>,
    pub teacher_id: Option<StaffId>,
    pub day_of_week: Option<Weekday>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ClassScheduleQuery {
    #[param(value_type = String, format = "uuid")]
    pub class_id: ClassId,
}

/// One weekday's entries in start-time order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySchedule {
    pub day_of_week: Weekday,
    pub entries: Vec<TimetableEntryResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassScheduleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    pub days: Vec<DaySchedule>,
}

/// Advisory pre-save check for a candidate slot. Nothing is persisted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConflictCheckRequest {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
    /// Entry being edited, excluded from the comparison
    #[schema(value_type = Option<String>, format = "uuid")]
    pub exclude_entry_id: Option<TimetableEntryId>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConflictCheckResponse {
    pub has_conflicts: bool,
    /// Existing entries whose interval intersects the candidate on the same
    /// day for the same class or teacher
    pub conflicts: Vec<TimetableEntryResponse>,
}

// ---------------------------------------------------------------------------
// Syllabi

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SyllabusCreate {
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: StaffId,
    pub week_number: i32,
    pub topic_title: String,
    #[serde(default)]
    pub content_summary: String,
    #[serde(default)]
    pub learning_objectives: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SyllabusUpdate {
    pub week_number: Option<i32>,
    pub topic_title: Option<String>,
    pub content_summary: Option<String>,
    pub learning_objectives: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyllabusResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SyllabusId,
    #[schema(value_type = String, format = "uuid")]
    pub subject_id: SubjectId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: StaffId,
    pub week_number: i32,
    pub topic_title: String,
    pub content_summary: String,
    pub learning_objectives: String,
}

impl From<SyllabusDBResponse> for SyllabusResponse {
    fn from(db: SyllabusDBResponse) -> Self {
        Self {
            id: db.id,
            subject_id: db.subject_id,
            teacher_id: db.teacher_id,
            week_number: db.week_number,
            topic_title: db.topic_title,
            content_summary: db.content_summary,
            learning_objectives: db.learning_objectives,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListSyllabiQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub subject_id: Option<SubjectId>,
    pub teacher_id: Option<StaffId>,
}
