//! Database models for timetable entries and syllabi, including the interval
//! overlap test behind the conflict check.

use crate::api::models::timetable::Weekday;
use crate::types::{ClassId, StaffId, SubjectId, SyllabusId, TimetableEntryId};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Strict [start, end) interval intersection: `a.start < b.end && b.start < a.end`.
/// Back-to-back slots sharing a boundary do not overlap.
pub fn intervals_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Clone)]
pub struct TimetableEntryCreateDBRequest {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct TimetableEntryUpdateDBRequest {
    pub subject_id: Option<SubjectId>,
    pub teacher_id: Option<StaffId>,
    pub day_of_week: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimetableEntryDBResponse {
    pub id: TimetableEntryId,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: StaffId,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_number: String,
}

#[derive(Debug, Clone)]
pub struct SyllabusCreateDBRequest {
    pub subject_id: SubjectId,
    pub teacher_id: StaffId,
    pub week_number: i32,
    pub topic_title: String,
    pub content_summary: String,
    pub learning_objectives: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyllabusUpdateDBRequest {
    pub week_number: Option<i32>,
    pub topic_title: Option<String>,
    pub content_summary: Option<String>,
    pub learning_objectives: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyllabusDBResponse {
    pub id: SyllabusId,
    pub subject_id: SubjectId,
    pub teacher_id: StaffId,
    pub week_number: i32,
    pub topic_title: String,
    pub content_summary: String,
    pub learning_objectives: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn overlapping_intervals_intersect() {
        assert!(intervals_overlap(t(9, 0), t(10, 0), t(9, 30), t(10, 30)));
        assert!(intervals_overlap(t(9, 30), t(10, 30), t(9, 0), t(10, 0)));
        // Containment counts as overlap
        assert!(intervals_overlap(t(9, 0), t(12, 0), t(10, 0), t(11, 0)));
    }

    #[test]
    fn back_to_back_intervals_do_not_intersect() {
        assert!(!intervals_overlap(t(9, 0), t(10, 0), t(10, 0), t(11, 0)));
        assert!(!intervals_overlap(t(10, 0), t(11, 0), t(9, 0), t(10, 0)));
    }

    #[test]
    fn disjoint_intervals_do_not_intersect() {
        assert!(!intervals_overlap(t(8, 0), t(9, 0), t(11, 0), t(12, 0)));
    }
}
