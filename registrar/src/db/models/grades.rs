//! Database models for grades, including the percentage and letter-grade
//! derivations.

use crate::api::models::grades::{GradeType, Term};
use crate::types::{EnrollmentId, GradeId, StudentId, SubjectId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Letter grade for a percentage: 90/80/70/60/50 thresholds, >= comparison.
pub fn letter_grade(percentage: Decimal) -> &'static str {
    if percentage >= Decimal::new(90, 0) {
        "A+"
    } else if percentage >= Decimal::new(80, 0) {
        "A"
    } else if percentage >= Decimal::new(70, 0) {
        "B"
    } else if percentage >= Decimal::new(60, 0) {
        "C"
    } else if percentage >= Decimal::new(50, 0) {
        "D"
    } else {
        "F"
    }
}

/// marks / max_marks * 100; zero when max_marks is zero.
pub fn percentage(marks: Decimal, max_marks: Decimal) -> Decimal {
    if max_marks > Decimal::ZERO {
        (marks * Decimal::ONE_HUNDRED / max_marks).round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    }
}

#[derive(Debug, Clone)]
pub struct GradeCreateDBRequest {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub enrollment_id: EnrollmentId,
    pub marks: Decimal,
    pub max_marks: Decimal,
    pub grade_type: GradeType,
    pub exam_date: NaiveDate,
    pub term: Term,
    pub remarks: String,
    pub entered_by: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct GradeUpdateDBRequest {
    pub marks: Option<Decimal>,
    pub max_marks: Option<Decimal>,
    pub grade_type: Option<GradeType>,
    pub exam_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeDBResponse {
    pub id: GradeId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub enrollment_id: EnrollmentId,
    pub marks: Decimal,
    pub max_marks: Decimal,
    pub grade_type: GradeType,
    pub exam_date: NaiveDate,
    pub term: Term,
    pub remarks: String,
    pub entered_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradeDBResponse {
    pub fn percentage(&self) -> Decimal {
        percentage(self.marks, self.max_marks)
    }

    pub fn letter_grade(&self) -> &'static str {
        letter_grade(self.percentage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_grade_thresholds() {
        assert_eq!(letter_grade(Decimal::new(100, 0)), "A+");
        assert_eq!(letter_grade(Decimal::new(90, 0)), "A+");
        assert_eq!(letter_grade(Decimal::new(899, 1)), "A"); // 89.9
        assert_eq!(letter_grade(Decimal::new(850, 1)), "A"); // 85.0
        assert_eq!(letter_grade(Decimal::new(80, 0)), "A");
        assert_eq!(letter_grade(Decimal::new(79, 0)), "B");
        assert_eq!(letter_grade(Decimal::new(70, 0)), "B");
        assert_eq!(letter_grade(Decimal::new(60, 0)), "C");
        assert_eq!(letter_grade(Decimal::new(50, 0)), "D");
        assert_eq!(letter_grade(Decimal::new(499, 1)), "F"); // 49.9
        assert_eq!(letter_grade(Decimal::ZERO), "F");
    }

    #[test]
    fn percentage_derivation() {
        assert_eq!(percentage(Decimal::new(45, 0), Decimal::new(50, 0)).to_string(), "90.00");
        assert_eq!(percentage(Decimal::new(1, 0), Decimal::new(3, 0)).to_string(), "33.33");
        // A zero-mark grade scale yields zero instead of dividing by zero
        assert_eq!(percentage(Decimal::new(10, 0), Decimal::ZERO), Decimal::ZERO);
    }
}
