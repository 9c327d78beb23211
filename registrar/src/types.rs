//! Common type definitions and permission system types.
//!
//! All entity IDs are UUIDs wrapped in type aliases. The permission system is
//! a fixed lookup from role to a set of [`Resource`]/[`Operation`] pairs,
//! checked by the extractors in [`crate::auth::permissions`].

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type StudentId = Uuid;
pub type ParentId = Uuid;
pub type StaffId = Uuid;
pub type AcademicYearId = Uuid;
pub type SubjectId = Uuid;
pub type ClassId = Uuid;
pub type EnrollmentId = Uuid;
pub type SubjectAssignmentId = Uuid;
pub type AttendanceId = Uuid;
pub type StaffAttendanceId = Uuid;
pub type GradeId = Uuid;
pub type FeeStructureId = Uuid;
pub type InvoiceId = Uuid;
pub type PaymentId = Uuid;
pub type ExpenditureId = Uuid;
pub type SalaryStructureId = Uuid;
pub type SalaryPaymentId = Uuid;
pub type LeaveRequestId = Uuid;
pub type TimetableEntryId = Uuid;
pub type SyllabusId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
// *-All means unrestricted access, *-Own means restricted to own records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    ReadAll,
    ReadOwn,
    UpdateAll,
    DeleteAll,
}

// Resources that can be operated on, one per subsystem surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Students,
    Parents,
    Staff,
    Academic,
    Attendance,
    Grades,
    Finance,
    Expenditures,
    Payroll,
    Timetable,
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Logical combinator: any of the listed permissions suffices
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll => write!(f, "Update"),
            Operation::DeleteAll => write!(f, "Delete"),
        }
    }
}
