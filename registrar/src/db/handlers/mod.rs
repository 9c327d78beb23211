//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection`, provides strongly-typed CRUD
//! plus the domain queries of its area, and returns models from
//! [`crate::db::models`]. Create repositories from a transaction whenever a
//! handler writes more than one row.
//!
//! ```ignore
//! use registrar::db::handlers::{Repository, Students};
//!
//! let mut tx = pool.begin().await?;
//! let mut repo = Students::new(&mut tx);
//! let student = repo.create(&request).await?;
//! tx.commit().await?;
//! ```

pub mod academics;
pub mod attendance;
pub mod finance;
pub mod grades;
pub mod payroll;
pub mod people;
pub mod repository;
pub mod timetable;
pub mod users;

pub use academics::{AcademicYears, Classes, Enrollments, SubjectAssignments, Subjects};
pub use attendance::{Attendance, StaffAttendance};
pub use finance::{Expenditures, FeeStructures, Invoices, Payments};
pub use grades::Grades;
pub use payroll::{LeaveRequests, SalaryPayments, SalaryStructures};
pub use people::{Parents, Staff, Students};
pub use repository::Repository;
pub use timetable::{Syllabi, TimetableEntries};
pub use users::Users;
