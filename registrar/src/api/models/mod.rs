//! API request and response data models.
//!
//! These structures define the public API contract: serde for
//! (de)serialization, `utoipa` annotations for the OpenAPI document. They are
//! deliberately separate from the database models in [`crate::db::models`].
//!
//! - [`auth`]: Login, registration and password management payloads
//! - [`users`]: Accounts, roles, the authenticated caller
//! - [`people`]: Students, parents, staff
//! - [`academics`]: Years, subjects, classes, enrollments, assignments
//! - [`attendance`]: Daily records, bulk marking, reports, defaulters
//! - [`grades`]: Marks entry, bulk entry, report aggregates
//! - [`finance`]: Fee structures, invoices, payments, expenditures
//! - [`payroll`]: Salary structures, payment runs, leave requests
//! - [`timetable`]: Weekly slots, conflict checks, syllabi
//! - [`pagination`]: Shared skip/limit query parameters

pub mod academics;
pub mod attendance;
pub mod auth;
pub mod finance;
pub mod grades;
pub mod pagination;
pub mod payroll;
pub mod people;
pub mod timetable;
pub mod users;
