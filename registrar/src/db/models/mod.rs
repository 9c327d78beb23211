//! Database record models matching table schemas.
//!
//! Each model struct corresponds to a table row and derives `sqlx::FromRow`
//! for query results; create/update request structs carry the writable
//! subset. Database models are distinct from API models so storage and API
//! representations can evolve independently.
//!
//! The pure domain derivations live next to the rows they describe: grade
//! percentage and letter thresholds in [`grades`], the salary computation in
//! [`payroll`], the interval overlap test in [`timetable`].

pub mod academics;
pub mod attendance;
pub mod finance;
pub mod grades;
pub mod payroll;
pub mod people;
pub mod timetable;
pub mod users;
