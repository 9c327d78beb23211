//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Repository Pattern
//!
//! The [`handlers`] module provides repository structs for each entity family.
//! Repositories encapsulate all database access for their tables.
//!
//! # Transactions
//!
//! Repositories work with SQLx connections or transactions. Multi-row writes
//! (invoice + line items, staff + user + salary structure) must be created from
//! a transaction so the rows commit or roll back together:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Students::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory; [`crate::migrator`] runs them at startup.

pub mod errors;
pub mod handlers;
pub mod models;
