//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response data structures
//!
//! The API is one management surface under `/api/v1/*` plus the
//! authentication endpoints at `/authentication/*`. Every handler is
//! documented with `utoipa` annotations; the aggregate document is served at
//! `/admin/docs`.

pub mod handlers;
pub mod models;
