//! Authentication and authorization system.
//!
//! Authentication is JWT-based: `/authentication/login` verifies the password
//! and issues a signed session token, returned both in the response body (for
//! API clients sending `Authorization: Bearer <token>`) and as an HttpOnly
//! cookie (for browser clients). Failed logins feed the per-account lockout
//! counter; locked accounts are rejected before password verification.
//!
//! Authorization is role-based: a fixed permission map in [`permissions`]
//! assigns each role a set of resource/operation pairs, enforced through the
//! [`permissions::RequiresPermission`] extractor.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Permission map and typed permission extractor
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
