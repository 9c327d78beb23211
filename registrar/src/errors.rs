use crate::db::errors::DbError;
use crate::types::{Operation, Permission};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: String,
    },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Conflict error, e.g., for duplicate period invoices
    #[error("Conflict: {message}")]
    Conflict { message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => unique_violation_message(table.as_deref(), constraint.as_deref()).0,
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { constraint, .. } => check_violation_message(constraint.as_deref()),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
            Error::Conflict { message } => message.clone(),
        }
    }
}

/// Map a unique-constraint violation to a user-facing message and the resource it names
fn unique_violation_message(table: Option<&str>, constraint: Option<&str>) -> (String, &'static str) {
    match (table, constraint) {
        (Some("users"), Some(c)) if c.contains("email") => ("An account with this email address already exists".to_string(), "user"),
        (Some("users"), Some(c)) if c.contains("username") => ("This username is already taken".to_string(), "user"),
        (Some("students"), Some(c)) if c.contains("admission_number") => {
            ("A student with this admission number already exists".to_string(), "student")
        }
        (Some("enrollments"), _) => (
            "The student is already enrolled in this class".to_string(),
            "enrollment",
        ),
        (Some("attendance"), _) => (
            "Attendance has already been marked for this student on this date".to_string(),
            "attendance",
        ),
        (Some("staff_attendance"), _) => (
            "Attendance has already been marked for this staff member on this date".to_string(),
            "staff_attendance",
        ),
        (Some("invoices"), Some(c)) if c.contains("period") => (
            "An invoice already exists for this student and term".to_string(),
            "invoice",
        ),
        (Some("invoices"), Some(c)) if c.contains("number") => ("The invoice number is already in use".to_string(), "invoice"),
        (Some("payments"), _) => ("The payment number is already in use".to_string(), "payment"),
        (Some("salary_payments"), _) => (
            "Salary has already been processed for this staff member and period".to_string(),
            "salary_payment",
        ),
        (Some("academic_years"), _) => ("An academic year with this name already exists".to_string(), "academic_year"),
        (Some("subjects"), _) => ("A subject with this code already exists".to_string(), "subject"),
        (Some("subject_assignments"), _) => (
            "This subject is already assigned to the class".to_string(),
            "subject_assignment",
        ),
        _ => ("Resource already exists".to_string(), "unknown"),
    }
}

/// Map a check-constraint violation to the field rule it encodes
fn check_violation_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("grades_marks_within_max") => "marks must be between 0 and max_marks".to_string(),
        Some("timetable_entries_times_ordered") => "start_time must be before end_time".to_string(),
        Some("leave_requests_dates_ordered") => "start_date must not be after end_date".to_string(),
        Some(c) if c.contains("balance") => "balance must stay between 0 and total_amount".to_string(),
        Some(c) if c.contains("amount") => "amount must not be negative".to_string(),
        _ => "Invalid data provided".to_string(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();

        let body = match &self {
            Error::Database(DbError::UniqueViolation { constraint, table, .. }) => {
                let (message, resource) = unique_violation_message(table.as_deref(), constraint.as_deref());
                serde_json::json!({ "message": message, "resource": resource })
            }
            _ => serde_json::json!({ "message": self.user_message() }),
        };

        (status, axum::response::Json(body)).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_map_to_conflict() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: Some("enrollments_student_class_unique".to_string()),
            table: Some("enrollments".to_string()),
            message: "duplicate key".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "The student is already enrolled in this class");
    }

    #[test]
    fn check_violations_name_the_field_rule() {
        let err = Error::Database(DbError::CheckViolation {
            constraint: Some("grades_marks_within_max".to_string()),
            table: Some("grades".to_string()),
            message: "check failed".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "marks must be between 0 and max_marks");
    }

    #[test]
    fn not_found_names_resource_and_id() {
        let err = Error::NotFound {
            resource: "Invoice".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Invoice with ID abc not found");
    }
}
