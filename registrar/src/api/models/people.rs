//! API request/response models for students, parents and staff.

use super::pagination::Pagination;
use crate::db::models::people::{ParentDBResponse, StaffDBResponse, StudentDBResponse};
use crate::types::{ParentId, StaffId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Graduated,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffType {
    Teaching,
    NonTeaching,
}

// ---------------------------------------------------------------------------
// Students

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentCreate {
    pub admission_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub admission_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    /// Existing parent to link, mutually exclusive with `parent`
    pub parent_id: Option<ParentId>,
    /// Inline parent record, created in the same transaction
    pub parent: Option<ParentCreate>,
    /// Class to enroll the student into on registration
    pub class_id: Option<crate::types::ClassId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub status: Option<StudentStatus>,
    pub address: Option<String>,
    pub parent_id: Option<ParentId>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StudentId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub parent_id: Option<ParentId>,
    pub admission_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub status: StudentStatus,
    pub admission_date: Option<NaiveDate>,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StudentDBResponse> for StudentResponse {
    fn from(db: StudentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            parent_id: db.parent_id,
            admission_number: db.admission_number,
            first_name: db.first_name,
            last_name: db.last_name,
            date_of_birth: db.date_of_birth,
            gender: db.gender,
            status: db.status,
            admission_date: db.admission_date,
            address: db.address,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListStudentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by status
    pub status: Option<StudentStatus>,

    /// Case-insensitive substring match over names and admission number
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: crate::types::ClassId,
}

// ---------------------------------------------------------------------------
// Parents

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ParentCreate {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ParentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ParentId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParentDBResponse> for ParentResponse {
    fn from(db: ParentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            first_name: db.first_name,
            last_name: db.last_name,
            phone_number: db.phone_number,
            email: db.email,
            address: db.address,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListParentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match over names, phone and email
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Staff

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StaffCreate {
    pub first_name: String,
    pub last_name: String,
    pub staff_type: StaffType,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub health_info: String,
    #[serde(default)]
    pub specialization: String,
    pub employment_date: Option<NaiveDate>,
    /// Login details; username/email are generated from the name when absent
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Initial salary structure, created in the same transaction
    pub salary: Option<SalaryStructureCreate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SalaryStructureCreate {
    #[schema(value_type = String)]
    pub base_salary: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub housing_allowance: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub transport_allowance: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub other_allowances: Decimal,
    pub effective_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub health_info: Option<String>,
    pub specialization: Option<String>,
    pub employment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StaffId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: String,
    pub health_info: String,
    pub staff_type: StaffType,
    pub specialization: String,
    pub employment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StaffDBResponse> for StaffResponse {
    fn from(db: StaffDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            first_name: db.first_name,
            last_name: db.last_name,
            gender: db.gender,
            date_of_birth: db.date_of_birth,
            address: db.address,
            health_info: db.health_info,
            staff_type: db.staff_type,
            specialization: db.specialization,
            employment_date: db.employment_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Staff creation returns the profile plus the provisioned login details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffCreatedResponse {
    pub staff: StaffResponse,
    pub username: String,
    /// Present only when the password was generated server-side; shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListStaffQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by staff type
    pub staff_type: Option<StaffType>,

    /// Case-insensitive substring match over names and specialization
    pub search: Option<String>,
}
