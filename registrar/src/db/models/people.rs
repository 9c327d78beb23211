//! Database models for students, parents and staff.

use crate::api::models::people::{Gender, StaffType, StudentStatus};
use crate::types::{ParentId, StaffId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct StudentCreateDBRequest {
    pub user_id: Option<UserId>,
    pub parent_id: Option<ParentId>,
    pub admission_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub admission_date: Option<NaiveDate>,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub status: Option<StudentStatus>,
    pub address: Option<String>,
    pub parent_id: Option<ParentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentDBResponse {
    pub id: StudentId,
    pub user_id: Option<UserId>,
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

impl StudentDBResponse {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct ParentCreateDBRequest {
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParentUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParentDBResponse {
    pub id: ParentId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StaffCreateDBRequest {
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
}

#[derive(Debug, Clone, Default)]
pub struct StaffUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub health_info: Option<String>,
    pub specialization: Option<String>,
    pub employment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffDBResponse {
    pub id: StaffId,
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
