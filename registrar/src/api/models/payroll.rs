//! API request/response models for payroll and leave requests.

use super::pagination::Pagination;
use crate::db::models::payroll::{LeaveRequestDBResponse, SalaryPaymentDBResponse, SalaryStructureDBResponse};
use crate::types::{LeaveRequestId, SalaryPaymentId, SalaryStructureId, StaffId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SalaryPaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

// ---------------------------------------------------------------------------
// Salary structures

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SalaryStructureCreateRequest {
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
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
    pub effective_from: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SalaryStructureUpdateRequest {
    #[schema(value_type = Option<String>)]
    pub base_salary: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub housing_allowance: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub transport_allowance: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub other_allowances: Option<Decimal>,
    pub effective_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalaryStructureResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SalaryStructureId,
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    #[schema(value_type = String)]
    pub base_salary: Decimal,
    #[schema(value_type = String)]
    pub housing_allowance: Decimal,
    #[schema(value_type = String)]
    pub transport_allowance: Decimal,
    #[schema(value_type = String)]
    pub other_allowances: Decimal,
    pub effective_from: NaiveDate,
}

impl From<SalaryStructureDBResponse> for SalaryStructureResponse {
    fn from(db: SalaryStructureDBResponse) -> Self {
        Self {
            id: db.id,
            staff_id: db.staff_id,
            base_salary: db.base_salary,
            housing_allowance: db.housing_allowance,
            transport_allowance: db.transport_allowance,
            other_allowances: db.other_allowances,
            effective_from: db.effective_from,
        }
    }
}

// ---------------------------------------------------------------------------
// Salary payments

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProcessSalaryRequest {
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    /// e.g. "January 2025"
    pub payment_period: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MarkSalaryPaidRequest {
    pub payment_date: NaiveDate,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalaryPaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SalaryPaymentId,
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    pub payment_period: String,
    #[schema(value_type = String)]
    pub base_salary: Decimal,
    #[schema(value_type = String)]
    pub allowances: Decimal,
    #[schema(value_type = String)]
    pub deductions: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub net_salary: Decimal,
    pub status: SalaryPaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub processed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<SalaryPaymentDBResponse> for SalaryPaymentResponse {
    fn from(db: SalaryPaymentDBResponse) -> Self {
        Self {
            id: db.id,
            staff_id: db.staff_id,
            payment_period: db.payment_period,
            base_salary: db.base_salary,
            allowances: db.allowances,
            deductions: db.deductions,
            tax: db.tax,
            net_salary: db.net_salary,
            status: db.status,
            payment_date: db.payment_date,
            payment_method: db.payment_method,
            processed_by: db.processed_by,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListSalaryPaymentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub staff_id: Option<StaffId>,
    pub payment_period: Option<String>,
    pub status: Option<SalaryPaymentStatus>,
}

// ---------------------------------------------------------------------------
// Leave requests

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveRequestCreate {
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveRequestResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: LeaveRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub staff_id: StaffId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reviewed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<LeaveRequestDBResponse> for LeaveRequestResponse {
    fn from(db: LeaveRequestDBResponse) -> Self {
        Self {
            id: db.id,
            staff_id: db.staff_id,
            start_date: db.start_date,
            end_date: db.end_date,
            reason: db.reason,
            status: db.status,
            reviewed_by: db.reviewed_by,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListLeaveRequestsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub staff_id: Option<StaffId>,
    pub status: Option<LeaveStatus>,
}
