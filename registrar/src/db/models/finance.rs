//! Database models for finance: fee structures, invoices, payments and
//! expenditures.

use crate::api::models::finance::{BillingTerm, ExpenditureCategory, FeeTerm, InvoiceStatus, PaymentMethod};
use crate::types::{AcademicYearId, ClassId, ExpenditureId, FeeStructureId, InvoiceId, PaymentId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FeeStructureCreateDBRequest {
    pub academic_year_id: AcademicYearId,
    pub class_id: Option<ClassId>,
    pub category_name: String,
    pub amount: Decimal,
    pub term: FeeTerm,
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FeeStructureUpdateDBRequest {
    pub category_name: Option<String>,
    pub amount: Option<Decimal>,
    pub term: Option<FeeTerm>,
    pub is_mandatory: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeeStructureDBResponse {
    pub id: FeeStructureId,
    pub academic_year_id: AcademicYearId,
    pub class_id: Option<ClassId>,
    pub category_name: String,
    pub amount: Decimal,
    pub term: FeeTerm,
    pub is_mandatory: bool,
}

/// Inputs for generating one student's invoice for a billing period.
#[derive(Debug, Clone)]
pub struct InvoiceGenerateDBRequest {
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
    pub due_date: NaiveDate,
    pub generated_by: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceDBResponse {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub generated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItemDBResponse {
    pub id: Uuid,
    pub invoice_id: InvoiceId,
    pub fee_structure_id: Option<FeeStructureId>,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_reference: String,
    pub received_by: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub payment_number: String,
    pub invoice_id: InvoiceId,
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_reference: String,
    pub received_by: Option<UserId>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExpenditureCreateDBRequest {
    pub item_name: String,
    pub category: ExpenditureCategory,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub paid_to: String,
    pub recorded_by: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenditureUpdateDBRequest {
    pub item_name: Option<String>,
    pub category: Option<ExpenditureCategory>,
    pub amount: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub paid_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExpenditureDBResponse {
    pub id: ExpenditureId,
    pub item_name: String,
    pub category: ExpenditureCategory,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub paid_to: String,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
