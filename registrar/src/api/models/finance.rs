//! API request/response models for fees, invoices, payments and expenditures.

use super::pagination::Pagination;
use crate::db::models::finance::{
    ExpenditureDBResponse, FeeStructureDBResponse, InvoiceDBResponse, InvoiceItemDBResponse, PaymentDBResponse,
};
use crate::types::{
    AcademicYearId, ClassId, ExpenditureId, FeeStructureId, InvoiceId, PaymentId, StudentId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Term a fee structure applies to; `all` matches every billing term.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
pub enum FeeTerm {
    #[sqlx(rename = "1")]
    #[serde(rename = "1")]
    One,
    #[sqlx(rename = "2")]
    #[serde(rename = "2")]
    Two,
    #[sqlx(rename = "3")]
    #[serde(rename = "3")]
    Three,
    #[sqlx(rename = "all")]
    #[serde(rename = "all")]
    All,
}

/// Term an invoice is raised for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
pub enum BillingTerm {
    #[sqlx(rename = "1")]
    #[serde(rename = "1")]
    One,
    #[sqlx(rename = "2")]
    #[serde(rename = "2")]
    Two,
    #[sqlx(rename = "3")]
    #[serde(rename = "3")]
    Three,
    #[sqlx(rename = "annual")]
    #[serde(rename = "annual")]
    Annual,
}

impl BillingTerm {
    /// Wire value, used when matching fee structures and building numbers.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingTerm::One => "1",
            BillingTerm::Two => "2",
            BillingTerm::Three => "3",
            BillingTerm::Annual => "annual",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExpenditureCategory {
    Utility,
    Supplies,
    Maintenance,
    Amenities,
}

// ---------------------------------------------------------------------------
// Fee structures

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeeStructureCreate {
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    /// Class-specific when set, school-wide when absent
    #[schema(value_type = Option<String>, format = "uuid")]
    pub class_id: Option<ClassId>,
    pub category_name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub term: FeeTerm,
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeeStructureUpdate {
    pub category_name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub term: Option<FeeTerm>,
    pub is_mandatory: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeeStructureResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: FeeStructureId,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub class_id: Option<ClassId>,
    pub category_name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub term: FeeTerm,
    pub is_mandatory: bool,
}

impl From<FeeStructureDBResponse> for FeeStructureResponse {
    fn from(db: FeeStructureDBResponse) -> Self {
        Self {
            id: db.id,
            academic_year_id: db.academic_year_id,
            class_id: db.class_id,
            category_name: db.category_name,
            amount: db.amount,
            term: db.term,
            is_mandatory: db.is_mandatory,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListFeeStructuresQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub academic_year_id: Option<AcademicYearId>,
    pub class_id: Option<ClassId>,
    pub term: Option<FeeTerm>,
}

// ---------------------------------------------------------------------------
// Invoices

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InvoiceGenerateRequest {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
    /// Days until due; defaults from config
    pub due_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkInvoiceGenerateRequest {
    #[schema(value_type = String, format = "uuid")]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InvoiceId,
    pub invoice_number: String,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    #[schema(value_type = String, format = "uuid")]
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub generated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<InvoiceItemResponse>>,
}

impl From<InvoiceDBResponse> for InvoiceResponse {
    fn from(db: InvoiceDBResponse) -> Self {
        Self {
            id: db.id,
            invoice_number: db.invoice_number,
            student_id: db.student_id,
            academic_year_id: db.academic_year_id,
            term: db.term,
            total_amount: db.total_amount,
            amount_paid: db.amount_paid,
            balance: db.balance,
            due_date: db.due_date,
            status: db.status,
            generated_by: db.generated_by,
            created_at: db.created_at,
            items: None,
        }
    }
}

impl InvoiceResponse {
    pub fn with_items(mut self, items: Vec<InvoiceItemResponse>) -> Self {
        self.items = Some(items);
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: uuid::Uuid,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub fee_structure_id: Option<FeeStructureId>,
    pub description: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

impl From<InvoiceItemDBResponse> for InvoiceItemResponse {
    fn from(db: InvoiceItemDBResponse) -> Self {
        Self {
            id: db.id,
            fee_structure_id: db.fee_structure_id,
            description: db.description,
            amount: db.amount,
        }
    }
}

/// Best-effort bulk invoicing result.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkInvoiceReport {
    pub invoices: Vec<InvoiceResponse>,
    pub errors: Vec<BulkInvoiceError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkInvoiceError {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListInvoicesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub student_id: Option<StudentId>,
    pub academic_year_id: Option<AcademicYearId>,
    pub term: Option<BillingTerm>,
    pub status: Option<InvoiceStatus>,
}

// ---------------------------------------------------------------------------
// Payments

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentCreate {
    #[schema(value_type = String, format = "uuid")]
    pub invoice_id: InvoiceId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_reference: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    pub payment_number: String,
    #[schema(value_type = String, format = "uuid")]
    pub invoice_id: InvoiceId,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_reference: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub received_by: Option<UserId>,
    pub payment_date: DateTime<Utc>,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            payment_number: db.payment_number,
            invoice_id: db.invoice_id,
            amount_paid: db.amount_paid,
            payment_method: db.payment_method,
            transaction_reference: db.transaction_reference,
            received_by: db.received_by,
            payment_date: db.payment_date,
        }
    }
}

/// Payment plus the invoice as updated by it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentRecordedResponse {
    pub payment: PaymentResponse,
    pub invoice: InvoiceResponse,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListPaymentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub invoice_id: Option<InvoiceId>,
    pub student_id: Option<StudentId>,
}

// ---------------------------------------------------------------------------
// Expenditures

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExpenditureCreate {
    pub item_name: String,
    pub category: ExpenditureCategory,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub paid_to: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExpenditureUpdate {
    pub item_name: Option<String>,
    pub category: Option<ExpenditureCategory>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub paid_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExpenditureResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ExpenditureId,
    pub item_name: String,
    pub category: ExpenditureCategory,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub paid_to: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<ExpenditureDBResponse> for ExpenditureResponse {
    fn from(db: ExpenditureDBResponse) -> Self {
        Self {
            id: db.id,
            item_name: db.item_name,
            category: db.category,
            amount: db.amount,
            transaction_date: db.transaction_date,
            paid_to: db.paid_to,
            recorded_by: db.recorded_by,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListExpendituresQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub category: Option<ExpenditureCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
