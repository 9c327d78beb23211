//! Database repositories for finance: fee structures, invoices, payments and
//! expenditures.
//!
//! Invoice and payment numbers are sequential per period with a zero-padded
//! counter, derived by reading the latest number for the period prefix and
//! incrementing it. There is no database sequence behind them; the unique
//! index on the number column turns a concurrent duplicate into a conflict
//! instead of a silent reuse.

use crate::api::models::finance::{BillingTerm, ExpenditureCategory, FeeTerm, InvoiceStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::finance::{
        ExpenditureCreateDBRequest, ExpenditureDBResponse, ExpenditureUpdateDBRequest, FeeStructureCreateDBRequest,
        FeeStructureDBResponse, FeeStructureUpdateDBRequest, InvoiceDBResponse, InvoiceItemDBResponse,
        PaymentCreateDBRequest, PaymentDBResponse,
    },
};
use crate::types::{AcademicYearId, ClassId, ExpenditureId, FeeStructureId, InvoiceId, StudentId, UserId, abbrev_uuid};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Next counter value given the latest number for a period, e.g.
/// `Some("INV-2025-1-00007")` -> 8, `None` -> 1.
pub fn next_sequence(latest: Option<&str>) -> i64 {
    latest
        .and_then(|number| number.rsplit('-').next())
        .and_then(|tail| tail.parse::<i64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1)
}

/// `INV-{year_code}-{TERM}-{#####}`; the year code drops the `/` from names
/// like "2025/26" and keeps the leading four digits.
pub fn format_invoice_number(year_name: &str, term: BillingTerm, sequence: i64) -> String {
    let year_code: String = year_name.replace('/', "").chars().take(4).collect();
    let term_code = term.as_str().to_uppercase();
    format!("INV-{year_code}-{term_code}-{sequence:05}")
}

/// Prefix shared by all invoices of a (year, term) period.
pub fn invoice_number_prefix(year_name: &str, term: BillingTerm) -> String {
    let year_code: String = year_name.replace('/', "").chars().take(4).collect();
    let term_code = term.as_str().to_uppercase();
    format!("INV-{year_code}-{term_code}-")
}

/// `PAY-{YYYYMMDD}-{####}`.
pub fn format_payment_number(date: NaiveDate, sequence: i64) -> String {
    format!("PAY-{}-{sequence:04}", date.format("%Y%m%d"))
}

/// Prefix shared by all payments recorded on one day.
pub fn payment_number_prefix(date: NaiveDate) -> String {
    format!("PAY-{}-", date.format("%Y%m%d"))
}

// ---------------------------------------------------------------------------
// Fee structures

#[derive(Debug, Clone, Default)]
pub struct FeeStructureFilter {
    pub skip: i64,
    pub limit: i64,
    pub academic_year_id: Option<AcademicYearId>,
    pub class_id: Option<ClassId>,
    pub term: Option<FeeTerm>,
}

impl FeeStructureFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_academic_year(mut self, academic_year_id: Option<AcademicYearId>) -> Self {
        self.academic_year_id = academic_year_id;
        self
    }

    pub fn with_class(mut self, class_id: Option<ClassId>) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_term(mut self, term: Option<FeeTerm>) -> Self {
        self.term = term;
        self
    }
}

pub struct FeeStructures<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for FeeStructures<'c> {
    type CreateRequest = FeeStructureCreateDBRequest;
    type UpdateRequest = FeeStructureUpdateDBRequest;
    type Response = FeeStructureDBResponse;
    type Id = FeeStructureId;
    type Filter = FeeStructureFilter;

    #[instrument(skip(self, request), fields(category = %request.category_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let fee = sqlx::query_as::<_, FeeStructureDBResponse>(
            r#"
            INSERT INTO fee_structures (id, academic_year_id, class_id, category_name, amount, term, is_mandatory)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.academic_year_id)
        .bind(request.class_id)
        .bind(&request.category_name)
        .bind(request.amount)
        .bind(request.term)
        .bind(request.is_mandatory)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(fee)
    }

    #[instrument(skip(self), fields(fee_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let fee = sqlx::query_as::<_, FeeStructureDBResponse>("SELECT * FROM fee_structures WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(fee)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let fees = sqlx::query_as::<_, FeeStructureDBResponse>(
            r#"
            SELECT * FROM fee_structures
            WHERE ($1::uuid IS NULL OR academic_year_id = $1)
              AND ($2::uuid IS NULL OR class_id = $2)
              AND ($3::text IS NULL OR term = $3)
            ORDER BY category_name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.academic_year_id)
        .bind(filter.class_id)
        .bind(filter.term)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(fees)
    }

    #[instrument(skip(self), fields(fee_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fee_structures WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(fee_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let fee = sqlx::query_as::<_, FeeStructureDBResponse>(
            r#"
            UPDATE fee_structures SET
                category_name = COALESCE($2, category_name),
                amount = COALESCE($3, amount),
                term = COALESCE($4, term),
                is_mandatory = COALESCE($5, is_mandatory)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.category_name)
        .bind(request.amount)
        .bind(request.term)
        .bind(request.is_mandatory)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(fee)
    }
}

impl<'c> FeeStructures<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mandatory fee structures applicable to a student's class for a billing
    /// term: class-specific or school-wide, term-specific or 'all'.
    #[instrument(skip(self), fields(year_id = %abbrev_uuid(&academic_year_id), class_id = %abbrev_uuid(&class_id)), err)]
    pub async fn applicable(
        &mut self,
        academic_year_id: AcademicYearId,
        class_id: ClassId,
        term: BillingTerm,
    ) -> Result<Vec<FeeStructureDBResponse>> {
        let fees = sqlx::query_as::<_, FeeStructureDBResponse>(
            r#"
            SELECT * FROM fee_structures
            WHERE academic_year_id = $1
              AND is_mandatory
              AND (class_id = $2 OR class_id IS NULL)
              AND (term = $3 OR term = 'all')
            ORDER BY category_name
            "#,
        )
        .bind(academic_year_id)
        .bind(class_id)
        .bind(term.as_str())
        .fetch_all(&mut *self.db)
        .await?;

        Ok(fees)
    }
}

// ---------------------------------------------------------------------------
// Invoices

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub skip: i64,
    pub limit: i64,
    pub student_id: Option<StudentId>,
    pub academic_year_id: Option<AcademicYearId>,
    pub term: Option<BillingTerm>,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_student(mut self, student_id: Option<StudentId>) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn with_academic_year(mut self, academic_year_id: Option<AcademicYearId>) -> Self {
        self.academic_year_id = academic_year_id;
        self
    }

    pub fn with_term(mut self, term: Option<BillingTerm>) -> Self {
        self.term = term;
        self
    }

    pub fn with_status(mut self, status: Option<InvoiceStatus>) -> Self {
        self.status = status;
        self
    }
}

/// Everything needed to insert one invoice row; the caller has already
/// resolved the number, total and due date.
#[derive(Debug, Clone)]
pub struct InvoiceInsert {
    pub invoice_number: String,
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub term: BillingTerm,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
    pub generated_by: Option<UserId>,
}

pub struct Invoices<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Invoices<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(invoice_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: InvoiceId) -> Result<Option<InvoiceDBResponse>> {
        let invoice = sqlx::query_as::<_, InvoiceDBResponse>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(invoice)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(&mut self, filter: &InvoiceFilter) -> Result<Vec<InvoiceDBResponse>> {
        let invoices = sqlx::query_as::<_, InvoiceDBResponse>(
            r#"
            SELECT * FROM invoices
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::uuid IS NULL OR academic_year_id = $2)
              AND ($3::text IS NULL OR term = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.academic_year_id)
        .bind(filter.term)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(invoices)
    }

    /// Existing invoice for a (student, year, term) period, if any.
    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn get_for_period(
        &mut self,
        student_id: StudentId,
        academic_year_id: AcademicYearId,
        term: BillingTerm,
    ) -> Result<Option<InvoiceDBResponse>> {
        let invoice = sqlx::query_as::<_, InvoiceDBResponse>(
            "SELECT * FROM invoices WHERE student_id = $1 AND academic_year_id = $2 AND term = $3",
        )
        .bind(student_id)
        .bind(academic_year_id)
        .bind(term)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(invoice)
    }

    /// Highest invoice number issued for a period prefix. Read-then-increment;
    /// see the module docs for the concurrency caveat.
    #[instrument(skip(self), err)]
    pub async fn latest_number_with_prefix(&mut self, prefix: &str) -> Result<Option<String>> {
        let number = sqlx::query_scalar::<_, String>(
            "SELECT invoice_number FROM invoices WHERE invoice_number LIKE $1 || '%' ORDER BY invoice_number DESC LIMIT 1",
        )
        .bind(prefix)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(number)
    }

    /// Insert an invoice and its line items. Caller supplies the connection's
    /// transaction; balance starts at the full total.
    #[instrument(skip(self, insert, items), fields(invoice_number = %insert.invoice_number), err)]
    pub async fn create_with_items(
        &mut self,
        insert: &InvoiceInsert,
        items: &[(Option<FeeStructureId>, String, Decimal)],
    ) -> Result<(InvoiceDBResponse, Vec<InvoiceItemDBResponse>)> {
        let invoice = sqlx::query_as::<_, InvoiceDBResponse>(
            r#"
            INSERT INTO invoices (id, invoice_number, student_id, academic_year_id, term,
                                  total_amount, amount_paid, balance, due_date, generated_by)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&insert.invoice_number)
        .bind(insert.student_id)
        .bind(insert.academic_year_id)
        .bind(insert.term)
        .bind(insert.total_amount)
        .bind(insert.due_date)
        .bind(insert.generated_by)
        .fetch_one(&mut *self.db)
        .await?;

        let mut created_items = Vec::with_capacity(items.len());
        for (fee_structure_id, description, amount) in items {
            let item = sqlx::query_as::<_, InvoiceItemDBResponse>(
                r#"
                INSERT INTO invoice_items (id, invoice_id, fee_structure_id, description, amount)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice.id)
            .bind(fee_structure_id)
            .bind(description)
            .bind(amount)
            .fetch_one(&mut *self.db)
            .await?;
            created_items.push(item);
        }

        Ok((invoice, created_items))
    }

    #[instrument(skip(self), fields(invoice_id = %abbrev_uuid(&invoice_id)), err)]
    pub async fn items(&mut self, invoice_id: InvoiceId) -> Result<Vec<InvoiceItemDBResponse>> {
        let items = sqlx::query_as::<_, InvoiceItemDBResponse>(
            "SELECT * FROM invoice_items WHERE invoice_id = $1 ORDER BY description",
        )
        .bind(invoice_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(items)
    }

    /// Apply a payment amount: bump amount_paid, recompute balance and flip
    /// status among unpaid/partial/paid. The balance check constraint rejects
    /// overpayment that slipped past the handler's validation.
    #[instrument(skip(self), fields(invoice_id = %abbrev_uuid(&invoice_id)), err)]
    pub async fn apply_payment(&mut self, invoice_id: InvoiceId, amount: Decimal) -> Result<InvoiceDBResponse> {
        let invoice = sqlx::query_as::<_, InvoiceDBResponse>(
            r#"
            UPDATE invoices SET
                amount_paid = amount_paid + $2,
                balance = total_amount - (amount_paid + $2),
                status = CASE
                    WHEN amount_paid + $2 >= total_amount THEN 'paid'
                    WHEN amount_paid + $2 > 0 THEN 'partial'
                    ELSE 'unpaid'
                END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(amount)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(invoice)
    }
}

// ---------------------------------------------------------------------------
// Payments

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub skip: i64,
    pub limit: i64,
    pub invoice_id: Option<InvoiceId>,
    pub student_id: Option<StudentId>,
}

impl PaymentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_invoice(mut self, invoice_id: Option<InvoiceId>) -> Self {
        self.invoice_id = invoice_id;
        self
    }

    pub fn with_student(mut self, student_id: Option<StudentId>) -> Self {
        self.student_id = student_id;
        self
    }
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn latest_number_with_prefix(&mut self, prefix: &str) -> Result<Option<String>> {
        let number = sqlx::query_scalar::<_, String>(
            "SELECT payment_number FROM payments WHERE payment_number LIKE $1 || '%' ORDER BY payment_number DESC LIMIT 1",
        )
        .bind(prefix)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(number)
    }

    #[instrument(skip(self, request), fields(invoice_id = %abbrev_uuid(&request.invoice_id)), err)]
    pub async fn create(&mut self, payment_number: &str, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            INSERT INTO payments (id, payment_number, invoice_id, amount_paid, payment_method,
                                  transaction_reference, received_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment_number)
        .bind(request.invoice_id)
        .bind(request.amount)
        .bind(request.payment_method)
        .bind(&request.transaction_reference)
        .bind(request.received_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: crate::types::PaymentId) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(&mut self, filter: &PaymentFilter) -> Result<Vec<PaymentDBResponse>> {
        let payments = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            SELECT p.* FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE ($1::uuid IS NULL OR p.invoice_id = $1)
              AND ($2::uuid IS NULL OR i.student_id = $2)
            ORDER BY p.payment_date DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.invoice_id)
        .bind(filter.student_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    /// Allocate the next payment number for today's date.
    #[instrument(skip(self), err)]
    pub async fn next_payment_number(&mut self) -> Result<String> {
        let today = Utc::now().date_naive();
        let prefix = payment_number_prefix(today);
        let latest = self.latest_number_with_prefix(&prefix).await?;
        Ok(format_payment_number(today, next_sequence(latest.as_deref())))
    }
}

// ---------------------------------------------------------------------------
// Expenditures

#[derive(Debug, Clone, Default)]
pub struct ExpenditureFilter {
    pub skip: i64,
    pub limit: i64,
    pub category: Option<ExpenditureCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ExpenditureFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: Option<ExpenditureCategory>) -> Self {
        self.category = category;
        self
    }

    pub fn with_date_range(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }
}

pub struct Expenditures<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Expenditures<'c> {
    type CreateRequest = ExpenditureCreateDBRequest;
    type UpdateRequest = ExpenditureUpdateDBRequest;
    type Response = ExpenditureDBResponse;
    type Id = ExpenditureId;
    type Filter = ExpenditureFilter;

    #[instrument(skip(self, request), fields(item = %request.item_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let expenditure = sqlx::query_as::<_, ExpenditureDBResponse>(
            r#"
            INSERT INTO school_expenditures (id, item_name, category, amount, transaction_date, paid_to, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.item_name)
        .bind(request.category)
        .bind(request.amount)
        .bind(request.transaction_date)
        .bind(&request.paid_to)
        .bind(request.recorded_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(expenditure)
    }

    #[instrument(skip(self), fields(expenditure_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let expenditure = sqlx::query_as::<_, ExpenditureDBResponse>("SELECT * FROM school_expenditures WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(expenditure)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let expenditures = sqlx::query_as::<_, ExpenditureDBResponse>(
            r#"
            SELECT * FROM school_expenditures
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::date IS NULL OR transaction_date >= $2)
              AND ($3::date IS NULL OR transaction_date <= $3)
            ORDER BY transaction_date DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.category)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(expenditures)
    }

    #[instrument(skip(self), fields(expenditure_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM school_expenditures WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(expenditure_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let expenditure = sqlx::query_as::<_, ExpenditureDBResponse>(
            r#"
            UPDATE school_expenditures SET
                item_name = COALESCE($2, item_name),
                category = COALESCE($3, category),
                amount = COALESCE($4, amount),
                transaction_date = COALESCE($5, transaction_date),
                paid_to = COALESCE($6, paid_to)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.item_name)
        .bind(request.category)
        .bind(request.amount)
        .bind(request.transaction_date)
        .bind(&request.paid_to)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(expenditure)
    }
}

impl<'c> Expenditures<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one() {
        assert_eq!(next_sequence(None), 1);
    }

    #[test]
    fn sequence_increments_from_latest() {
        assert_eq!(next_sequence(Some("INV-2025-1-00007")), 8);
        assert_eq!(next_sequence(Some("PAY-20250810-0099")), 100);
    }

    #[test]
    fn sequence_ignores_malformed_numbers() {
        assert_eq!(next_sequence(Some("garbage")), 1);
    }

    #[test]
    fn invoice_number_format() {
        assert_eq!(format_invoice_number("2025/26", BillingTerm::One, 1), "INV-2025-1-00001");
        assert_eq!(format_invoice_number("2025/26", BillingTerm::Annual, 42), "INV-2025-ANNUAL-00042");
        assert_eq!(invoice_number_prefix("2025/26", BillingTerm::Two), "INV-2025-2-");
    }

    #[test]
    fn payment_number_format() {
        let date: NaiveDate = "2025-08-10".parse().unwrap();
        assert_eq!(format_payment_number(date, 3), "PAY-20250810-0003");
        assert_eq!(payment_number_prefix(date), "PAY-20250810-");
    }
}
