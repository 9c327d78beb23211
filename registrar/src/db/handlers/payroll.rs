//! Database repositories for payroll: salary structures, monthly payment runs
//! and leave requests.
//!
//! A payment run picks the newest salary structure effective on the run date
//! and computes gross, tax and net from it. One payment per (staff, period)
//! is enforced by the unique constraint, so a duplicate run fails loudly.

use crate::api::models::payroll::{LeaveStatus, SalaryPaymentStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::payroll::{
        LeaveRequestCreateDBRequest, LeaveRequestDBResponse, SalaryPaymentCreateDBRequest, SalaryPaymentDBResponse,
        SalaryStructureCreateDBRequest, SalaryStructureDBResponse, SalaryStructureUpdateDBRequest,
    },
};
use crate::types::{LeaveRequestId, SalaryPaymentId, SalaryStructureId, StaffId, UserId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Salary structures

#[derive(Debug, Clone, Default)]
pub struct SalaryStructureFilter {
    pub skip: i64,
    pub limit: i64,
    pub staff_id: Option<StaffId>,
}

impl SalaryStructureFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff_id: Option<StaffId>) -> Self {
        self.staff_id = staff_id;
        self
    }
}

pub struct SalaryStructures<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for SalaryStructures<'c> {
    type CreateRequest = SalaryStructureCreateDBRequest;
    type UpdateRequest = SalaryStructureUpdateDBRequest;
    type Response = SalaryStructureDBResponse;
    type Id = SalaryStructureId;
    type Filter = SalaryStructureFilter;

    #[instrument(skip(self, request), fields(staff_id = %abbrev_uuid(&request.staff_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let structure = sqlx::query_as::<_, SalaryStructureDBResponse>(
            r#"
            INSERT INTO salary_structures (id, staff_id, base_salary, housing_allowance,
                                           transport_allowance, other_allowances, effective_from)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.staff_id)
        .bind(request.base_salary)
        .bind(request.housing_allowance)
        .bind(request.transport_allowance)
        .bind(request.other_allowances)
        .bind(request.effective_from)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(structure)
    }

    #[instrument(skip(self), fields(structure_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let structure = sqlx::query_as::<_, SalaryStructureDBResponse>("SELECT * FROM salary_structures WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(structure)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let structures = sqlx::query_as::<_, SalaryStructureDBResponse>(
            r#"
            SELECT * FROM salary_structures
            WHERE ($1::uuid IS NULL OR staff_id = $1)
            ORDER BY effective_from DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.staff_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(structures)
    }

    #[instrument(skip(self), fields(structure_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM salary_structures WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(structure_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let structure = sqlx::query_as::<_, SalaryStructureDBResponse>(
            r#"
            UPDATE salary_structures SET
                base_salary = COALESCE($2, base_salary),
                housing_allowance = COALESCE($3, housing_allowance),
                transport_allowance = COALESCE($4, transport_allowance),
                other_allowances = COALESCE($5, other_allowances),
                effective_from = COALESCE($6, effective_from)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.base_salary)
        .bind(request.housing_allowance)
        .bind(request.transport_allowance)
        .bind(request.other_allowances)
        .bind(request.effective_from)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(structure)
    }
}

impl<'c> SalaryStructures<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Newest structure effective on or before the given date.
    #[instrument(skip(self), fields(staff_id = %abbrev_uuid(&staff_id)), err)]
    pub async fn effective_for_staff(&mut self, staff_id: StaffId, on: NaiveDate) -> Result<Option<SalaryStructureDBResponse>> {
        let structure = sqlx::query_as::<_, SalaryStructureDBResponse>(
            r#"
            SELECT * FROM salary_structures
            WHERE staff_id = $1 AND effective_from <= $2
            ORDER BY effective_from DESC
            LIMIT 1
            "#,
        )
        .bind(staff_id)
        .bind(on)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(structure)
    }
}

// ---------------------------------------------------------------------------
// Salary payments

#[derive(Debug, Clone, Default)]
pub struct SalaryPaymentFilter {
    pub skip: i64,
    pub limit: i64,
    pub staff_id: Option<StaffId>,
    pub payment_period: Option<String>,
    pub status: Option<SalaryPaymentStatus>,
}

impl SalaryPaymentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff_id: Option<StaffId>) -> Self {
        self.staff_id = staff_id;
        self
    }

    pub fn with_period(mut self, payment_period: Option<String>) -> Self {
        self.payment_period = payment_period;
        self
    }

    pub fn with_status(mut self, status: Option<SalaryPaymentStatus>) -> Self {
        self.status = status;
        self
    }
}

pub struct SalaryPayments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SalaryPayments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(staff_id = %abbrev_uuid(&request.staff_id), period = %request.payment_period), err)]
    pub async fn create(&mut self, request: &SalaryPaymentCreateDBRequest) -> Result<SalaryPaymentDBResponse> {
        let payment = sqlx::query_as::<_, SalaryPaymentDBResponse>(
            r#"
            INSERT INTO salary_payments (id, staff_id, payment_period, base_salary, allowances,
                                         deductions, tax, net_salary, processed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.staff_id)
        .bind(&request.payment_period)
        .bind(request.base_salary)
        .bind(request.allowances)
        .bind(request.deductions)
        .bind(request.tax)
        .bind(request.net_salary)
        .bind(request.processed_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: SalaryPaymentId) -> Result<Option<SalaryPaymentDBResponse>> {
        let payment = sqlx::query_as::<_, SalaryPaymentDBResponse>("SELECT * FROM salary_payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(&mut self, filter: &SalaryPaymentFilter) -> Result<Vec<SalaryPaymentDBResponse>> {
        let payments = sqlx::query_as::<_, SalaryPaymentDBResponse>(
            r#"
            SELECT * FROM salary_payments
            WHERE ($1::uuid IS NULL OR staff_id = $1)
              AND ($2::text IS NULL OR payment_period = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.staff_id)
        .bind(&filter.payment_period)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    /// Flip a pending payment to paid. Returns NotFound when the payment does
    /// not exist or is already paid, so double-pay is rejected.
    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_paid(&mut self, id: SalaryPaymentId, payment_date: NaiveDate, payment_method: &str) -> Result<SalaryPaymentDBResponse> {
        let payment = sqlx::query_as::<_, SalaryPaymentDBResponse>(
            r#"
            UPDATE salary_payments SET
                status = 'paid',
                payment_date = $2,
                payment_method = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_date)
        .bind(payment_method)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(payment)
    }
}

// ---------------------------------------------------------------------------
// Leave requests

#[derive(Debug, Clone, Default)]
pub struct LeaveRequestFilter {
    pub skip: i64,
    pub limit: i64,
    pub staff_id: Option<StaffId>,
    pub status: Option<LeaveStatus>,
}

impl LeaveRequestFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff_id: Option<StaffId>) -> Self {
        self.staff_id = staff_id;
        self
    }

    pub fn with_status(mut self, status: Option<LeaveStatus>) -> Self {
        self.status = status;
        self
    }
}

pub struct LeaveRequests<'c> {
    db: &'c mut PgConnection,
}

impl<'c> LeaveRequests<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(staff_id = %abbrev_uuid(&request.staff_id)), err)]
    pub async fn create(&mut self, request: &LeaveRequestCreateDBRequest) -> Result<LeaveRequestDBResponse> {
        let leave = sqlx::query_as::<_, LeaveRequestDBResponse>(
            r#"
            INSERT INTO leave_requests (id, staff_id, start_date, end_date, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.staff_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.reason)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(leave)
    }

    #[instrument(skip(self), fields(leave_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: LeaveRequestId) -> Result<Option<LeaveRequestDBResponse>> {
        let leave = sqlx::query_as::<_, LeaveRequestDBResponse>("SELECT * FROM leave_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(leave)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(&mut self, filter: &LeaveRequestFilter) -> Result<Vec<LeaveRequestDBResponse>> {
        let leaves = sqlx::query_as::<_, LeaveRequestDBResponse>(
            r#"
            SELECT * FROM leave_requests
            WHERE ($1::uuid IS NULL OR staff_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.staff_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(leaves)
    }

    /// Approve or reject a pending request. Already-reviewed requests return
    /// NotFound so the transition stays linear.
    #[instrument(skip(self), fields(leave_id = %abbrev_uuid(&id), status = ?status), err)]
    pub async fn review(&mut self, id: LeaveRequestId, status: LeaveStatus, reviewed_by: UserId) -> Result<LeaveRequestDBResponse> {
        let leave = sqlx::query_as::<_, LeaveRequestDBResponse>(
            r#"
            UPDATE leave_requests SET
                status = $2,
                reviewed_by = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reviewed_by)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(leave)
    }

    #[instrument(skip(self), fields(leave_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: LeaveRequestId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leave_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::api::models::people::StaffType;
    use crate::db::handlers::people::Staff;
    use crate::db::models::payroll::compute_salary;
    use crate::db::models::people::StaffCreateDBRequest;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    async fn seed_staff(conn: &mut PgConnection) -> StaffId {
        Staff::new(conn)
            .create(&StaffCreateDBRequest {
                user_id: None,
                first_name: "Ngozi".to_string(),
                last_name: "Eze".to_string(),
                gender: None,
                date_of_birth: None,
                address: String::new(),
                health_info: String::new(),
                staff_type: StaffType::Teaching,
                specialization: "Chemistry".to_string(),
                employment_date: None,
            })
            .await
            .unwrap()
            .id
    }

    fn structure(staff_id: StaffId, base: i64, effective_from: &str) -> SalaryStructureCreateDBRequest {
        SalaryStructureCreateDBRequest {
            staff_id,
            base_salary: Decimal::new(base, 0),
            housing_allowance: Decimal::new(5_000, 0),
            transport_allowance: Decimal::new(3_000, 0),
            other_allowances: Decimal::new(2_000, 0),
            effective_from: effective_from.parse().unwrap(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_effective_structure_picks_the_newest_applicable(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let staff_id = seed_staff(&mut conn).await;

        let mut repo = SalaryStructures::new(&mut conn);
        repo.create(&structure(staff_id, 40_000, "2024-01-01")).await.unwrap();
        let raise = repo.create(&structure(staff_id, 50_000, "2025-01-01")).await.unwrap();
        repo.create(&structure(staff_id, 60_000, "2026-01-01")).await.unwrap();

        let effective = repo
            .effective_for_staff(staff_id, "2025-06-15".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(effective.id, raise.id);
        assert_eq!(effective.total_allowances(), Decimal::new(10_000, 0));

        // Before any structure applies there is nothing to pay from
        let none = repo.effective_for_staff(staff_id, "2023-01-01".parse().unwrap()).await.unwrap();
        assert!(none.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_one_payment_per_staff_period(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let staff_id = seed_staff(&mut conn).await;

        let computed = compute_salary(Decimal::new(50_000, 0), Decimal::new(10_000, 0));
        let request = SalaryPaymentCreateDBRequest {
            staff_id,
            payment_period: "January 2025".to_string(),
            base_salary: computed.base_salary,
            allowances: computed.allowances,
            deductions: Decimal::ZERO,
            tax: computed.tax,
            net_salary: computed.net_salary,
            processed_by: None,
        };

        let mut repo = SalaryPayments::new(&mut conn);
        let payment = repo.create(&request).await.unwrap();
        assert_eq!(payment.status, SalaryPaymentStatus::Pending);
        assert_eq!(payment.net_salary.to_string(), "54000.00");

        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_mark_paid_rejects_double_pay(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let staff_id = seed_staff(&mut conn).await;

        let computed = compute_salary(Decimal::new(30_000, 0), Decimal::ZERO);
        let payment = SalaryPayments::new(&mut conn)
            .create(&SalaryPaymentCreateDBRequest {
                staff_id,
                payment_period: "February 2025".to_string(),
                base_salary: computed.base_salary,
                allowances: computed.allowances,
                deductions: Decimal::ZERO,
                tax: computed.tax,
                net_salary: computed.net_salary,
                processed_by: None,
            })
            .await
            .unwrap();

        let mut repo = SalaryPayments::new(&mut conn);
        let paid = repo
            .mark_paid(payment.id, "2025-02-28".parse().unwrap(), "bank_transfer")
            .await
            .unwrap();
        assert_eq!(paid.status, SalaryPaymentStatus::Paid);

        let err = repo
            .mark_paid(payment.id, "2025-03-01".parse().unwrap(), "cash")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_leave_review_transitions_once(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let staff_id = seed_staff(&mut conn).await;
        let reviewer = crate::db::handlers::users::Users::new(&mut conn)
            .create(&crate::db::models::users::UserCreateDBRequest {
                username: "head".to_string(),
                email: "head@example.com".to_string(),
                role: crate::api::models::users::Role::Admin,
                is_admin: true,
                password_hash: None,
            })
            .await
            .unwrap();

        let mut repo = LeaveRequests::new(&mut conn);
        let leave = repo
            .create(&LeaveRequestCreateDBRequest {
                staff_id,
                start_date: "2025-03-10".parse().unwrap(),
                end_date: "2025-03-12".parse().unwrap(),
                reason: "conference".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);

        let approved = repo.review(leave.id, LeaveStatus::Approved, reviewer.id).await.unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(reviewer.id));

        // A reviewed request cannot be re-reviewed
        let err = repo.review(leave.id, LeaveStatus::Rejected, reviewer.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_leave_dates_must_be_ordered(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let staff_id = seed_staff(&mut conn).await;

        let err = LeaveRequests::new(&mut conn)
            .create(&LeaveRequestCreateDBRequest {
                staff_id,
                start_date: "2025-03-12".parse().unwrap(),
                end_date: "2025-03-10".parse().unwrap(),
                reason: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
