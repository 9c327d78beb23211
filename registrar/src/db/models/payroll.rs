//! Database models for payroll, including the salary computation.

use crate::api::models::payroll::{LeaveStatus, SalaryPaymentStatus};
use crate::types::{LeaveRequestId, SalaryPaymentId, SalaryStructureId, StaffId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Flat tax rate applied to gross salary.
pub const PAYROLL_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10

/// Salary components derived from a structure: gross = base + allowances,
/// tax = gross * rate, net = gross - tax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryComputation {
    pub base_salary: Decimal,
    pub allowances: Decimal,
    pub tax: Decimal,
    pub net_salary: Decimal,
}

pub fn compute_salary(base_salary: Decimal, allowances: Decimal) -> SalaryComputation {
    let gross = base_salary + allowances;
    let tax = (gross * PAYROLL_TAX_RATE).round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    SalaryComputation {
        base_salary,
        allowances,
        tax,
        net_salary: gross - tax,
    }
}

#[derive(Debug, Clone)]
pub struct SalaryStructureCreateDBRequest {
    pub staff_id: StaffId,
    pub base_salary: Decimal,
    pub housing_allowance: Decimal,
    pub transport_allowance: Decimal,
    pub other_allowances: Decimal,
    pub effective_from: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct SalaryStructureUpdateDBRequest {
    pub base_salary: Option<Decimal>,
    pub housing_allowance: Option<Decimal>,
    pub transport_allowance: Option<Decimal>,
    pub other_allowances: Option<Decimal>,
    pub effective_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalaryStructureDBResponse {
    pub id: SalaryStructureId,
    pub staff_id: StaffId,
    pub base_salary: Decimal,
    pub housing_allowance: Decimal,
    pub transport_allowance: Decimal,
    pub other_allowances: Decimal,
    pub effective_from: NaiveDate,
}

impl SalaryStructureDBResponse {
    pub fn total_allowances(&self) -> Decimal {
        self.housing_allowance + self.transport_allowance + self.other_allowances
    }
}

#[derive(Debug, Clone)]
pub struct SalaryPaymentCreateDBRequest {
    pub staff_id: StaffId,
    pub payment_period: String,
    pub base_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub tax: Decimal,
    pub net_salary: Decimal,
    pub processed_by: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalaryPaymentDBResponse {
    pub id: SalaryPaymentId,
    pub staff_id: StaffId,
    pub payment_period: String,
    pub base_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub tax: Decimal,
    pub net_salary: Decimal,
    pub status: SalaryPaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: String,
    pub processed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LeaveRequestCreateDBRequest {
    pub staff_id: StaffId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveRequestDBResponse {
    pub id: LeaveRequestId,
    pub staff_id: StaffId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub reviewed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_constant_is_ten_percent() {
        assert_eq!(PAYROLL_TAX_RATE.to_string(), "0.10");
    }

    #[test]
    fn salary_computation() {
        let computed = compute_salary(Decimal::new(50_000, 0), Decimal::new(10_000, 0));
        assert_eq!(computed.tax.to_string(), "6000.00");
        assert_eq!(computed.net_salary.to_string(), "54000.00");
        // net = gross * (1 - rate)
        assert_eq!(
            computed.net_salary,
            (computed.base_salary + computed.allowances) * (Decimal::ONE - PAYROLL_TAX_RATE)
        );
    }

    #[test]
    fn salary_computation_rounds_tax_to_cents() {
        let computed = compute_salary(Decimal::new(333_33, 2), Decimal::ZERO); // 333.33
        assert_eq!(computed.tax.to_string(), "33.33");
        assert_eq!(computed.net_salary.to_string(), "300.00");
    }
}
