//! Handlers for payroll runs, salary structures and leave requests.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    api::models::payroll::{
        LeaveRequestCreate, LeaveRequestResponse, LeaveStatus, ListLeaveRequestsQuery, ListSalaryPaymentsQuery,
        MarkSalaryPaidRequest, ProcessSalaryRequest, SalaryPaymentResponse, SalaryStructureCreateRequest,
        SalaryStructureResponse, SalaryStructureUpdateRequest,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{
            LeaveRequests, Repository, SalaryPayments, SalaryStructures, Staff,
            payroll::{LeaveRequestFilter, SalaryPaymentFilter, SalaryStructureFilter},
        },
        models::payroll::{
            LeaveRequestCreateDBRequest, SalaryPaymentCreateDBRequest, SalaryStructureCreateDBRequest,
            SalaryStructureUpdateDBRequest, compute_salary,
        },
    },
    errors::{Error, Result},
    types::{LeaveRequestId, SalaryPaymentId, SalaryStructureId},
};

// ---------------------------------------------------------------------------
// Salary structures

#[utoipa::path(
    get,
    path = "/salary-structures",
    tag = "payroll",
    summary = "List salary structures",
    responses(
        (status = 200, description = "List of salary structures", body = Vec<SalaryStructureResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_salary_structures(
    State(state): State<AppState>,
    Query(query): Query<crate::api::models::pagination::Pagination>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<Vec<SalaryStructureResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryStructures::new(&mut pool_conn);

    let (skip, limit) = query.params();
    let structures = repo.list(&SalaryStructureFilter::new(skip, limit)).await?;
    Ok(Json(structures.into_iter().map(SalaryStructureResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/salary-structures",
    tag = "payroll",
    summary = "Create salary structure",
    request_body = SalaryStructureCreateRequest,
    responses(
        (status = 201, description = "Salary structure created", body = SalaryStructureResponse),
        (status = 404, description = "Staff member not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_salary_structure(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Payroll, operation::CreateAll>,
    Json(create): Json<SalaryStructureCreateRequest>,
) -> Result<(StatusCode, Json<SalaryStructureResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut staff = Staff::new(&mut pool_conn);
        staff.get_by_id(create.staff_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Staff".to_string(),
            id: create.staff_id.to_string(),
        })?;
    }

    let mut repo = SalaryStructures::new(&mut pool_conn);
    let structure = repo
        .create(&SalaryStructureCreateDBRequest {
            staff_id: create.staff_id,
            base_salary: create.base_salary,
            housing_allowance: create.housing_allowance,
            transport_allowance: create.transport_allowance,
            other_allowances: create.other_allowances,
            effective_from: create.effective_from,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SalaryStructureResponse::from(structure))))
}

#[utoipa::path(
    get,
    path = "/salary-structures/{id}",
    tag = "payroll",
    summary = "Get salary structure",
    responses(
        (status = 200, description = "Salary structure", body = SalaryStructureResponse),
        (status = 404, description = "Salary structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_salary_structure(
    State(state): State<AppState>,
    Path(id): Path<SalaryStructureId>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<SalaryStructureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryStructures::new(&mut pool_conn);

    let structure = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "SalaryStructure".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(SalaryStructureResponse::from(structure)))
}

#[utoipa::path(
    patch,
    path = "/salary-structures/{id}",
    tag = "payroll",
    summary = "Update salary structure",
    request_body = SalaryStructureUpdateRequest,
    responses(
        (status = 200, description = "Salary structure updated", body = SalaryStructureResponse),
        (status = 404, description = "Salary structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_salary_structure(
    State(state): State<AppState>,
    Path(id): Path<SalaryStructureId>,
    _: RequiresPermission<resource::Payroll, operation::UpdateAll>,
    Json(update): Json<SalaryStructureUpdateRequest>,
) -> Result<Json<SalaryStructureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryStructures::new(&mut pool_conn);

    let structure = repo
        .update(
            id,
            &SalaryStructureUpdateDBRequest {
                base_salary: update.base_salary,
                housing_allowance: update.housing_allowance,
                transport_allowance: update.transport_allowance,
                other_allowances: update.other_allowances,
                effective_from: update.effective_from,
            },
        )
        .await?;

    Ok(Json(SalaryStructureResponse::from(structure)))
}

#[utoipa::path(
    delete,
    path = "/salary-structures/{id}",
    tag = "payroll",
    summary = "Delete salary structure",
    responses(
        (status = 204, description = "Salary structure deleted"),
        (status = 404, description = "Salary structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_salary_structure(
    State(state): State<AppState>,
    Path(id): Path<SalaryStructureId>,
    _: RequiresPermission<resource::Payroll, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryStructures::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "SalaryStructure".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Salary payments

#[utoipa::path(
    post,
    path = "/payroll/process",
    tag = "payroll",
    summary = "Process a salary payment run",
    description = "Computes gross, tax and net from the newest salary structure effective today. One payment per staff member and period; duplicates conflict.",
    request_body = ProcessSalaryRequest,
    responses(
        (status = 201, description = "Salary payment created", body = SalaryPaymentResponse),
        (status = 400, description = "No salary structure in effect"),
        (status = 404, description = "Staff member not found"),
        (status = 409, description = "Salary already processed for the period"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn process_salary(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Payroll, operation::CreateAll>,
    Json(request): Json<ProcessSalaryRequest>,
) -> Result<(StatusCode, Json<SalaryPaymentResponse>)> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut staff = Staff::new(&mut tx);
        staff.get_by_id(request.staff_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Staff".to_string(),
            id: request.staff_id.to_string(),
        })?;
    }

    let structure = {
        let mut structures = SalaryStructures::new(&mut tx);
        structures
            .effective_for_staff(request.staff_id, Utc::now().date_naive())
            .await?
            .ok_or_else(|| Error::BadRequest {
                message: "Staff member has no salary structure in effect".to_string(),
            })?
    };

    let computed = compute_salary(structure.base_salary, structure.total_allowances());

    let payment = {
        let mut payments = SalaryPayments::new(&mut tx);
        payments
            .create(&SalaryPaymentCreateDBRequest {
                staff_id: request.staff_id,
                payment_period: request.payment_period,
                base_salary: computed.base_salary,
                allowances: computed.allowances,
                deductions: rust_decimal::Decimal::ZERO,
                tax: computed.tax,
                net_salary: computed.net_salary,
                processed_by: Some(current_user.id),
            })
            .await?
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((StatusCode::CREATED, Json(SalaryPaymentResponse::from(payment))))
}

#[utoipa::path(
    get,
    path = "/payroll",
    tag = "payroll",
    summary = "List salary payments",
    params(ListSalaryPaymentsQuery),
    responses(
        (status = 200, description = "List of salary payments", body = Vec<SalaryPaymentResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_salary_payments(
    State(state): State<AppState>,
    Query(query): Query<ListSalaryPaymentsQuery>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<Vec<SalaryPaymentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryPayments::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = SalaryPaymentFilter::new(skip, limit)
        .with_staff(query.staff_id)
        .with_period(query.payment_period)
        .with_status(query.status);

    let payments = repo.list(&filter).await?;
    Ok(Json(payments.into_iter().map(SalaryPaymentResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/payroll/{id}",
    tag = "payroll",
    summary = "Get salary payment",
    responses(
        (status = 200, description = "Salary payment", body = SalaryPaymentResponse),
        (status = 404, description = "Salary payment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_salary_payment(
    State(state): State<AppState>,
    Path(id): Path<SalaryPaymentId>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<SalaryPaymentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryPayments::new(&mut pool_conn);

    let payment = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "SalaryPayment".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(SalaryPaymentResponse::from(payment)))
}

#[utoipa::path(
    post,
    path = "/payroll/{id}/mark-paid",
    tag = "payroll",
    summary = "Mark a salary payment as paid",
    request_body = MarkSalaryPaidRequest,
    responses(
        (status = 200, description = "Salary payment marked paid", body = SalaryPaymentResponse),
        (status = 404, description = "Payment not found or already paid"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_salary_paid(
    State(state): State<AppState>,
    Path(id): Path<SalaryPaymentId>,
    _: RequiresPermission<resource::Payroll, operation::UpdateAll>,
    Json(request): Json<MarkSalaryPaidRequest>,
) -> Result<Json<SalaryPaymentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = SalaryPayments::new(&mut pool_conn);

    let payment = repo.mark_paid(id, request.payment_date, &request.payment_method).await?;
    Ok(Json(SalaryPaymentResponse::from(payment)))
}

// ---------------------------------------------------------------------------
// Leave requests

#[utoipa::path(
    get,
    path = "/leave-requests",
    tag = "payroll",
    summary = "List leave requests",
    params(ListLeaveRequestsQuery),
    responses(
        (status = 200, description = "List of leave requests", body = Vec<LeaveRequestResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_leave_requests(
    State(state): State<AppState>,
    Query(query): Query<ListLeaveRequestsQuery>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<Vec<LeaveRequestResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = LeaveRequestFilter::new(skip, limit)
        .with_staff(query.staff_id)
        .with_status(query.status);

    let leaves = repo.list(&filter).await?;
    Ok(Json(leaves.into_iter().map(LeaveRequestResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/leave-requests",
    tag = "payroll",
    summary = "File leave request",
    request_body = LeaveRequestCreate,
    responses(
        (status = 201, description = "Leave request filed", body = LeaveRequestResponse),
        (status = 400, description = "Dates out of order"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_leave_request(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Payroll, operation::CreateAll>,
    Json(create): Json<LeaveRequestCreate>,
) -> Result<(StatusCode, Json<LeaveRequestResponse>)> {
    if create.start_date > create.end_date {
        return Err(Error::BadRequest {
            message: "start_date must not be after end_date".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    let leave = repo
        .create(&LeaveRequestCreateDBRequest {
            staff_id: create.staff_id,
            start_date: create.start_date,
            end_date: create.end_date,
            reason: create.reason,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(LeaveRequestResponse::from(leave))))
}

#[utoipa::path(
    get,
    path = "/leave-requests/{id}",
    tag = "payroll",
    summary = "Get leave request",
    responses(
        (status = 200, description = "Leave request", body = LeaveRequestResponse),
        (status = 404, description = "Leave request not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_leave_request(
    State(state): State<AppState>,
    Path(id): Path<LeaveRequestId>,
    _: RequiresPermission<resource::Payroll, operation::ReadAll>,
) -> Result<Json<LeaveRequestResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    let leave = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "LeaveRequest".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(LeaveRequestResponse::from(leave)))
}

#[utoipa::path(
    post,
    path = "/leave-requests/{id}/approve",
    tag = "payroll",
    summary = "Approve leave request",
    responses(
        (status = 200, description = "Leave request approved", body = LeaveRequestResponse),
        (status = 404, description = "Leave request not found or already reviewed"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn approve_leave_request(
    State(state): State<AppState>,
    Path(id): Path<LeaveRequestId>,
    current_user: RequiresPermission<resource::Payroll, operation::UpdateAll>,
) -> Result<Json<LeaveRequestResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    let leave = repo.review(id, LeaveStatus::Approved, current_user.id).await?;
    Ok(Json(LeaveRequestResponse::from(leave)))
}

#[utoipa::path(
    post,
    path = "/leave-requests/{id}/reject",
    tag = "payroll",
    summary = "Reject leave request",
    responses(
        (status = 200, description = "Leave request rejected", body = LeaveRequestResponse),
        (status = 404, description = "Leave request not found or already reviewed"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reject_leave_request(
    State(state): State<AppState>,
    Path(id): Path<LeaveRequestId>,
    current_user: RequiresPermission<resource::Payroll, operation::UpdateAll>,
) -> Result<Json<LeaveRequestResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    let leave = repo.review(id, LeaveStatus::Rejected, current_user.id).await?;
    Ok(Json(LeaveRequestResponse::from(leave)))
}

#[utoipa::path(
    delete,
    path = "/leave-requests/{id}",
    tag = "payroll",
    summary = "Delete leave request",
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 404, description = "Leave request not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_leave_request(
    State(state): State<AppState>,
    Path(id): Path<LeaveRequestId>,
    _: RequiresPermission<resource::Payroll, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = LeaveRequests::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "LeaveRequest".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, seed_school};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_payroll_run_computes_net_from_structure(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        server
            .post("/api/v1/salary-structures")
            .add_header(name, value)
            .json(&serde_json::json!({
                "staff_id": fixture.staff_id,
                "base_salary": "50000",
                "housing_allowance": "6000",
                "transport_allowance": "4000",
                "effective_from": "2024-01-01"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/payroll/process")
            .add_header(name, value)
            .json(&serde_json::json!({
                "staff_id": fixture.staff_id,
                "payment_period": "January 2025"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let payment: serde_json::Value = response.json();
        // gross 60000, 10% tax
        assert_eq!(payment["tax"], "6000.00");
        assert_eq!(payment["net_salary"], "54000.00");
        assert_eq!(payment["status"], "pending");

        // Same staff and period conflicts
        let (name, value) = auth_header(&admin);
        let duplicate = server
            .post("/api/v1/payroll/process")
            .add_header(name, value)
            .json(&serde_json::json!({
                "staff_id": fixture.staff_id,
                "payment_period": "January 2025"
            }))
            .await;
        duplicate.assert_status(axum::http::StatusCode::CONFLICT);

        // Mark-paid succeeds once, then 404s
        let payment_id = payment["id"].as_str().unwrap();
        let (name, value) = auth_header(&admin);
        let paid = server
            .post(&format!("/api/v1/payroll/{payment_id}/mark-paid"))
            .add_header(name, value)
            .json(&serde_json::json!({"payment_date": "2025-01-31", "payment_method": "bank_transfer"}))
            .await;
        paid.assert_status_ok();

        let (name, value) = auth_header(&admin);
        let double = server
            .post(&format!("/api/v1/payroll/{payment_id}/mark-paid"))
            .add_header(name, value)
            .json(&serde_json::json!({"payment_date": "2025-02-01", "payment_method": "cash"}))
            .await;
        double.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_payroll_requires_a_structure(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/payroll/process")
            .add_header(name, value)
            .json(&serde_json::json!({
                "staff_id": fixture.staff_id,
                "payment_period": "March 2025"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_leave_request_review_flow(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        let (name, value) = auth_header(&admin);
        let leave: serde_json::Value = server
            .post("/api/v1/leave-requests")
            .add_header(name, value)
            .json(&serde_json::json!({
                "staff_id": fixture.staff_id,
                "start_date": "2025-04-01",
                "end_date": "2025-04-03",
                "reason": "family"
            }))
            .await
            .json();
        assert_eq!(leave["status"], "pending");

        let leave_id = leave["id"].as_str().unwrap();
        let (name, value) = auth_header(&admin);
        let approved = server
            .post(&format!("/api/v1/leave-requests/{leave_id}/approve"))
            .add_header(name, value)
            .await;
        approved.assert_status_ok();
        let approved: serde_json::Value = approved.json();
        assert_eq!(approved["status"], "approved");

        // Rejecting an approved request fails
        let (name, value) = auth_header(&admin);
        let rejected = server
            .post(&format!("/api/v1/leave-requests/{leave_id}/reject"))
            .add_header(name, value)
            .await;
        rejected.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
