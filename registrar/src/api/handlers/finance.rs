//! Handlers for fees, invoices, payments and expenditures.
//!
//! Invoice generation validates the enrollment, sums applicable fee
//! structures and writes the invoice plus its line items in one transaction.
//! Payment recording validates the amount against the live balance, inserts
//! the payment and recomputes the invoice in one transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::finance::{
        BulkInvoiceError, BulkInvoiceGenerateRequest, BulkInvoiceReport, ExpenditureCreate, ExpenditureResponse,
        ExpenditureUpdate, FeeStructureCreate, FeeStructureResponse, FeeStructureUpdate, InvoiceGenerateRequest,
        InvoiceItemResponse, InvoiceResponse, ListExpendituresQuery, ListFeeStructuresQuery, ListInvoicesQuery,
        ListPaymentsQuery, PaymentCreate, PaymentRecordedResponse, PaymentResponse,
    },
    api::models::users::CurrentUser,
    auth::permissions::{RequiresPermission, has_permission, operation, resource},
    db::{
        handlers::{
            AcademicYears, Enrollments, Expenditures, FeeStructures, Invoices, Payments, Repository, Students,
            finance::{
                ExpenditureFilter, FeeStructureFilter, InvoiceFilter, InvoiceInsert, PaymentFilter,
                format_invoice_number, invoice_number_prefix, next_sequence,
            },
        },
        models::finance::{
            ExpenditureCreateDBRequest, ExpenditureUpdateDBRequest, FeeStructureCreateDBRequest,
            FeeStructureUpdateDBRequest, InvoiceDBResponse, InvoiceGenerateDBRequest, InvoiceItemDBResponse,
            PaymentCreateDBRequest,
        },
    },
    errors::{Error, Result},
    types::{ExpenditureId, FeeStructureId, InvoiceId, Operation, PaymentId, Resource},
};

// ---------------------------------------------------------------------------
// Fee structures

#[utoipa::path(
    get,
    path = "/fee-structures",
    tag = "finance",
    summary = "List fee structures",
    params(ListFeeStructuresQuery),
    responses(
        (status = 200, description = "List of fee structures", body = Vec<FeeStructureResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_fee_structures(
    State(state): State<AppState>,
    Query(query): Query<ListFeeStructuresQuery>,
    _: RequiresPermission<resource::Finance, operation::ReadAll>,
) -> Result<Json<Vec<FeeStructureResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = FeeStructures::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = FeeStructureFilter::new(skip, limit)
        .with_academic_year(query.academic_year_id)
        .with_class(query.class_id)
        .with_term(query.term);

    let fees = repo.list(&filter).await?;
    Ok(Json(fees.into_iter().map(FeeStructureResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/fee-structures",
    tag = "finance",
    summary = "Create fee structure",
    request_body = FeeStructureCreate,
    responses(
        (status = 201, description = "Fee structure created", body = FeeStructureResponse),
        (status = 400, description = "Invalid references or negative amount"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_fee_structure(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Finance, operation::CreateAll>,
    Json(create): Json<FeeStructureCreate>,
) -> Result<(StatusCode, Json<FeeStructureResponse>)> {
    if create.amount < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "amount must not be negative".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = FeeStructures::new(&mut pool_conn);

    let fee = repo
        .create(&FeeStructureCreateDBRequest {
            academic_year_id: create.academic_year_id,
            class_id: create.class_id,
            category_name: create.category_name,
            amount: create.amount,
            term: create.term,
            is_mandatory: create.is_mandatory,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(FeeStructureResponse::from(fee))))
}

#[utoipa::path(
    get,
    path = "/fee-structures/{id}",
    tag = "finance",
    summary = "Get fee structure",
    responses(
        (status = 200, description = "Fee structure", body = FeeStructureResponse),
        (status = 404, description = "Fee structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_fee_structure(
    State(state): State<AppState>,
    Path(id): Path<FeeStructureId>,
    _: RequiresPermission<resource::Finance, operation::ReadAll>,
) -> Result<Json<FeeStructureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = FeeStructures::new(&mut pool_conn);

    let fee = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "FeeStructure".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(FeeStructureResponse::from(fee)))
}

#[utoipa::path(
    patch,
    path = "/fee-structures/{id}",
    tag = "finance",
    summary = "Update fee structure",
    request_body = FeeStructureUpdate,
    responses(
        (status = 200, description = "Fee structure updated", body = FeeStructureResponse),
        (status = 404, description = "Fee structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_fee_structure(
    State(state): State<AppState>,
    Path(id): Path<FeeStructureId>,
    _: RequiresPermission<resource::Finance, operation::UpdateAll>,
    Json(update): Json<FeeStructureUpdate>,
) -> Result<Json<FeeStructureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = FeeStructures::new(&mut pool_conn);

    let fee = repo
        .update(
            id,
            &FeeStructureUpdateDBRequest {
                category_name: update.category_name,
                amount: update.amount,
                term: update.term,
                is_mandatory: update.is_mandatory,
            },
        )
        .await?;

    Ok(Json(FeeStructureResponse::from(fee)))
}

#[utoipa::path(
    delete,
    path = "/fee-structures/{id}",
    tag = "finance",
    summary = "Delete fee structure",
    responses(
        (status = 204, description = "Fee structure deleted"),
        (status = 404, description = "Fee structure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_fee_structure(
    State(state): State<AppState>,
    Path(id): Path<FeeStructureId>,
    _: RequiresPermission<resource::Finance, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = FeeStructures::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "FeeStructure".to_string(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Invoices

/// Generate one student's invoice inside the caller's transaction.
///
/// Validates the student, their active enrollment and the absence of an
/// invoice for the same period, sums the applicable mandatory fee structures
/// and writes the invoice with one line item per fee.
async fn generate_invoice_in_tx(
    conn: &mut PgConnection,
    request: &InvoiceGenerateDBRequest,
) -> Result<(InvoiceDBResponse, Vec<InvoiceItemDBResponse>)> {
    {
        let mut students = Students::new(&mut *conn);
        students.get_by_id(request.student_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Student".to_string(),
            id: request.student_id.to_string(),
        })?;
    }

    let year = {
        let mut years = AcademicYears::new(&mut *conn);
        years
            .get_by_id(request.academic_year_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: "AcademicYear".to_string(),
                id: request.academic_year_id.to_string(),
            })?
    };

    let enrollment = {
        let mut enrollments = Enrollments::new(&mut *conn);
        enrollments
            .get_active_for_student(request.student_id)
            .await?
            .ok_or_else(|| Error::BadRequest {
                message: "Student has no active enrollment".to_string(),
            })?
    };

    {
        let mut invoices = Invoices::new(&mut *conn);
        if invoices
            .get_for_period(request.student_id, request.academic_year_id, request.term)
            .await?
            .is_some()
        {
            return Err(Error::Conflict {
                message: "An invoice already exists for this student and term".to_string(),
            });
        }
    }

    let fees = {
        let mut fee_repo = FeeStructures::new(&mut *conn);
        fee_repo
            .applicable(request.academic_year_id, enrollment.class_id, request.term)
            .await?
    };

    if fees.is_empty() {
        return Err(Error::BadRequest {
            message: "No applicable fee structures for this class and term".to_string(),
        });
    }

    let total_amount: Decimal = fees.iter().map(|fee| fee.amount).sum();
    let items: Vec<(Option<FeeStructureId>, String, Decimal)> = fees
        .iter()
        .map(|fee| (Some(fee.id), fee.category_name.clone(), fee.amount))
        .collect();

    let mut invoices = Invoices::new(&mut *conn);

    // Read-then-increment; the unique index on invoice_number converts a lost
    // race into a conflict instead of a duplicated number
    let prefix = invoice_number_prefix(&year.year_name, request.term);
    let latest = invoices.latest_number_with_prefix(&prefix).await?;
    let invoice_number = format_invoice_number(&year.year_name, request.term, next_sequence(latest.as_deref()));

    let (invoice, created_items) = invoices
        .create_with_items(
            &InvoiceInsert {
                invoice_number,
                student_id: request.student_id,
                academic_year_id: request.academic_year_id,
                term: request.term,
                total_amount,
                due_date: request.due_date,
                generated_by: request.generated_by,
            },
            &items,
        )
        .await?;

    Ok((invoice, created_items))
}

#[utoipa::path(
    post,
    path = "/invoices/generate",
    tag = "finance",
    summary = "Generate invoice for a student",
    request_body = InvoiceGenerateRequest,
    responses(
        (status = 201, description = "Invoice with line items", body = InvoiceResponse),
        (status = 400, description = "No active enrollment or no applicable fees"),
        (status = 409, description = "Invoice already exists for the period"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_invoice(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Finance, operation::CreateAll>,
    Json(request): Json<InvoiceGenerateRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>)> {
    let due_days = request.due_days.unwrap_or(state.config.finance.invoice_due_days);
    let due_date = Utc::now().date_naive() + chrono::Duration::days(due_days);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let (invoice, items) = generate_invoice_in_tx(
        &mut tx,
        &InvoiceGenerateDBRequest {
            student_id: request.student_id,
            academic_year_id: request.academic_year_id,
            term: request.term,
            due_date,
            generated_by: Some(current_user.id),
        },
    )
    .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let response =
        InvoiceResponse::from(invoice).with_items(items.into_iter().map(InvoiceItemResponse::from).collect());
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/invoices/generate-bulk",
    tag = "finance",
    summary = "Generate invoices for a class",
    description = "Best-effort over every active enrollment of the class; each student's invoice is its own transaction and failures are reported per student.",
    request_body = BulkInvoiceGenerateRequest,
    responses(
        (status = 200, description = "Mixed invoices/errors report", body = BulkInvoiceReport),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_invoices_bulk(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Finance, operation::CreateAll>,
    Json(request): Json<BulkInvoiceGenerateRequest>,
) -> Result<Json<BulkInvoiceReport>> {
    let due_date = Utc::now().date_naive() + chrono::Duration::days(state.config.finance.invoice_due_days);

    let enrollments = {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut repo = Enrollments::new(&mut pool_conn);
        repo.list_active_by_class(request.class_id).await?
    };

    let mut invoices = Vec::new();
    let mut errors = Vec::new();

    for enrollment in enrollments {
        let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

        let result = generate_invoice_in_tx(
            &mut tx,
            &InvoiceGenerateDBRequest {
                student_id: enrollment.student_id,
                academic_year_id: request.academic_year_id,
                term: request.term,
                due_date,
                generated_by: Some(current_user.id),
            },
        )
        .await;

        match result {
            Ok((invoice, items)) => {
                tx.commit().await.map_err(|e| Error::Database(e.into()))?;
                invoices.push(
                    InvoiceResponse::from(invoice).with_items(items.into_iter().map(InvoiceItemResponse::from).collect()),
                );
            }
            Err(e) => {
                // Rolls back on drop; record the per-student failure and move on
                errors.push(BulkInvoiceError {
                    student_id: enrollment.student_id,
                    error: e.user_message(),
                });
            }
        }
    }

    Ok(Json(BulkInvoiceReport { invoices, errors }))
}

#[utoipa::path(
    get,
    path = "/invoices",
    tag = "finance",
    summary = "List invoices",
    params(ListInvoicesQuery),
    responses(
        (status = 200, description = "List of invoices", body = Vec<InvoiceResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_invoices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Own-scoped callers must name one of their own students
    super::ensure_some_read_access(&current_user, Resource::Finance)?;
    if !has_permission(&current_user, Resource::Finance, Operation::ReadAll) {
        let Some(student_id) = query.student_id else {
            return Err(Error::BadRequest {
                message: "student_id is required when reading your own records".to_string(),
            });
        };
        super::ensure_can_read_student(&current_user, Resource::Finance, student_id, &mut pool_conn).await?;
    }

    let mut repo = Invoices::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = InvoiceFilter::new(skip, limit)
        .with_student(query.student_id)
        .with_academic_year(query.academic_year_id)
        .with_term(query.term)
        .with_status(query.status);

    let invoices = repo.list(&filter).await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/invoices/{id}",
    tag = "finance",
    summary = "Get invoice with line items",
    responses(
        (status = 200, description = "Invoice", body = InvoiceResponse),
        (status = 404, description = "Invoice not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
    current_user: CurrentUser,
) -> Result<Json<InvoiceResponse>> {
    super::ensure_some_read_access(&current_user, Resource::Finance)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let invoice = {
        let mut repo = Invoices::new(&mut pool_conn);
        repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Invoice".to_string(),
            id: id.to_string(),
        })?
    };
    super::ensure_can_read_student(&current_user, Resource::Finance, invoice.student_id, &mut pool_conn).await?;

    let items = {
        let mut repo = Invoices::new(&mut pool_conn);
        repo.items(id).await?
    };

    Ok(Json(
        InvoiceResponse::from(invoice).with_items(items.into_iter().map(InvoiceItemResponse::from).collect()),
    ))
}

#[utoipa::path(
    get,
    path = "/invoices/{id}/payments",
    tag = "finance",
    summary = "Payment history for an invoice",
    responses(
        (status = 200, description = "Payments applied to the invoice", body = Vec<PaymentResponse>),
        (status = 404, description = "Invoice not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_invoice_payments(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<PaymentResponse>>> {
    super::ensure_some_read_access(&current_user, Resource::Finance)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let invoice = {
        let mut invoices = Invoices::new(&mut pool_conn);
        invoices.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Invoice".to_string(),
            id: id.to_string(),
        })?
    };
    super::ensure_can_read_student(&current_user, Resource::Finance, invoice.student_id, &mut pool_conn).await?;

    let mut payments = Payments::new(&mut pool_conn);
    let history = payments.list(&PaymentFilter::new(0, 1000).with_invoice(Some(id))).await?;
    Ok(Json(history.into_iter().map(PaymentResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Payments

#[utoipa::path(
    post,
    path = "/payments",
    tag = "finance",
    summary = "Record payment against an invoice",
    request_body = PaymentCreate,
    responses(
        (status = 201, description = "Payment and the updated invoice", body = PaymentRecordedResponse),
        (status = 400, description = "Amount not positive or exceeds the balance"),
        (status = 404, description = "Invoice not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Finance, operation::CreateAll>,
    Json(request): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentRecordedResponse>)> {
    if request.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Payment amount must be greater than zero".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let invoice = {
        let mut invoices = Invoices::new(&mut tx);
        invoices.get_by_id(request.invoice_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Invoice".to_string(),
            id: request.invoice_id.to_string(),
        })?
    };

    if request.amount > invoice.balance {
        return Err(Error::BadRequest {
            message: format!(
                "Payment amount {} exceeds the outstanding balance {}",
                request.amount, invoice.balance
            ),
        });
    }

    let payment = {
        let mut payments = Payments::new(&mut tx);
        let payment_number = payments.next_payment_number().await?;
        payments
            .create(
                &payment_number,
                &PaymentCreateDBRequest {
                    invoice_id: request.invoice_id,
                    amount: request.amount,
                    payment_method: request.payment_method,
                    transaction_reference: request.transaction_reference,
                    received_by: Some(current_user.id),
                },
            )
            .await?
    };

    let updated_invoice = {
        let mut invoices = Invoices::new(&mut tx);
        invoices.apply_payment(request.invoice_id, request.amount).await?
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRecordedResponse {
            payment: PaymentResponse::from(payment),
            invoice: InvoiceResponse::from(updated_invoice),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/payments",
    tag = "finance",
    summary = "List payments",
    params(ListPaymentsQuery),
    responses(
        (status = 200, description = "List of payments", body = Vec<PaymentResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Own-scoped callers must name one of their own students
    super::ensure_some_read_access(&current_user, Resource::Finance)?;
    if !has_permission(&current_user, Resource::Finance, Operation::ReadAll) {
        let Some(student_id) = query.student_id else {
            return Err(Error::BadRequest {
                message: "student_id is required when reading your own records".to_string(),
            });
        };
        super::ensure_can_read_student(&current_user, Resource::Finance, student_id, &mut pool_conn).await?;
    }

    let mut repo = Payments::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = PaymentFilter::new(skip, limit)
        .with_invoice(query.invoice_id)
        .with_student(query.student_id);

    let payments = repo.list(&filter).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "finance",
    summary = "Get payment",
    responses(
        (status = 200, description = "Payment", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    _: RequiresPermission<resource::Finance, operation::ReadAll>,
) -> Result<Json<PaymentResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut pool_conn);

    let payment = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Payment".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(PaymentResponse::from(payment)))
}

// ---------------------------------------------------------------------------
// Expenditures

#[utoipa::path(
    get,
    path = "/expenditures",
    tag = "finance",
    summary = "List expenditures",
    params(ListExpendituresQuery),
    responses(
        (status = 200, description = "List of expenditures", body = Vec<ExpenditureResponse>),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_expenditures(
    State(state): State<AppState>,
    Query(query): Query<ListExpendituresQuery>,
    _: RequiresPermission<resource::Expenditures, operation::ReadAll>,
) -> Result<Json<Vec<ExpenditureResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Expenditures::new(&mut pool_conn);

    let (skip, limit) = query.pagination.params();
    let filter = ExpenditureFilter::new(skip, limit)
        .with_category(query.category)
        .with_date_range(query.start_date, query.end_date);

    let expenditures = repo.list(&filter).await?;
    Ok(Json(expenditures.into_iter().map(ExpenditureResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/expenditures",
    tag = "finance",
    summary = "Record expenditure",
    request_body = ExpenditureCreate,
    responses(
        (status = 201, description = "Expenditure recorded", body = ExpenditureResponse),
        (status = 400, description = "Negative amount"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_expenditure(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Expenditures, operation::CreateAll>,
    Json(create): Json<ExpenditureCreate>,
) -> Result<(StatusCode, Json<ExpenditureResponse>)> {
    if create.amount < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "amount must not be negative".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Expenditures::new(&mut pool_conn);

    let expenditure = repo
        .create(&ExpenditureCreateDBRequest {
            item_name: create.item_name,
            category: create.category,
            amount: create.amount,
            transaction_date: create.transaction_date,
            paid_to: create.paid_to,
            recorded_by: Some(current_user.id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ExpenditureResponse::from(expenditure))))
}

#[utoipa::path(
    get,
    path = "/expenditures/{id}",
    tag = "finance",
    summary = "Get expenditure",
    responses(
        (status = 200, description = "Expenditure", body = ExpenditureResponse),
        (status = 404, description = "Expenditure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_expenditure(
    State(state): State<AppState>,
    Path(id): Path<ExpenditureId>,
    _: RequiresPermission<resource::Expenditures, operation::ReadAll>,
) -> Result<Json<ExpenditureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Expenditures::new(&mut pool_conn);

    let expenditure = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Expenditure".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(ExpenditureResponse::from(expenditure)))
}

#[utoipa::path(
    patch,
    path = "/expenditures/{id}",
    tag = "finance",
    summary = "Update expenditure",
    request_body = ExpenditureUpdate,
    responses(
        (status = 200, description = "Expenditure updated", body = ExpenditureResponse),
        (status = 404, description = "Expenditure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_expenditure(
    State(state): State<AppState>,
    Path(id): Path<ExpenditureId>,
    _: RequiresPermission<resource::Expenditures, operation::UpdateAll>,
    Json(update): Json<ExpenditureUpdate>,
) -> Result<Json<ExpenditureResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Expenditures::new(&mut pool_conn);

    let expenditure = repo
        .update(
            id,
            &ExpenditureUpdateDBRequest {
                item_name: update.item_name,
                category: update.category,
                amount: update.amount,
                transaction_date: update.transaction_date,
                paid_to: update.paid_to,
            },
        )
        .await?;

    Ok(Json(ExpenditureResponse::from(expenditure)))
}

#[utoipa::path(
    delete,
    path = "/expenditures/{id}",
    tag = "finance",
    summary = "Delete expenditure",
    responses(
        (status = 204, description = "Expenditure deleted"),
        (status = 404, description = "Expenditure not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_expenditure(
    State(state): State<AppState>,
    Path(id): Path<ExpenditureId>,
    _: RequiresPermission<resource::Expenditures, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Expenditures::new(&mut pool_conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Expenditure".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{
        auth_header, create_test_admin, create_test_app, create_test_user, link_student_to_user, seed_fee_structure,
        seed_school,
    };
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_invoice_generation_sums_applicable_fees(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;

        // Term-1 tuition plus an all-terms levy; a term-2 fee must not appear
        seed_fee_structure(&pool, fixture.academic_year_id, None, "Tuition", "30000", "1").await;
        seed_fee_structure(&pool, fixture.academic_year_id, Some(fixture.class_id), "Library levy", "2000", "all").await;
        seed_fee_structure(&pool, fixture.academic_year_id, None, "Term two tuition", "31000", "2").await;

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/invoices/generate")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let invoice: serde_json::Value = response.json();
        assert_eq!(invoice["total_amount"], "32000.00");
        assert_eq!(invoice["balance"], "32000.00");
        assert_eq!(invoice["status"], "unpaid");
        assert_eq!(invoice["items"].as_array().unwrap().len(), 2);
        assert!(invoice["invoice_number"].as_str().unwrap().starts_with("INV-2025-1-"));

        // A second invoice for the same period conflicts
        let (name, value) = auth_header(&admin);
        let duplicate = server
            .post("/api/v1/invoices/generate")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await;
        duplicate.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_payment_rules_and_status_transitions(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;
        seed_fee_structure(&pool, fixture.academic_year_id, None, "Tuition", "10000", "1").await;

        let (name, value) = auth_header(&admin);
        let invoice: serde_json::Value = server
            .post("/api/v1/invoices/generate")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await
            .json();
        let invoice_id = invoice["id"].as_str().unwrap();

        // Zero and overpayment are rejected
        for amount in ["0", "10001"] {
            let (name, value) = auth_header(&admin);
            let rejected = server
                .post("/api/v1/payments")
                .add_header(name, value)
                .json(&serde_json::json!({
                    "invoice_id": invoice_id,
                    "amount": amount,
                    "payment_method": "cash"
                }))
                .await;
            rejected.assert_status(axum::http::StatusCode::BAD_REQUEST);
        }

        // A partial payment flips the status and reduces the balance
        let (name, value) = auth_header(&admin);
        let partial: serde_json::Value = server
            .post("/api/v1/payments")
            .add_header(name, value)
            .json(&serde_json::json!({
                "invoice_id": invoice_id,
                "amount": "4000",
                "payment_method": "cash"
            }))
            .await
            .json();
        assert_eq!(partial["invoice"]["status"], "partial");
        assert_eq!(partial["invoice"]["balance"], "6000.00");
        assert!(partial["payment"]["payment_number"].as_str().unwrap().starts_with("PAY-"));

        // Settling the rest marks the invoice paid
        let (name, value) = auth_header(&admin);
        let settled: serde_json::Value = server
            .post("/api/v1/payments")
            .add_header(name, value)
            .json(&serde_json::json!({
                "invoice_id": invoice_id,
                "amount": "6000",
                "payment_method": "bank_transfer"
            }))
            .await
            .json();
        assert_eq!(settled["invoice"]["status"], "paid");
        assert_eq!(settled["invoice"]["balance"], "0.00");

        // Nothing left to pay
        let (name, value) = auth_header(&admin);
        let over = server
            .post("/api/v1/payments")
            .add_header(name, value)
            .json(&serde_json::json!({
                "invoice_id": invoice_id,
                "amount": "1",
                "payment_method": "cash"
            }))
            .await;
        over.assert_status(axum::http::StatusCode::BAD_REQUEST);

        // Both payments show in the invoice history
        let (name, value) = auth_header(&admin);
        let history: Vec<serde_json::Value> = server
            .get(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(history.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_students_read_only_their_own_invoices(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;
        seed_fee_structure(&pool, fixture.academic_year_id, None, "Tuition", "10000", "1").await;

        let (name, value) = auth_header(&admin);
        let invoice: serde_json::Value = server
            .post("/api/v1/invoices/generate")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await
            .json();
        let invoice_id = invoice["id"].as_str().unwrap();

        let student_user = create_test_user(&pool, Role::Student).await;
        link_student_to_user(&pool, fixture.student_id, student_user.id).await;

        // Without naming themselves the list is rejected
        let (name, value) = auth_header(&student_user);
        let unscoped = server.get("/api/v1/invoices").add_header(name, value).await;
        unscoped.assert_status(axum::http::StatusCode::BAD_REQUEST);

        // Their own invoices are visible
        let (name, value) = auth_header(&student_user);
        let own: Vec<serde_json::Value> = server
            .get(&format!("/api/v1/invoices?student_id={}", fixture.student_id))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(own.len(), 1);

        let (name, value) = auth_header(&student_user);
        let detail = server
            .get(&format!("/api/v1/invoices/{invoice_id}"))
            .add_header(name, value)
            .await;
        detail.assert_status_ok();

        // Another student's records are not
        let (name, value) = auth_header(&student_user);
        let foreign = server
            .get(&format!("/api/v1/invoices?student_id={}", fixture.other_student_id))
            .add_header(name, value)
            .await;
        foreign.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_bulk_generation_reports_per_student(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin(&pool).await;
        let fixture = seed_school(&pool).await;
        seed_fee_structure(&pool, fixture.academic_year_id, None, "Tuition", "10000", "1").await;

        // Pre-generate for one of the two enrolled students
        let (name, value) = auth_header(&admin);
        server
            .post("/api/v1/invoices/generate")
            .add_header(name, value)
            .json(&serde_json::json!({
                "student_id": fixture.student_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let (name, value) = auth_header(&admin);
        let response = server
            .post("/api/v1/invoices/generate-bulk")
            .add_header(name, value)
            .json(&serde_json::json!({
                "class_id": fixture.class_id,
                "academic_year_id": fixture.academic_year_id,
                "term": "1"
            }))
            .await;
        response.assert_status_ok();

        let report: serde_json::Value = response.json();
        assert_eq!(report["invoices"].as_array().unwrap().len(), 1);
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);

        // Sequential numbering continued across the two generations
        let numbers: Vec<String> = report["invoices"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["invoice_number"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(numbers, vec!["INV-2025-1-00002".to_string()]);
    }
}
