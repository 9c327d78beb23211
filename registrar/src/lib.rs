//! # registrar: School Administration Backend
//!
//! `registrar` is a REST API over PostgreSQL for running a school's
//! back office: student, parent and staff records, enrollment, grading,
//! attendance, billing and invoicing, payroll and timetabling.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence. A request flows
//! through authentication (JWT session, Bearer header or cookie), the
//! role-based permission check, handler validation, and a repository layer
//! that performs the guarded database writes, multi-row writes inside a
//! transaction. There is no background processing: nothing happens in the
//! absence of a request.
//!
//! - **API layer** ([`api`]): management surface under `/api/v1/*` plus the
//!   authentication endpoints at `/authentication/*`, documented via OpenAPI
//!   at `/admin/docs`.
//! - **Authentication** ([`auth`]): argon2 password hashing, JWT sessions
//!   with a login lockout counter, and a fixed role → permission map.
//! - **Database layer** ([`db`]): repository pattern over SQLx, one
//!   repository per entity family, migrations run at startup.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use registrar::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = registrar::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     registrar::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::password,
    db::handlers::Users,
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
};
use axum::{
    Router, http,
    http::HeaderValue,
    routing::{delete, get, patch, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ClassId, EnrollmentId, InvoiceId, StaffId, StudentId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the registrar database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin account on first startup, or refreshes its
/// password when one is supplied and the account already exists.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd)?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if password_hash.is_some() {
            user_repo
                .update(
                    existing_user.id,
                    &UserUpdateDBRequest {
                        password_hash,
                        ..Default::default()
                    },
                )
                .await?;
        }
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created = user_repo
        .create(&UserCreateDBRequest {
            username: email.to_string(),
            email: email.to_string(),
            role: Role::Admin,
            is_admin: true,
            password_hash,
        })
        .await?;

    tx.commit().await?;
    info!("Created initial admin user {}", created.username);
    Ok(created.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: authentication routes, the management API
/// under `/api/v1`, the OpenAPI document, and the CORS/metrics/tracing
/// layers.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes at root level
    let auth_routes = Router::new()
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/me", get(api::handlers::auth::me))
        .route("/authentication/password-change", post(api::handlers::auth::change_password))
        .with_state(state.clone());

    // Management API routes
    let api_routes = Router::new()
        // User management (admin only)
        .route("/users", get(api::handlers::users::list_users))
        .route("/users", post(api::handlers::users::create_user))
        .route("/users/{id}", get(api::handlers::users::get_user))
        .route("/users/{id}", patch(api::handlers::users::update_user))
        .route("/users/{id}", delete(api::handlers::users::delete_user))
        // Students
        .route("/students", get(api::handlers::people::list_students))
        .route("/students", post(api::handlers::people::create_student))
        .route("/students/{id}", get(api::handlers::people::get_student))
        .route("/students/{id}", patch(api::handlers::people::update_student))
        .route("/students/{id}", delete(api::handlers::people::delete_student))
        .route("/students/{id}/transfer", post(api::handlers::people::transfer_student))
        // Parents
        .route("/parents", get(api::handlers::people::list_parents))
        .route("/parents", post(api::handlers::people::create_parent))
        .route("/parents/{id}", get(api::handlers::people::get_parent))
        .route("/parents/{id}", patch(api::handlers::people::update_parent))
        .route("/parents/{id}", delete(api::handlers::people::delete_parent))
        .route("/parents/{id}/children", get(api::handlers::people::list_parent_children))
        // Staff
        .route("/staff", get(api::handlers::people::list_staff))
        .route("/staff", post(api::handlers::people::create_staff))
        .route("/staff/{id}", get(api::handlers::people::get_staff))
        .route("/staff/{id}", patch(api::handlers::people::update_staff))
        .route("/staff/{id}", delete(api::handlers::people::delete_staff))
        // Academic structure
        .route("/academic-years", get(api::handlers::academics::list_academic_years))
        .route("/academic-years", post(api::handlers::academics::create_academic_year))
        .route("/academic-years/{id}", get(api::handlers::academics::get_academic_year))
        .route("/academic-years/{id}", patch(api::handlers::academics::update_academic_year))
        .route("/academic-years/{id}", delete(api::handlers::academics::delete_academic_year))
        .route("/subjects", get(api::handlers::academics::list_subjects))
        .route("/subjects", post(api::handlers::academics::create_subject))
        .route("/subjects/{id}", get(api::handlers::academics::get_subject))
        .route("/subjects/{id}", patch(api::handlers::academics::update_subject))
        .route("/subjects/{id}", delete(api::handlers::academics::delete_subject))
        .route("/classes", get(api::handlers::academics::list_classes))
        .route("/classes", post(api::handlers::academics::create_class))
        .route("/classes/{id}", get(api::handlers::academics::get_class))
        .route("/classes/{id}", patch(api::handlers::academics::update_class))
        .route("/classes/{id}", delete(api::handlers::academics::delete_class))
        .route("/enrollments", get(api::handlers::academics::list_enrollments))
        .route("/enrollments", post(api::handlers::academics::create_enrollment))
        .route("/enrollments/{id}", get(api::handlers::academics::get_enrollment))
        .route("/enrollments/{id}", patch(api::handlers::academics::update_enrollment))
        .route("/enrollments/{id}", delete(api::handlers::academics::delete_enrollment))
        .route("/subject-assignments", get(api::handlers::academics::list_subject_assignments))
        .route("/subject-assignments", post(api::handlers::academics::create_subject_assignment))
        .route(
            "/subject-assignments/{id}",
            patch(api::handlers::academics::update_subject_assignment),
        )
        .route(
            "/subject-assignments/{id}",
            delete(api::handlers::academics::delete_subject_assignment),
        )
        // Attendance; named sub-routes go before the id match
        .route("/attendance/bulk-mark", post(api::handlers::attendance::bulk_mark_attendance))
        .route("/attendance/report", get(api::handlers::attendance::attendance_report))
        .route("/attendance/defaulters", get(api::handlers::attendance::attendance_defaulters))
        .route("/attendance", get(api::handlers::attendance::list_attendance))
        .route("/attendance", post(api::handlers::attendance::create_attendance))
        .route("/attendance/{id}", get(api::handlers::attendance::get_attendance))
        .route("/attendance/{id}", patch(api::handlers::attendance::update_attendance))
        .route("/attendance/{id}", delete(api::handlers::attendance::delete_attendance))
        .route("/staff-attendance", get(api::handlers::attendance::list_staff_attendance))
        .route("/staff-attendance", post(api::handlers::attendance::create_staff_attendance))
        .route("/staff-attendance/{id}", patch(api::handlers::attendance::update_staff_attendance))
        .route("/staff-attendance/{id}", delete(api::handlers::attendance::delete_staff_attendance))
        // Grading
        .route("/grades/bulk", post(api::handlers::grades::bulk_create_grades))
        .route("/grades/student-report", get(api::handlers::grades::student_report))
        .route("/grades/class-report", get(api::handlers::grades::class_report))
        .route("/grades/subject-statistics", get(api::handlers::grades::subject_statistics))
        .route("/grades", get(api::handlers::grades::list_grades))
        .route("/grades", post(api::handlers::grades::create_grade))
        .route("/grades/{id}", get(api::handlers::grades::get_grade))
        .route("/grades/{id}", patch(api::handlers::grades::update_grade))
        .route("/grades/{id}", delete(api::handlers::grades::delete_grade))
        // Finance
        .route("/fee-structures", get(api::handlers::finance::list_fee_structures))
        .route("/fee-structures", post(api::handlers::finance::create_fee_structure))
        .route("/fee-structures/{id}", get(api::handlers::finance::get_fee_structure))
        .route("/fee-structures/{id}", patch(api::handlers::finance::update_fee_structure))
        .route("/fee-structures/{id}", delete(api::handlers::finance::delete_fee_structure))
        .route("/invoices/generate", post(api::handlers::finance::generate_invoice))
        .route("/invoices/generate-bulk", post(api::handlers::finance::generate_invoices_bulk))
        .route("/invoices", get(api::handlers::finance::list_invoices))
        .route("/invoices/{id}", get(api::handlers::finance::get_invoice))
        .route("/invoices/{id}/payments", get(api::handlers::finance::list_invoice_payments))
        .route("/payments", get(api::handlers::finance::list_payments))
        .route("/payments", post(api::handlers::finance::create_payment))
        .route("/payments/{id}", get(api::handlers::finance::get_payment))
        .route("/expenditures", get(api::handlers::finance::list_expenditures))
        .route("/expenditures", post(api::handlers::finance::create_expenditure))
        .route("/expenditures/{id}", get(api::handlers::finance::get_expenditure))
        .route("/expenditures/{id}", patch(api::handlers::finance::update_expenditure))
        .route("/expenditures/{id}", delete(api::handlers::finance::delete_expenditure))
        // Payroll
        .route("/salary-structures", get(api::handlers::payroll::list_salary_structures))
        .route("/salary-structures", post(api::handlers::payroll::create_salary_structure))
        .route("/salary-structures/{id}", get(api::handlers::payroll::get_salary_structure))
        .route("/salary-structures/{id}", patch(api::handlers::payroll::update_salary_structure))
        .route("/salary-structures/{id}", delete(api::handlers::payroll::delete_salary_structure))
        .route("/payroll/process", post(api::handlers::payroll::process_salary))
        .route("/payroll", get(api::handlers::payroll::list_salary_payments))
        .route("/payroll/{id}", get(api::handlers::payroll::get_salary_payment))
        .route("/payroll/{id}/mark-paid", post(api::handlers::payroll::mark_salary_paid))
        .route("/leave-requests", get(api::handlers::payroll::list_leave_requests))
        .route("/leave-requests", post(api::handlers::payroll::create_leave_request))
        .route("/leave-requests/{id}", get(api::handlers::payroll::get_leave_request))
        .route("/leave-requests/{id}", delete(api::handlers::payroll::delete_leave_request))
        .route("/leave-requests/{id}/approve", post(api::handlers::payroll::approve_leave_request))
        .route("/leave-requests/{id}/reject", post(api::handlers::payroll::reject_leave_request))
        // Timetable
        .route("/timetable/class-schedule", get(api::handlers::timetable::class_schedule))
        .route("/timetable/check-conflicts", post(api::handlers::timetable::check_conflicts))
        .route("/timetable", get(api::handlers::timetable::list_timetable_entries))
        .route("/timetable", post(api::handlers::timetable::create_timetable_entry))
        .route("/timetable/{id}", get(api::handlers::timetable::get_timetable_entry))
        .route("/timetable/{id}", patch(api::handlers::timetable::update_timetable_entry))
        .route("/timetable/{id}", delete(api::handlers::timetable::delete_timetable_entry))
        .route("/syllabi", get(api::handlers::timetable::list_syllabi))
        .route("/syllabi", post(api::handlers::timetable::create_syllabus))
        .route("/syllabi/{id}", get(api::handlers::timetable::get_syllabus))
        .route("/syllabi/{id}", patch(api::handlers::timetable::update_syllabus))
        .route("/syllabi/{id}", delete(api::handlers::timetable::delete_syllabus))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/admin/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    // Prometheus metrics if enabled
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    // Tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the pool, runs migrations and
///    seeds the initial admin user
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: on the shutdown signal, drains connections and flushes
///    telemetry
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting registrar with configuration: {:#?}", config);

        let pool_settings = &config.database.pool;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(pool_settings.max_connections)
            .min_connections(pool_settings.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(pool_settings.acquire_timeout_secs))
            .idle_timeout((pool_settings.idle_timeout_secs > 0).then(|| std::time::Duration::from_secs(pool_settings.idle_timeout_secs)))
            .connect(&config.database.url)
            .await?;

        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "registrar listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_healthz_and_docs_are_unauthenticated(pool: PgPool) {
        let server = create_test_app(pool).await;

        server.get("/healthz").await.assert_status_ok();
        server.get("/admin/docs").await.assert_status_ok();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_api_requires_authentication(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let anonymous = server.get("/api/v1/students").await;
        anonymous.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let admin = create_test_admin(&pool).await;
        let (name, value) = auth_header(&admin);
        let authed = server.get("/api/v1/students").add_header(name, value).await;
        authed.assert_status_ok();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_initial_admin_user_is_idempotent(pool: PgPool) {
        let first = create_initial_admin_user("admin@school.test", Some("first-password"), &pool)
            .await
            .unwrap();
        let second = create_initial_admin_user("admin@school.test", Some("rotated-password"), &pool)
            .await
            .unwrap();
        assert_eq!(first, second);

        // The rotated password is the one that verifies
        let mut conn = pool.acquire().await.unwrap();
        let user = crate::db::handlers::Users::new(&mut conn)
            .get_user_by_email("admin@school.test")
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_admin);
        assert!(crate::auth::password::verify_string("rotated-password", user.password_hash.as_ref().unwrap()).unwrap());
    }
}
