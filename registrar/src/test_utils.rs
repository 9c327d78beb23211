//! Test utilities for integration testing (available with `test-utils` feature).

use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        people::StaffType,
        users::{CurrentUser, Role},
    },
    auth::{password, session},
    db::{
        handlers::{AcademicYears, Classes, Enrollments, Repository, Staff, Students, Subjects, Users},
        models::{
            academics::{AcademicYearCreateDBRequest, ClassCreateDBRequest, EnrollmentCreateDBRequest, SubjectCreateDBRequest},
            people::{StaffCreateDBRequest, StudentCreateDBRequest},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    types::{AcademicYearId, ClassId, EnrollmentId, StaffId, StudentId, SubjectId, UserId},
};

pub fn create_test_config() -> crate::config::Config {
    let mut config = crate::config::Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@school.test".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.auth.native.session.cookie_secure = false;
    config
}

/// Build a TestServer over the full router, backed by the given pool.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();
    let state = AppState::builder().db(pool).config(config).build();
    let router = crate::build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Bearer header for a user, signed with the test config's secret.
pub fn auth_header(user: &CurrentUser) -> (String, String) {
    let token = session::create_session_token(user, &create_test_config()).expect("Failed to create session token");
    ("authorization".to_string(), format!("Bearer {token}"))
}

pub async fn create_test_user(pool: &PgPool, role: Role) -> CurrentUser {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let username = format!("testuser_{}", Uuid::new_v4().simple());

    let user = users_repo
        .create(&UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            role,
            is_admin: false,
            password_hash: None,
        })
        .await
        .expect("Failed to create test user");

    CurrentUser::from(user)
}

pub async fn create_test_admin(pool: &PgPool) -> CurrentUser {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let username = format!("testadmin_{}", Uuid::new_v4().simple());

    let user = users_repo
        .create(&UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            role: Role::Admin,
            is_admin: true,
            password_hash: None,
        })
        .await
        .expect("Failed to create test admin user");

    CurrentUser::from(user)
}

pub async fn create_test_user_with_password(pool: &PgPool, role: Role, raw_password: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let username = format!("testuser_{}", Uuid::new_v4().simple());
    let password_hash = password::hash_string(raw_password).expect("Failed to hash password");

    users_repo
        .create(&UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            role,
            is_admin: false,
            password_hash: Some(password_hash),
        })
        .await
        .expect("Failed to create test user")
}

/// Attach a student record to a login account.
pub async fn link_student_to_user(pool: &PgPool, student_id: StudentId, user_id: UserId) {
    sqlx::query("UPDATE students SET user_id = $1 WHERE id = $2")
        .bind(user_id)
        .bind(student_id)
        .execute(pool)
        .await
        .expect("Failed to link student to user");
}

/// A minimal school: one academic year, two classes, one subject, two
/// students enrolled in the first class, and one teaching staff member.
pub struct SchoolFixture {
    pub academic_year_id: AcademicYearId,
    pub class_id: ClassId,
    pub other_class_id: ClassId,
    pub subject_id: SubjectId,
    pub student_id: StudentId,
    pub other_student_id: StudentId,
    pub enrollment_id: EnrollmentId,
    pub staff_id: StaffId,
}

pub async fn seed_school(pool: &PgPool) -> SchoolFixture {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    let year = AcademicYears::new(&mut conn)
        .create(&AcademicYearCreateDBRequest {
            year_name: "2025/26".to_string(),
            start_date: "2025-09-01".parse().unwrap(),
            end_date: "2026-07-15".parse().unwrap(),
            is_current: true,
        })
        .await
        .expect("Failed to create academic year");

    let mut class_ids = Vec::new();
    for name in ["Form 2A", "Form 2B"] {
        let class = Classes::new(&mut conn)
            .create(&ClassCreateDBRequest {
                class_name: name.to_string(),
                academic_year_id: year.id,
                class_teacher_id: None,
                capacity: 40,
                room_number: String::new(),
            })
            .await
            .expect("Failed to create class");
        class_ids.push(class.id);
    }

    let subject = Subjects::new(&mut conn)
        .create(&SubjectCreateDBRequest {
            subject_name: "English".to_string(),
            subject_code: "ENG".to_string(),
            grade_level: String::new(),
        })
        .await
        .expect("Failed to create subject");

    let mut student_ids = Vec::new();
    let mut enrollment_ids = Vec::new();
    for (admission_number, first_name) in [("ADM-100", "Kemi"), ("ADM-101", "Sade")] {
        let student = Students::new(&mut conn)
            .create(&StudentCreateDBRequest {
                user_id: None,
                parent_id: None,
                admission_number: admission_number.to_string(),
                first_name: first_name.to_string(),
                last_name: "Adeyemi".to_string(),
                date_of_birth: None,
                gender: None,
                admission_date: None,
                address: String::new(),
            })
            .await
            .expect("Failed to create student");
        student_ids.push(student.id);

        let enrollment = Enrollments::new(&mut conn)
            .create(&EnrollmentCreateDBRequest {
                student_id: student.id,
                class_id: class_ids[0],
                roll_number: None,
            })
            .await
            .expect("Failed to enroll student");
        enrollment_ids.push(enrollment.id);
    }

    let staff = Staff::new(&mut conn)
        .create(&StaffCreateDBRequest {
            user_id: None,
            first_name: "Femi".to_string(),
            last_name: "Ola".to_string(),
            gender: None,
            date_of_birth: None,
            address: String::new(),
            health_info: String::new(),
            staff_type: StaffType::Teaching,
            specialization: "English".to_string(),
            employment_date: None,
        })
        .await
        .expect("Failed to create staff");

    SchoolFixture {
        academic_year_id: year.id,
        class_id: class_ids[0],
        other_class_id: class_ids[1],
        subject_id: subject.id,
        student_id: student_ids[0],
        other_student_id: student_ids[1],
        enrollment_id: enrollment_ids[0],
        staff_id: staff.id,
    }
}

/// Insert a fee structure row directly; term is the wire value ('1'..'3' or 'all').
pub async fn seed_fee_structure(
    pool: &PgPool,
    academic_year_id: AcademicYearId,
    class_id: Option<ClassId>,
    category_name: &str,
    amount: &str,
    term: &str,
) {
    sqlx::query(
        "INSERT INTO fee_structures (id, academic_year_id, class_id, category_name, amount, term, is_mandatory)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE)",
    )
    .bind(Uuid::new_v4())
    .bind(academic_year_id)
    .bind(class_id)
    .bind(category_name)
    .bind(amount.parse::<Decimal>().expect("Invalid amount"))
    .bind(term)
    .execute(pool)
    .await
    .expect("Failed to create fee structure");
}
