//! OpenAPI documentation for the management API, served via Scalar at
//! `/admin/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::handlers;

/// Registers the two ways a session token is presented: as a Bearer token or
/// as the session cookie set at login.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "BearerAuth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
        components.add_security_scheme(
            "CookieAuth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("registrar_session"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "registrar",
        description = "School administration backend: records, enrollment, grading, attendance, billing, payroll and timetabling."
    ),
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::register,
        handlers::auth::me,
        handlers::auth::change_password,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::people::list_students,
        handlers::people::create_student,
        handlers::people::get_student,
        handlers::people::update_student,
        handlers::people::delete_student,
        handlers::people::transfer_student,
        handlers::people::list_parents,
        handlers::people::create_parent,
        handlers::people::get_parent,
        handlers::people::update_parent,
        handlers::people::delete_parent,
        handlers::people::list_parent_children,
        handlers::people::list_staff,
        handlers::people::create_staff,
        handlers::people::get_staff,
        handlers::people::update_staff,
        handlers::people::delete_staff,
        handlers::academics::list_academic_years,
        handlers::academics::create_academic_year,
        handlers::academics::get_academic_year,
        handlers::academics::update_academic_year,
        handlers::academics::delete_academic_year,
        handlers::academics::list_subjects,
        handlers::academics::create_subject,
        handlers::academics::get_subject,
        handlers::academics::update_subject,
        handlers::academics::delete_subject,
        handlers::academics::list_classes,
        handlers::academics::create_class,
        handlers::academics::get_class,
        handlers::academics::update_class,
        handlers::academics::delete_class,
        handlers::academics::list_enrollments,
        handlers::academics::create_enrollment,
        handlers::academics::get_enrollment,
        handlers::academics::update_enrollment,
        handlers::academics::delete_enrollment,
        handlers::academics::list_subject_assignments,
        handlers::academics::create_subject_assignment,
        handlers::academics::update_subject_assignment,
        handlers::academics::delete_subject_assignment,
        handlers::attendance::list_attendance,
        handlers::attendance::create_attendance,
        handlers::attendance::get_attendance,
        handlers::attendance::update_attendance,
        handlers::attendance::delete_attendance,
        handlers::attendance::bulk_mark_attendance,
        handlers::attendance::attendance_report,
        handlers::attendance::attendance_defaulters,
        handlers::attendance::list_staff_attendance,
        handlers::attendance::create_staff_attendance,
        handlers::attendance::update_staff_attendance,
        handlers::attendance::delete_staff_attendance,
        handlers::grades::list_grades,
        handlers::grades::create_grade,
        handlers::grades::get_grade,
        handlers::grades::update_grade,
        handlers::grades::delete_grade,
        handlers::grades::bulk_create_grades,
        handlers::grades::student_report,
        handlers::grades::class_report,
        handlers::grades::subject_statistics,
        handlers::finance::list_fee_structures,
        handlers::finance::create_fee_structure,
        handlers::finance::get_fee_structure,
        handlers::finance::update_fee_structure,
        handlers::finance::delete_fee_structure,
        handlers::finance::generate_invoice,
        handlers::finance::generate_invoices_bulk,
        handlers::finance::list_invoices,
        handlers::finance::get_invoice,
        handlers::finance::list_invoice_payments,
        handlers::finance::create_payment,
        handlers::finance::list_payments,
        handlers::finance::get_payment,
        handlers::finance::list_expenditures,
        handlers::finance::create_expenditure,
        handlers::finance::get_expenditure,
        handlers::finance::update_expenditure,
        handlers::finance::delete_expenditure,
        handlers::payroll::list_salary_structures,
        handlers::payroll::create_salary_structure,
        handlers::payroll::get_salary_structure,
        handlers::payroll::update_salary_structure,
        handlers::payroll::delete_salary_structure,
        handlers::payroll::process_salary,
        handlers::payroll::list_salary_payments,
        handlers::payroll::get_salary_payment,
        handlers::payroll::mark_salary_paid,
        handlers::payroll::list_leave_requests,
        handlers::payroll::create_leave_request,
        handlers::payroll::get_leave_request,
        handlers::payroll::approve_leave_request,
        handlers::payroll::reject_leave_request,
        handlers::payroll::delete_leave_request,
        handlers::timetable::list_timetable_entries,
        handlers::timetable::create_timetable_entry,
        handlers::timetable::get_timetable_entry,
        handlers::timetable::update_timetable_entry,
        handlers::timetable::delete_timetable_entry,
        handlers::timetable::class_schedule,
        handlers::timetable::check_conflicts,
        handlers::timetable::list_syllabi,
        handlers::timetable::create_syllabus,
        handlers::timetable::get_syllabus,
        handlers::timetable::update_syllabus,
        handlers::timetable::delete_syllabus,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Login, sessions and password management"),
        (name = "users", description = "Account administration"),
        (name = "students", description = "Student records"),
        (name = "parents", description = "Parent records"),
        (name = "staff", description = "Staff records and onboarding"),
        (name = "academics", description = "Years, subjects, classes, enrollments"),
        (name = "attendance", description = "Daily attendance and reports"),
        (name = "grades", description = "Marks entry and grading reports"),
        (name = "finance", description = "Fees, invoices, payments, expenditures"),
        (name = "payroll", description = "Salary structures, payment runs, leave"),
        (name = "timetable", description = "Weekly schedule and syllabi"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi as _;

    #[test]
    fn document_builds_and_carries_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("BearerAuth"));
        assert!(components.security_schemes.contains_key("CookieAuth"));
        assert!(doc.paths.paths.contains_key("/invoices/generate"));
        assert!(doc.paths.paths.contains_key("/timetable/check-conflicts"));
    }
}
