//! Database repositories for students, parents and staff.

use crate::api::models::people::{StaffType, StudentStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::people::{
        ParentCreateDBRequest, ParentDBResponse, ParentUpdateDBRequest, StaffCreateDBRequest, StaffDBResponse,
        StaffUpdateDBRequest, StudentCreateDBRequest, StudentDBResponse, StudentUpdateDBRequest,
    },
};
use crate::types::{ParentId, StaffId, StudentId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing students
#[derive(Debug, Clone)]
pub struct StudentFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<StudentStatus>,
    pub search: Option<String>,
}

impl StudentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            status: None,
            search: None,
        }
    }

    pub fn with_status(mut self, status: Option<StudentStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Students<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Students<'c> {
    type CreateRequest = StudentCreateDBRequest;
    type UpdateRequest = StudentUpdateDBRequest;
    type Response = StudentDBResponse;
    type Id = StudentId;
    type Filter = StudentFilter;

    #[instrument(skip(self, request), fields(admission_number = %request.admission_number), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let student = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            INSERT INTO students (id, user_id, parent_id, admission_number, first_name, last_name,
                                  date_of_birth, gender, admission_date, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.parent_id)
        .bind(&request.admission_number)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(request.gender)
        .bind(request.admission_date)
        .bind(&request.address)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(student)
    }

    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let student = sqlx::query_as::<_, StudentDBResponse>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(student)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let students = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            SELECT * FROM students
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR first_name ILIKE '%' || $2 || '%'
                   OR last_name ILIKE '%' || $2 || '%'
                   OR admission_number ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.status)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(students)
    }

    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let student = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            UPDATE students SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                gender = COALESCE($5, gender),
                status = COALESCE($6, status),
                address = COALESCE($7, address),
                parent_id = COALESCE($8, parent_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(request.gender)
        .bind(request.status)
        .bind(&request.address)
        .bind(request.parent_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(student)
    }
}

impl<'c> Students<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(parent_id = %abbrev_uuid(&parent_id)), err)]
    pub async fn list_by_parent(&mut self, parent_id: ParentId) -> Result<Vec<StudentDBResponse>> {
        let students = sqlx::query_as::<_, StudentDBResponse>(
            "SELECT * FROM students WHERE parent_id = $1 ORDER BY first_name, last_name",
        )
        .bind(parent_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(students)
    }
}

/// Filter for listing parents
#[derive(Debug, Clone)]
pub struct ParentFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl ParentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Parents<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Parents<'c> {
    type CreateRequest = ParentCreateDBRequest;
    type UpdateRequest = ParentUpdateDBRequest;
    type Response = ParentDBResponse;
    type Id = ParentId;
    type Filter = ParentFilter;

    #[instrument(skip(self, request), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let parent = sqlx::query_as::<_, ParentDBResponse>(
            r#"
            INSERT INTO parents (id, user_id, first_name, last_name, phone_number, email, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.phone_number)
        .bind(&request.email)
        .bind(&request.address)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(parent)
    }

    #[instrument(skip(self), fields(parent_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let parent = sqlx::query_as::<_, ParentDBResponse>("SELECT * FROM parents WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(parent)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let parents = sqlx::query_as::<_, ParentDBResponse>(
            r#"
            SELECT * FROM parents
            WHERE ($1::text IS NULL OR first_name ILIKE '%' || $1 || '%'
                   OR last_name ILIKE '%' || $1 || '%'
                   OR phone_number ILIKE '%' || $1 || '%'
                   OR email ILIKE '%' || $1 || '%')
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(parents)
    }

    #[instrument(skip(self), fields(parent_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM parents WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(parent_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let parent = sqlx::query_as::<_, ParentDBResponse>(
            r#"
            UPDATE parents SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_number = COALESCE($4, phone_number),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.phone_number)
        .bind(&request.email)
        .bind(&request.address)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(parent)
    }
}

impl<'c> Parents<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

/// Filter for listing staff
#[derive(Debug, Clone)]
pub struct StaffFilter {
    pub skip: i64,
    pub limit: i64,
    pub staff_type: Option<StaffType>,
    pub search: Option<String>,
}

impl StaffFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            staff_type: None,
            search: None,
        }
    }

    pub fn with_staff_type(mut self, staff_type: Option<StaffType>) -> Self {
        self.staff_type = staff_type;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }
}

pub struct Staff<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Staff<'c> {
    type CreateRequest = StaffCreateDBRequest;
    type UpdateRequest = StaffUpdateDBRequest;
    type Response = StaffDBResponse;
    type Id = StaffId;
    type Filter = StaffFilter;

    #[instrument(skip(self, request), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let staff = sqlx::query_as::<_, StaffDBResponse>(
            r#"
            INSERT INTO staff (id, user_id, first_name, last_name, gender, date_of_birth,
                               address, health_info, staff_type, specialization, employment_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.gender)
        .bind(request.date_of_birth)
        .bind(&request.address)
        .bind(&request.health_info)
        .bind(request.staff_type)
        .bind(&request.specialization)
        .bind(request.employment_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(staff)
    }

    #[instrument(skip(self), fields(staff_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let staff = sqlx::query_as::<_, StaffDBResponse>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(staff)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let staff = sqlx::query_as::<_, StaffDBResponse>(
            r#"
            SELECT * FROM staff
            WHERE ($1::text IS NULL OR staff_type = $1)
              AND ($2::text IS NULL OR first_name ILIKE '%' || $2 || '%'
                   OR last_name ILIKE '%' || $2 || '%'
                   OR specialization ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.staff_type)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(staff)
    }

    #[instrument(skip(self), fields(staff_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(staff_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let staff = sqlx::query_as::<_, StaffDBResponse>(
            r#"
            UPDATE staff SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                gender = COALESCE($4, gender),
                date_of_birth = COALESCE($5, date_of_birth),
                address = COALESCE($6, address),
                health_info = COALESCE($7, health_info),
                specialization = COALESCE($8, specialization),
                employment_date = COALESCE($9, employment_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.gender)
        .bind(request.date_of_birth)
        .bind(&request.address)
        .bind(&request.health_info)
        .bind(&request.specialization)
        .bind(request.employment_date)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(staff)
    }
}

impl<'c> Staff<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::api::models::people::Gender;
    use sqlx::PgPool;

    fn student_create(admission_number: &str) -> StudentCreateDBRequest {
        StudentCreateDBRequest {
            user_id: None,
            parent_id: None,
            admission_number: admission_number.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: None,
            gender: Some(Gender::Female),
            admission_date: None,
            address: String::new(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_student_lifecycle(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        let created = repo.create(&student_create("ADM-001")).await.unwrap();
        assert_eq!(created.status, StudentStatus::Active);

        let updated = repo
            .update(
                created.id,
                &StudentUpdateDBRequest {
                    status: Some(StudentStatus::Graduated),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, StudentStatus::Graduated);
        // Untouched fields survive the partial update
        assert_eq!(updated.first_name, "Ada");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_duplicate_admission_number_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Students::new(&mut conn);

        repo.create(&student_create("ADM-001")).await.unwrap();
        let err = repo.create(&student_create("ADM-001")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_deleting_parent_nulls_out_student_link(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let parent = Parents::new(&mut conn)
            .create(&ParentCreateDBRequest {
                user_id: None,
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                phone_number: String::new(),
                email: String::new(),
                address: String::new(),
            })
            .await
            .unwrap();

        let mut students = Students::new(&mut conn);
        let mut create = student_create("ADM-010");
        create.parent_id = Some(parent.id);
        let student = students.create(&create).await.unwrap();

        assert!(Parents::new(&mut conn).delete(parent.id).await.unwrap());

        let survivor = Students::new(&mut conn).get_by_id(student.id).await.unwrap().unwrap();
        assert!(survivor.parent_id.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_staff_type_filter(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Staff::new(&mut conn);

        repo.create(&StaffCreateDBRequest {
            user_id: None,
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            gender: None,
            date_of_birth: None,
            address: String::new(),
            health_info: String::new(),
            staff_type: StaffType::Teaching,
            specialization: "Mathematics".to_string(),
            employment_date: None,
        })
        .await
        .unwrap();

        repo.create(&StaffCreateDBRequest {
            user_id: None,
            first_name: "Mary".to_string(),
            last_name: "Seacole".to_string(),
            gender: None,
            date_of_birth: None,
            address: String::new(),
            health_info: String::new(),
            staff_type: StaffType::NonTeaching,
            specialization: String::new(),
            employment_date: None,
        })
        .await
        .unwrap();

        let teaching = repo
            .list(&StaffFilter::new(0, 50).with_staff_type(Some(StaffType::Teaching)))
            .await
            .unwrap();
        assert_eq!(teaching.len(), 1);
        assert_eq!(teaching[0].first_name, "Alan");
    }
}
