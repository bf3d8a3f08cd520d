//! EmployeeRepository and ReviewRepository

use super::{Create, Delete, Read, Update};
use crate::dtos::{CreateEmployeeDTO, CreateReviewDTO, UpdateEmployeeDTO};
use crate::entities::{Employee, StaffReview};
use sqlx::{Error, MySql, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

// EMPLOYEE REPOSITORY
pub struct EmployeeRepository {
    connection_pool: MySqlPool,
}

impl EmployeeRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, available: Option<bool>) -> Result<Vec<Employee>, Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT employee_id, user_id, name, email, phone, position, is_available, created_at
            FROM employees
            WHERE (? IS NULL OR is_available = ?)
            ORDER BY name
            "#,
        )
        .bind(available)
        .bind(available)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Employee row linked to a staff login
    pub async fn find_by_user_id(&self, user_id: &i32) -> Result<Option<Employee>, Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT employee_id, user_id, name, email, phone, position, is_available, created_at
            FROM employees
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Create<Employee, CreateEmployeeDTO> for EmployeeRepository {
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateEmployeeDTO) -> Result<Employee, Error> {
        let result = sqlx::query(
            "INSERT INTO employees (user_id, name, email, phone, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(data.user_id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.position)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Employee created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Employee, i32> for EmployeeRepository {
    async fn read(&self, id: &i32) -> Result<Option<Employee>, Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT employee_id, user_id, name, email, phone, position, is_available, created_at
            FROM employees
            WHERE employee_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Employee, UpdateEmployeeDTO, i32> for EmployeeRepository {
    #[instrument(skip(self, data), fields(employee_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateEmployeeDTO) -> Result<Employee, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;
        if data.name.is_none()
            && data.email.is_none()
            && data.phone.is_none()
            && data.position.is_none()
            && data.is_available.is_none()
        {
            debug!("No fields to update, returning current employee");
            return Ok(current);
        }

        let mut query_builder = QueryBuilder::<MySql>::new("UPDATE employees SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref email) = data.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email);
        }
        if let Some(ref phone) = data.phone {
            separated.push("phone = ");
            separated.push_bind_unseparated(phone);
        }
        if let Some(ref position) = data.position {
            separated.push("position = ");
            separated.push_bind_unseparated(position);
        }
        if let Some(is_available) = data.is_available {
            separated.push("is_available = ");
            separated.push_bind_unseparated(is_available);
        }
        query_builder.push(" WHERE employee_id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&self.connection_pool).await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

impl Delete<i32> for EmployeeRepository {
    /// Assigned appointments and orders fall back to unassigned
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM employees WHERE employee_id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }
}

// REVIEW REPOSITORY

/// Review to insert, with author and subject resolved by the handler
pub struct NewReview<'a> {
    pub employee_id: i32,
    pub user_id: i32,
    pub data: &'a CreateReviewDTO,
}

pub struct ReviewRepository {
    connection_pool: MySqlPool,
}

impl ReviewRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    pub async fn list_by_employee(&self, employee_id: &i32) -> Result<Vec<StaffReview>, Error> {
        sqlx::query_as::<_, StaffReview>(
            r#"
            SELECT review_id, employee_id, user_id, appointment_id, rating, comment, created_at
            FROM staff_reviews
            WHERE employee_id = ?
            ORDER BY created_at DESC, review_id DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Whether the user already reviewed this appointment
    pub async fn exists_for_appointment(
        &self,
        user_id: &i32,
        appointment_id: &i32,
    ) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM staff_reviews WHERE user_id = ? AND appointment_id = ?",
        )
        .bind(user_id)
        .bind(appointment_id)
        .fetch_one(&self.connection_pool)
        .await?;
        Ok(count > 0)
    }
}

impl<'a> Create<StaffReview, NewReview<'a>> for ReviewRepository {
    #[instrument(skip(self, new), fields(employee_id = %new.employee_id, user_id = %new.user_id))]
    async fn create(&self, new: &NewReview<'a>) -> Result<StaffReview, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO staff_reviews (employee_id, user_id, appointment_id, rating, comment)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.user_id)
        .bind(new.data.appointment_id)
        .bind(new.data.rating)
        .bind(&new.data.comment)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Review created with id {}", new_id);
        sqlx::query_as::<_, StaffReview>(
            r#"
            SELECT review_id, employee_id, user_id, appointment_id, rating, comment, created_at
            FROM staff_reviews
            WHERE review_id = ?
            "#,
        )
        .bind(new_id)
        .fetch_one(&self.connection_pool)
        .await
    }
}
