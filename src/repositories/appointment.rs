//! AppointmentRepository - bookings of wash services

use super::{Create, Read};
use crate::dtos::NewAppointment;
use crate::entities::{Appointment, AppointmentStatus};
use sqlx::{Error, MySqlPool};
use tracing::{debug, info, instrument};

pub struct AppointmentRepository {
    connection_pool: MySqlPool,
}

impl AppointmentRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: &i32,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, Error> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT appointment_id, user_id, service_id, vehicle_id, employee_id, scheduled_at,
                   status, notes, created_at, updated_at
            FROM appointments
            WHERE user_id = ? AND (? IS NULL OR status = ?)
            ORDER BY scheduled_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_for_employee(
        &self,
        employee_id: &i32,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, Error> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT appointment_id, user_id, service_id, vehicle_id, employee_id, scheduled_at,
                   status, notes, created_at, updated_at
            FROM appointments
            WHERE employee_id = ? AND (? IS NULL OR status = ?)
            ORDER BY scheduled_at
            "#,
        )
        .bind(employee_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, Error> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT appointment_id, user_id, service_id, vehicle_id, employee_id, scheduled_at,
                   status, notes, created_at, updated_at
            FROM appointments
            WHERE (? IS NULL OR status = ?)
            ORDER BY scheduled_at DESC
            "#,
        )
        .bind(status)
        .bind(status)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Unconditional status write
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        appointment_id: &i32,
        status: AppointmentStatus,
    ) -> Result<Appointment, Error> {
        sqlx::query("UPDATE appointments SET status = ? WHERE appointment_id = ?")
            .bind(status)
            .bind(appointment_id)
            .execute(&self.connection_pool)
            .await?;
        info!("Appointment status set to {:?}", status);
        self.read(appointment_id).await?.ok_or(Error::RowNotFound)
    }

    /// Cancels a booking still PENDING or CONFIRMED in one statement, so a
    /// concurrent status change by staff wins. `None` when it had moved on.
    #[instrument(skip(self))]
    pub async fn cancel_if_open(&self, appointment_id: &i32) -> Result<Option<Appointment>, Error> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET status = 'CANCELLED'
            WHERE appointment_id = ? AND status IN ('PENDING', 'CONFIRMED')
            "#,
        )
        .bind(appointment_id)
        .execute(&self.connection_pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        info!("Appointment cancelled");
        self.read(appointment_id).await
    }

    /// Unconditional assignment. A PENDING booking becomes CONFIRMED once
    /// somebody is on it; any other status is left alone.
    #[instrument(skip(self))]
    pub async fn assign_employee(
        &self,
        appointment_id: &i32,
        employee_id: &i32,
    ) -> Result<Appointment, Error> {
        sqlx::query(
            r#"
            UPDATE appointments
            SET employee_id = ?,
                status = IF(status = 'PENDING', 'CONFIRMED', status)
            WHERE appointment_id = ?
            "#,
        )
        .bind(employee_id)
        .bind(appointment_id)
        .execute(&self.connection_pool)
        .await?;
        debug!("Appointment assigned");
        self.read(appointment_id).await?.ok_or(Error::RowNotFound)
    }

    /// Whether `user_id` has a COMPLETED appointment served by `employee_id`
    pub async fn is_completed_for(
        &self,
        appointment_id: &i32,
        user_id: &i32,
        employee_id: &i32,
    ) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE appointment_id = ? AND user_id = ? AND employee_id = ? AND status = 'COMPLETED'
            "#,
        )
        .bind(appointment_id)
        .bind(user_id)
        .bind(employee_id)
        .fetch_one(&self.connection_pool)
        .await?;
        Ok(count > 0)
    }
}

impl Create<Appointment, NewAppointment> for AppointmentRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id, service_id = %data.service_id))]
    async fn create(&self, data: &NewAppointment) -> Result<Appointment, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO appointments (user_id, service_id, vehicle_id, scheduled_at, status, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.user_id)
        .bind(data.service_id)
        .bind(data.vehicle_id)
        .bind(data.scheduled_at)
        .bind(AppointmentStatus::Pending)
        .bind(&data.notes)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Appointment created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Appointment, i32> for AppointmentRepository {
    async fn read(&self, id: &i32) -> Result<Option<Appointment>, Error> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT appointment_id, user_id, service_id, vehicle_id, employee_id, scheduled_at,
                   status, notes, created_at, updated_at
            FROM appointments
            WHERE appointment_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "appointments")
    ))]
    async fn test_cancel_if_open_leaves_started_work_alone(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = AppointmentRepository::new(pool);
        let cancelled = repo.cancel_if_open(&2).await?.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert!(repo.cancel_if_open(&2).await?.is_none());

        repo.update_status(&1, AppointmentStatus::InProgress).await?;
        assert!(repo.cancel_if_open(&1).await?.is_none());
        assert_eq!(
            repo.read(&1).await?.unwrap().status,
            AppointmentStatus::InProgress
        );
        assert!(repo.cancel_if_open(&3).await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "appointments")
    ))]
    async fn test_create_is_pending(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = AppointmentRepository::new(pool);
        let created = repo
            .create(&NewAppointment {
                user_id: 4,
                service_id: 2,
                vehicle_id: Some(2),
                scheduled_at: Utc::now() + Duration::days(3),
                notes: None,
            })
            .await?;
        assert_eq!(created.status, AppointmentStatus::Pending);
        assert!(created.employee_id.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "appointments")
    ))]
    async fn test_assign_confirms_only_pending(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = AppointmentRepository::new(pool);
        let assigned = repo.assign_employee(&1, &1).await?;
        assert_eq!(assigned.employee_id, Some(1));
        assert_eq!(assigned.status, AppointmentStatus::Confirmed);

        let completed = repo.assign_employee(&3, &2).await?;
        assert_eq!(completed.employee_id, Some(2));
        assert_eq!(completed.status, AppointmentStatus::Completed);
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../../fixtures",
        scripts("users", "catalog", "staff", "appointments")
    ))]
    async fn test_listing_scopes(pool: MySqlPool) -> sqlx::Result<()> {
        let repo = AppointmentRepository::new(pool);
        assert_eq!(repo.list_for_user(&2, None).await?.len(), 3);
        assert_eq!(
            repo.list_for_user(&2, Some(AppointmentStatus::Pending))
                .await?
                .len(),
            1
        );
        assert_eq!(repo.list_for_employee(&1, None).await?.len(), 3);
        assert_eq!(repo.list_all(None).await?.len(), 4);
        assert!(repo.is_completed_for(&3, &4, &1).await?);
        assert!(!repo.is_completed_for(&2, &2, &1).await?);
        Ok(())
    }
}
