//! VehicleRepository - cars registered by customers

use super::{Create, Read};
use crate::dtos::CreateVehicleDTO;
use crate::entities::Vehicle;
use sqlx::{Error, MySqlPool};
use tracing::{info, instrument};

/// Vehicle to insert for a given owner
pub struct NewVehicle<'a> {
    pub user_id: i32,
    pub data: &'a CreateVehicleDTO,
}

pub struct VehicleRepository {
    connection_pool: MySqlPool,
}

impl VehicleRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    pub async fn list_by_user(&self, user_id: &i32) -> Result<Vec<Vehicle>, Error> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT vehicle_id, user_id, make, model, year, plate_number, color, created_at
            FROM vehicles
            WHERE user_id = ?
            ORDER BY vehicle_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Deletes the vehicle only if `user_id` owns it. Returns whether a row went away.
    #[instrument(skip(self))]
    pub async fn delete_owned(&self, user_id: &i32, vehicle_id: &i32) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM vehicles WHERE vehicle_id = ? AND user_id = ?")
            .bind(vehicle_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl<'a> Create<Vehicle, NewVehicle<'a>> for VehicleRepository {
    #[instrument(skip(self, new), fields(user_id = %new.user_id))]
    async fn create(&self, new: &NewVehicle<'a>) -> Result<Vehicle, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO vehicles (user_id, make, model, year, plate_number, color)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.data.make)
        .bind(&new.data.model)
        .bind(new.data.year)
        .bind(new.data.plate_number.trim().to_uppercase())
        .bind(&new.data.color)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("Vehicle created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Vehicle, i32> for VehicleRepository {
    async fn read(&self, id: &i32) -> Result<Option<Vehicle>, Error> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT vehicle_id, user_id, make, model, year, plate_number, color, created_at
            FROM vehicles
            WHERE vehicle_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
