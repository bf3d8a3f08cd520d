use super::validation::PLATE_REGEX;
use crate::entities::Vehicle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug)]
pub struct VehicleDTO {
    pub vehicle_id: i32,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub plate_number: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleDTO {
    fn from(value: Vehicle) -> Self {
        Self {
            vehicle_id: value.vehicle_id,
            make: value.make,
            model: value.model,
            year: value.year,
            plate_number: value.plate_number,
            color: value.color,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateVehicleDTO {
    #[validate(length(min = 1, max = 100))]
    pub make: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[validate(regex(path = *PLATE_REGEX, message = "Invalid plate number"))]
    pub plate_number: String,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}
