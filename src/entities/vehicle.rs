use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Vehicle {
    pub vehicle_id: i32,
    pub user_id: i32,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub plate_number: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}
