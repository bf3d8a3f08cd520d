use super::enums::AppointmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Appointment {
    pub appointment_id: i32,
    pub user_id: i32,
    pub service_id: i32,
    pub vehicle_id: Option<i32>,
    /// Staff member the job is assigned to
    pub employee_id: Option<i32>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
