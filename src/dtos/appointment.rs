//! Appointment DTOs

use crate::entities::{Appointment, AppointmentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppointmentDTO {
    pub appointment_id: i32,
    pub user_id: i32,
    pub service_id: i32,
    pub vehicle_id: Option<i32>,
    pub employee_id: Option<i32>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentDTO {
    fn from(value: Appointment) -> Self {
        Self {
            appointment_id: value.appointment_id,
            user_id: value.user_id,
            service_id: value.service_id,
            vehicle_id: value.vehicle_id,
            employee_id: value.employee_id,
            scheduled_at: value.scheduled_at,
            status: value.status,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Body of `POST /appointments`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateAppointmentDTO {
    pub service_id: i32,
    pub vehicle_id: Option<i32>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Row to insert; the owner comes from the session, never from the body
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: i32,
    pub service_id: i32,
    pub vehicle_id: Option<i32>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateAppointmentStatusDTO {
    pub status: AppointmentStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssignEmployeeDTO {
    pub employee_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AppointmentQuery {
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}
