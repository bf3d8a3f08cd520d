//! Appointment services - booking, visibility, status and assignment

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{
    AppointmentDTO, AppointmentQuery, AssignEmployeeDTO, CreateAppointmentDTO, NewAppointment,
    UpdateAppointmentStatusDTO,
};
use crate::entities::{Appointment, AppointmentStatus, NotificationKind, User, UserRole};
use crate::repositories::{Create, Read};
use crate::services::notification::{notify, notify_admins};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Employee row of a STAFF caller, if any
async fn employee_id_of(state: &AppState, user: &User) -> Result<Option<i32>, AppError> {
    if user.role != UserRole::Staff {
        return Ok(None);
    }
    Ok(state
        .employee
        .find_by_user_id(&user.user_id)
        .await?
        .map(|e| e.employee_id))
}

/// Loads an appointment the caller may see; anything else is a 404.
async fn visible_appointment(
    state: &AppState,
    user: &User,
    appointment_id: i32,
) -> Result<Appointment, AppError> {
    let appointment = state
        .appointment
        .read(&appointment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    let visible = match user.role {
        UserRole::Admin => true,
        UserRole::Customer => appointment.user_id == user.user_id,
        UserRole::Staff => {
            appointment.employee_id.is_some()
                && appointment.employee_id == employee_id_of(state, user).await?
        }
    };
    if !visible {
        warn!("Appointment {} hidden from caller", appointment_id);
        return Err(AppError::not_found("Appointment not found"));
    }
    Ok(appointment)
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateAppointmentDTO>,
) -> Result<(StatusCode, Json<AppointmentDTO>), AppError> {
    body.validate()?;
    if body.scheduled_at <= Utc::now() {
        return Err(AppError::bad_request("Appointment must be scheduled in the future"));
    }

    let service = state
        .service
        .read(&body.service_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::not_found("Service not found"))?;

    if let Some(vehicle_id) = body.vehicle_id {
        let owned = state
            .vehicle
            .read(&vehicle_id)
            .await?
            .is_some_and(|v| v.user_id == current_user.user_id);
        if !owned {
            return Err(AppError::not_found("Vehicle not found"));
        }
    }

    let appointment = state
        .appointment
        .create(&NewAppointment {
            user_id: current_user.user_id,
            service_id: service.service_id,
            vehicle_id: body.vehicle_id,
            scheduled_at: body.scheduled_at,
            notes: body.notes.clone(),
        })
        .await?;
    info!("Appointment {} booked", appointment.appointment_id);

    notify(
        &state,
        current_user.user_id,
        NotificationKind::Appointment,
        "Appointment booked",
        format!(
            "Your {} is booked for {}.",
            service.name,
            appointment.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
    )
    .await;
    notify_admins(
        &state,
        "appointment.created",
        json!({
            "appointment_id": appointment.appointment_id,
            "customer": current_user.display_name(),
            "service": service.name,
            "scheduled_at": appointment.scheduled_at,
        }),
    );

    Ok((StatusCode::CREATED, Json(AppointmentDTO::from(appointment))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<AppointmentQuery>,
) -> Result<Json<Vec<AppointmentDTO>>, AppError> {
    let appointments = match current_user.role {
        UserRole::Admin => state.appointment.list_all(params.status).await?,
        UserRole::Customer => {
            state
                .appointment
                .list_for_user(&current_user.user_id, params.status)
                .await?
        }
        UserRole::Staff => match employee_id_of(&state, &current_user).await? {
            Some(employee_id) => {
                state
                    .appointment
                    .list_for_employee(&employee_id, params.status)
                    .await?
            }
            None => Vec::new(),
        },
    };
    debug!("Listing {} appointments", appointments.len());
    Ok(Json(
        appointments.into_iter().map(AppointmentDTO::from).collect(),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<AppointmentDTO>, AppError> {
    let appointment = visible_appointment(&state, &current_user, appointment_id).await?;
    Ok(Json(AppointmentDTO::from(appointment)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, status = ?body.status))]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(appointment_id): Path<i32>,
    Json(body): Json<UpdateAppointmentStatusDTO>,
) -> Result<Json<AppointmentDTO>, AppError> {
    require_role(&current_user, &[UserRole::Staff, UserRole::Admin])?;
    let appointment = visible_appointment(&state, &current_user, appointment_id).await?;
    let updated = state
        .appointment
        .update_status(&appointment.appointment_id, body.status)
        .await?;

    notify(
        &state,
        updated.user_id,
        NotificationKind::Appointment,
        "Appointment updated",
        format!(
            "Appointment #{} is now {:?}.",
            updated.appointment_id, updated.status
        ),
    )
    .await;
    Ok(Json(AppointmentDTO::from(updated)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, employee_id = %body.employee_id))]
pub async fn assign_appointment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(appointment_id): Path<i32>,
    Json(body): Json<AssignEmployeeDTO>,
) -> Result<Json<AppointmentDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    let employee = state
        .employee
        .read(&body.employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    state
        .appointment
        .read(&appointment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    let updated = state
        .appointment
        .assign_employee(&appointment_id, &employee.employee_id)
        .await?;
    info!("Appointment {} assigned", appointment_id);

    notify(
        &state,
        updated.user_id,
        NotificationKind::Appointment,
        "Staff assigned",
        format!(
            "{} will take care of appointment #{}.",
            employee.name, updated.appointment_id
        ),
    )
    .await;
    if let Some(staff_user_id) = employee.user_id {
        notify(
            &state,
            staff_user_id,
            NotificationKind::Appointment,
            "New task assigned",
            format!(
                "Appointment #{} on {} is yours.",
                updated.appointment_id,
                updated.scheduled_at.format("%Y-%m-%d %H:%M UTC")
            ),
        )
        .await;
    }
    Ok(Json(AppointmentDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<AppointmentDTO>, AppError> {
    let appointment = state
        .appointment
        .read(&appointment_id)
        .await?
        .filter(|a| a.user_id == current_user.user_id)
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    if !appointment.status.is_cancellable() {
        return Err(AppError::conflict("Appointment can no longer be cancelled")
            .with_details(format!("Current status is {:?}", appointment.status)));
    }
    let cancelled = state
        .appointment
        .cancel_if_open(&appointment_id)
        .await?
        .ok_or_else(|| AppError::conflict("Appointment can no longer be cancelled"))?;

    notify_admins(
        &state,
        "appointment.cancelled",
        json!({ "appointment_id": appointment_id, "customer": current_user.display_name() }),
    );
    Ok(Json(AppointmentDTO::from(cancelled)))
}
