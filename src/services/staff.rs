//! Staff services - employees, their reviews and their assigned work

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{
    AppointmentDTO, CreateEmployeeDTO, CreateReviewDTO, EmployeeDTO, OrderDTO, ReviewDTO,
    ReviewSummaryDTO, StaffQuery, StaffTasksDTO, UpdateEmployeeDTO,
};
use crate::entities::{User, UserRole};
use crate::repositories::{Create, Delete, NewReview, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, _current_user))]
pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    Extension(_current_user): Extension<User>,
    Query(params): Query<StaffQuery>,
) -> Result<Json<Vec<EmployeeDTO>>, AppError> {
    let employees = state.employee.list(params.available).await?;
    Ok(Json(employees.into_iter().map(EmployeeDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateEmployeeDTO>,
) -> Result<(StatusCode, Json<EmployeeDTO>), AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    if let Some(user_id) = body.user_id {
        state
            .user
            .read(&user_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Linked user does not exist"))?;
    }
    let employee = state.employee.create(&body).await?;
    info!("Employee {} created", employee.employee_id);
    Ok((StatusCode::CREATED, Json(EmployeeDTO::from(employee))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(employee_id): Path<i32>,
    Json(body): Json<UpdateEmployeeDTO>,
) -> Result<Json<EmployeeDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let employee = state.employee.update(&employee_id, &body).await?;
    Ok(Json(EmployeeDTO::from(employee)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_staff(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(employee_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    state.employee.delete(&employee_id).await?;
    info!("Employee {} removed", employee_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<i32>,
) -> Result<Json<ReviewSummaryDTO>, AppError> {
    state
        .employee
        .read(&employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    let reviews = state.review.list_by_employee(&employee_id).await?;
    Ok(Json(ReviewSummaryDTO::from_reviews(employee_id, reviews)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(employee_id): Path<i32>,
    Json(body): Json<CreateReviewDTO>,
) -> Result<(StatusCode, Json<ReviewDTO>), AppError> {
    require_role(&current_user, &[UserRole::Customer])?;
    body.validate()?;
    state
        .employee
        .read(&employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    if let Some(appointment_id) = body.appointment_id {
        let served = state
            .appointment
            .is_completed_for(&appointment_id, &current_user.user_id, &employee_id)
            .await?;
        if !served {
            warn!("Review references appointment {} not served by employee", appointment_id);
            return Err(AppError::bad_request("Appointment not eligible for review")
                .with_details("The appointment must be yours, completed and served by this employee"));
        }
        if state
            .review
            .exists_for_appointment(&current_user.user_id, &appointment_id)
            .await?
        {
            return Err(AppError::conflict("Appointment already reviewed"));
        }
    }

    let review = state
        .review
        .create(&NewReview {
            employee_id,
            user_id: current_user.user_id,
            data: &body,
        })
        .await?;
    info!("Review {} stored", review.review_id);
    Ok((StatusCode::CREATED, Json(ReviewDTO::from(review))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn my_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<StaffTasksDTO>, AppError> {
    require_role(&current_user, &[UserRole::Staff])?;
    let employee = state
        .employee
        .find_by_user_id(&current_user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("No employee profile linked to this account"))?;

    let appointments = state
        .appointment
        .list_for_employee(&employee.employee_id, None)
        .await?;
    let orders = state
        .order
        .list_for_employee(&employee.employee_id, None)
        .await?;
    let ids: Vec<i32> = orders.iter().map(|o| o.order_id).collect();
    let mut items = state.order.items_by_order(&ids).await?;
    debug!(
        appointments = appointments.len(),
        orders = orders.len(),
        "Tasks loaded"
    );

    Ok(Json(StaffTasksDTO {
        employee: EmployeeDTO::from(employee),
        appointments: appointments.into_iter().map(AppointmentDTO::from).collect(),
        orders: orders
            .into_iter()
            .map(|order| {
                let own = items.remove(&order.order_id).unwrap_or_default();
                OrderDTO::from(order).with_items(own)
            })
            .collect(),
    }))
}
