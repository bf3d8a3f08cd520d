//! Vehicle services - cars of the calling customer

use crate::core::{AppError, AppState};
use crate::dtos::{CreateVehicleDTO, VehicleDTO};
use crate::entities::User;
use crate::repositories::{Create, NewVehicle};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<VehicleDTO>>, AppError> {
    let vehicles = state.vehicle.list_by_user(&current_user.user_id).await?;
    Ok(Json(vehicles.into_iter().map(VehicleDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateVehicleDTO>,
) -> Result<(StatusCode, Json<VehicleDTO>), AppError> {
    body.validate()?;
    let vehicle = state
        .vehicle
        .create(&NewVehicle {
            user_id: current_user.user_id,
            data: &body,
        })
        .await?;
    info!("Vehicle {} registered", vehicle.vehicle_id);
    Ok((StatusCode::CREATED, Json(VehicleDTO::from(vehicle))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(vehicle_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if !state
        .vehicle
        .delete_owned(&current_user.user_id, &vehicle_id)
        .await?
    {
        warn!("Vehicle {} not owned by caller", vehicle_id);
        return Err(AppError::not_found("Vehicle not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
