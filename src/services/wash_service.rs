//! Wash service catalogue

use crate::core::{AppError, AppState, OptionalUser, require_role};
use crate::dtos::{CreateServiceDTO, ServiceDTO, ServiceQuery, UpdateServiceDTO};
use crate::entities::{User, UserRole};
use crate::repositories::{Create, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state))]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServiceQuery>,
) -> Result<Json<Vec<ServiceDTO>>, AppError> {
    let services = state.service.list_active(params.category_id).await?;
    let ids: Vec<i32> = services.iter().map(|s| s.service_id).collect();
    let mut features = state.service.features_by_service(&ids).await?;
    debug!("Listing {} services", services.len());

    let dtos = services
        .into_iter()
        .map(|service| {
            let own = features.remove(&service.service_id).unwrap_or_default();
            ServiceDTO::from(service).with_features(own)
        })
        .collect();
    Ok(Json(dtos))
}

#[instrument(skip(state, caller))]
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<OptionalUser>,
    Path(service_id): Path<i32>,
) -> Result<Json<ServiceDTO>, AppError> {
    let is_admin = caller.0.as_ref().is_some_and(User::is_admin);
    let service = state
        .service
        .read(&service_id)
        .await?
        .filter(|s| s.is_active || is_admin)
        .ok_or_else(|| AppError::not_found("Service not found"))?;
    let features = state.service.features_of(&service_id).await?;
    Ok(Json(ServiceDTO::from(service).with_features(features)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateServiceDTO>,
) -> Result<(StatusCode, Json<ServiceDTO>), AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let service = state.service.create(&body).await?;
    let features = state.service.features_of(&service.service_id).await?;
    info!("Service {} created", service.service_id);
    Ok((
        StatusCode::CREATED,
        Json(ServiceDTO::from(service).with_features(features)),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(service_id): Path<i32>,
    Json(body): Json<UpdateServiceDTO>,
) -> Result<Json<ServiceDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let service = state.service.update(&service_id, &body).await?;
    let features = state.service.features_of(&service_id).await?;
    Ok(Json(ServiceDTO::from(service).with_features(features)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(service_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    state.service.deactivate(&service_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
