//! User services - profile of the caller and account administration

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{UpdateProfileDTO, UpdateRoleDTO, UserDTO, UserQuery};
use crate::entities::{User, UserRole};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(current_user), fields(user_id = %current_user.user_id))]
pub async fn get_me(Extension(current_user): Extension<User>) -> Json<UserDTO> {
    Json(UserDTO::from(current_user))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdateProfileDTO>,
) -> Result<Json<UserDTO>, AppError> {
    body.validate()?;
    let phone = body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let user = state
        .user
        .update_phone(&current_user.user_id, phone)
        .await?;
    info!("Profile updated");
    Ok(Json(UserDTO::from(user)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    let users = state.user.list(params.role).await?;
    debug!("Listing {} users", users.len());
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}

#[instrument(skip(state, current_user), fields(admin_id = %current_user.user_id, target_id = %user_id))]
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i32>,
    Json(body): Json<UpdateRoleDTO>,
) -> Result<Json<UserDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    if user_id == current_user.user_id && body.role != UserRole::Admin {
        return Err(AppError::conflict("Admins cannot demote themselves"));
    }
    let user = state.user.update_role(&user_id, body.role).await?;
    info!("Role changed to {:?}", body.role);
    Ok(Json(UserDTO::from(user)))
}
