//! Category services

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{CategoryDTO, CreateCategoryDTO, UpdateCategoryDTO};
use crate::entities::{User, UserRole};
use crate::repositories::{Create, Delete, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryDTO>>, AppError> {
    let categories = state.category.list().await?;
    Ok(Json(categories.into_iter().map(CategoryDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateCategoryDTO>,
) -> Result<(StatusCode, Json<CategoryDTO>), AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let category = state.category.create(&body).await?;
    info!("Category {} created", category.category_id);
    Ok((StatusCode::CREATED, Json(CategoryDTO::from(category))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(category_id): Path<i32>,
    Json(body): Json<UpdateCategoryDTO>,
) -> Result<Json<CategoryDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let category = state.category.update(&category_id, &body).await?;
    Ok(Json(CategoryDTO::from(category)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(category_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    state.category.delete(&category_id).await?;
    info!("Category {} deleted", category_id);
    Ok(StatusCode::NO_CONTENT)
}
