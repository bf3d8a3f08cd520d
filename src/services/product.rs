//! Product services - shop catalogue

use crate::core::{AppError, AppState, OptionalUser, require_role};
use crate::dtos::{CreateProductDTO, PageDTO, ProductDTO, ProductQuery, UpdateProductDTO};
use crate::entities::{User, UserRole};
use crate::repositories::{Create, ProductFilter, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<PageDTO<ProductDTO>>, AppError> {
    let (page, per_page) = params.pagination();
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (products, total) = state
        .product
        .list_active(&ProductFilter {
            category_id: params.category_id,
            search,
            limit: per_page,
            offset: params.offset(),
        })
        .await?;
    debug!("Page {} holds {} of {} products", page, products.len(), total);

    Ok(Json(PageDTO {
        items: products.into_iter().map(ProductDTO::from).collect(),
        page,
        per_page,
        total,
    }))
}

#[instrument(skip(state, caller))]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<OptionalUser>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductDTO>, AppError> {
    let is_admin = caller.0.as_ref().is_some_and(User::is_admin);
    let product = state
        .product
        .read(&product_id)
        .await?
        .filter(|p| p.is_active || is_admin)
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(ProductDTO::from(product)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateProductDTO>,
) -> Result<(StatusCode, Json<ProductDTO>), AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let product = state.product.create(&body).await?;
    info!("Product {} created", product.product_id);
    Ok((StatusCode::CREATED, Json(ProductDTO::from(product))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(product_id): Path<i32>,
    Json(body): Json<UpdateProductDTO>,
) -> Result<Json<ProductDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    body.validate()?;
    let product = state.product.update(&product_id, &body).await?;
    Ok(Json(ProductDTO::from(product)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(product_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    state.product.deactivate(&product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
