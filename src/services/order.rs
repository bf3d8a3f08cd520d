//! Order services - checkout, order tracking and fulfilment

use crate::core::money::format_amount;
use crate::core::{AppError, AppState, require_role};
use crate::dtos::{AssignEmployeeDTO, CreateOrderDTO, OrderDTO, OrderQuery, UpdateOrderStatusDTO};
use crate::entities::{NotificationKind, Order, OrderPaymentStatus, User, UserRole};
use crate::repositories::Read;
use crate::services::notification::{notify, notify_admins};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

async fn with_items(state: &AppState, order: Order) -> Result<OrderDTO, AppError> {
    let items = state.order.items_for(&order.order_id).await?;
    Ok(OrderDTO::from(order).with_items(items))
}

async fn many_with_items(state: &AppState, orders: Vec<Order>) -> Result<Vec<OrderDTO>, AppError> {
    let ids: Vec<i32> = orders.iter().map(|o| o.order_id).collect();
    let mut items = state.order.items_by_order(&ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| {
            let own = items.remove(&order.order_id).unwrap_or_default();
            OrderDTO::from(order).with_items(own)
        })
        .collect())
}

/// Loads an order the caller may see; anything else is a 404.
async fn visible_order(
    state: &AppState,
    user: &User,
    order_id: i32,
) -> Result<Order, AppError> {
    let order = state
        .order
        .read(&order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let visible = match user.role {
        UserRole::Admin => true,
        UserRole::Customer => order.user_id == user.user_id,
        UserRole::Staff => match state.employee.find_by_user_id(&user.user_id).await? {
            Some(employee) => order.employee_id == Some(employee.employee_id),
            None => false,
        },
    };
    if !visible {
        warn!("Order {} hidden from caller", order_id);
        return Err(AppError::not_found("Order not found"));
    }
    Ok(order)
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateOrderDTO>,
) -> Result<(StatusCode, Json<OrderDTO>), AppError> {
    body.validate()?;
    let lines = body.merged_lines();
    if let Some(line) = lines.iter().find(|l| l.quantity > 100) {
        return Err(AppError::bad_request("Quantity must be between 1 and 100")
            .with_details(format!("product {} requested {} times", line.product_id, line.quantity)));
    }

    let order = state
        .order
        .create_with_items(&current_user.user_id, &lines, body.shipping_address.trim())
        .await?;
    info!("Order {} placed", order.order_id);

    let total = format_amount(order.total_amount);
    notify(
        &state,
        current_user.user_id,
        NotificationKind::Order,
        "Order placed",
        format!("Order #{} for Rs. {} has been placed.", order.order_id, total),
    )
    .await;
    notify_admins(
        &state,
        "order.created",
        json!({
            "order_id": order.order_id,
            "customer": current_user.display_name(),
            "total_amount": total,
        }),
    );

    Ok((StatusCode::CREATED, Json(with_items(&state, order).await?)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<OrderQuery>,
) -> Result<Json<Vec<OrderDTO>>, AppError> {
    let orders = match current_user.role {
        UserRole::Admin => state.order.list_all(params.status).await?,
        UserRole::Customer => {
            state
                .order
                .list_for_user(&current_user.user_id, params.status)
                .await?
        }
        UserRole::Staff => match state.employee.find_by_user_id(&current_user.user_id).await? {
            Some(employee) => {
                state
                    .order
                    .list_for_employee(&employee.employee_id, params.status)
                    .await?
            }
            None => Vec::new(),
        },
    };
    debug!("Listing {} orders", orders.len());
    Ok(Json(many_with_items(&state, orders).await?))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderDTO>, AppError> {
    let order = visible_order(&state, &current_user, order_id).await?;
    Ok(Json(with_items(&state, order).await?))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, status = ?body.status))]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(order_id): Path<i32>,
    Json(body): Json<UpdateOrderStatusDTO>,
) -> Result<Json<OrderDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin, UserRole::Staff])?;
    let order = visible_order(&state, &current_user, order_id).await?;
    let updated = state.order.update_status(&order.order_id, body.status).await?;

    notify(
        &state,
        updated.user_id,
        NotificationKind::Order,
        "Order updated",
        format!("Order #{} is now {:?}.", updated.order_id, updated.status),
    )
    .await;
    Ok(Json(with_items(&state, updated).await?))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, employee_id = %body.employee_id))]
pub async fn assign_order(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(order_id): Path<i32>,
    Json(body): Json<AssignEmployeeDTO>,
) -> Result<Json<OrderDTO>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    let employee = state
        .employee
        .read(&body.employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    state
        .order
        .read(&order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let updated = state
        .order
        .assign_employee(&order_id, &employee.employee_id)
        .await?;
    info!("Order {} assigned", order_id);

    notify(
        &state,
        updated.user_id,
        NotificationKind::Order,
        "Order being prepared",
        format!("{} is handling order #{}.", employee.name, updated.order_id),
    )
    .await;
    if let Some(staff_user_id) = employee.user_id {
        notify(
            &state,
            staff_user_id,
            NotificationKind::Order,
            "New order assigned",
            format!("Order #{} is yours to fulfil.", updated.order_id),
        )
        .await;
    }
    Ok(Json(with_items(&state, updated).await?))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderDTO>, AppError> {
    let order = state
        .order
        .read(&order_id)
        .await?
        .filter(|o| o.user_id == current_user.user_id)
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    if order.payment_status == OrderPaymentStatus::Paid {
        return Err(AppError::conflict("Paid orders cannot be cancelled"));
    }

    let cancelled = state
        .order
        .cancel_and_restock(&order_id)
        .await?
        .ok_or_else(|| AppError::conflict("Only pending orders can be cancelled"))?;
    info!("Order {} cancelled", order_id);

    notify_admins(
        &state,
        "order.cancelled",
        json!({ "order_id": order_id, "customer": current_user.display_name() }),
    );
    Ok(Json(with_items(&state, cancelled).await?))
}
