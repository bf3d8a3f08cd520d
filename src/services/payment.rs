//! Payment services - eSewa checkout and its browser callbacks

use crate::core::money::{format_amount, parse_gateway_amount};
use crate::core::{AppError, AppState, require_role};
use crate::dtos::{CallbackQuery, EsewaFormDTO, InitiatePaymentDTO, PaymentDTO};
use crate::entities::{
    NotificationKind, OrderPaymentStatus, OrderStatus, PaymentStatus, User, UserRole,
};
use crate::integrations::esewa::{self, STATUS_COMPLETE};
use crate::repositories::{NewPayment, Read, Settlement};
use crate::services::notification::{notify, notify_admins};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    response::Redirect,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, order_id = %body.order_id))]
pub async fn initiate_esewa_payment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<InitiatePaymentDTO>,
) -> Result<Json<EsewaFormDTO>, AppError> {
    let order = state
        .order
        .read(&body.order_id)
        .await?
        .filter(|o| o.user_id == current_user.user_id)
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status == OrderStatus::Cancelled {
        return Err(AppError::conflict("Order is cancelled"));
    }
    if order.payment_status == OrderPaymentStatus::Paid {
        return Err(AppError::conflict("Order is already paid"));
    }

    // a retried checkout resumes the open payment instead of opening another
    let payment = match state.payment.find_open_for_order(&order.order_id).await? {
        Some(open) if open.amount == order.total_amount => {
            debug!("Reusing open payment {}", open.payment_id);
            open
        }
        _ => {
            let transaction_uuid = Uuid::new_v4().to_string();
            state
                .payment
                .create(&NewPayment {
                    order_id: order.order_id,
                    transaction_uuid: &transaction_uuid,
                    amount: order.total_amount,
                })
                .await?
        }
    };
    let form = esewa::build_form(&state.config, payment.amount, &payment.transaction_uuid)?;
    info!("Payment {} initiated", payment.payment_id);
    Ok(Json(form))
}

#[instrument(skip_all)]
pub async fn esewa_success(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let data = params
        .data
        .ok_or_else(|| AppError::bad_request("Missing callback data"))?;
    let callback = esewa::verify_callback(&state.config.esewa_secret_key, &data)?;
    debug!(transaction_uuid = %callback.transaction_uuid, "Verified eSewa callback");

    let payment = state
        .payment
        .find_by_transaction_uuid(&callback.transaction_uuid)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;

    let frontend = state.config.frontend_url.trim_end_matches('/');
    if callback.status != STATUS_COMPLETE {
        warn!(status = %callback.status, "Gateway reported an unfinished payment");
        state
            .payment
            .mark_failed(&payment.payment_id, &payment.order_id)
            .await?;
        return Ok(Redirect::to(&format!("{}/payment/failure", frontend)));
    }
    if callback.product_code != state.config.esewa_product_code {
        return Err(AppError::bad_request("Invalid payment callback")
            .with_details("Unexpected product code"));
    }
    let paid = parse_gateway_amount(&callback.total_amount)
        .ok_or_else(|| AppError::bad_request("Invalid payment callback"))?;
    if paid != payment.amount {
        warn!(
            "Amount mismatch: gateway {} vs expected {}",
            callback.total_amount, payment.amount
        );
        return Err(AppError::bad_request("Invalid payment callback")
            .with_details("Amount does not match the payment"));
    }

    let settlement = state
        .payment
        .settle_success(&payment.payment_id, &payment.order_id, &callback.transaction_code)
        .await?;
    match settlement {
        Settlement::Settled => {
            info!("Order {} paid", payment.order_id);
            if let Some(order) = state.order.read(&payment.order_id).await? {
                notify(
                    &state,
                    order.user_id,
                    NotificationKind::Payment,
                    "Payment received",
                    format!(
                        "We received Rs. {} for order #{}.",
                        format_amount(payment.amount),
                        order.order_id
                    ),
                )
                .await;
                notify_admins(
                    &state,
                    "payment.completed",
                    json!({ "order_id": order.order_id, "amount": format_amount(payment.amount) }),
                );
            }
        }
        Settlement::Replayed => debug!("Callback replayed for settled payment"),
        Settlement::Rejected => {
            warn!("Payment {} needs a refund", payment.payment_id);
            notify_admins(
                &state,
                "payment.rejected",
                json!({
                    "order_id": payment.order_id,
                    "transaction_uuid": payment.transaction_uuid,
                    "reference_id": callback.transaction_code,
                    "amount": format_amount(payment.amount),
                }),
            );
            return Ok(Redirect::to(&format!("{}/payment/failure", frontend)));
        }
    }

    Ok(Redirect::to(&format!(
        "{}/payment/success?order_id={}",
        frontend, payment.order_id
    )))
}

#[instrument(skip_all)]
pub async fn esewa_failure(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let redirect = Redirect::to(&format!(
        "{}/payment/failure",
        state.config.frontend_url.trim_end_matches('/')
    ));
    let Some(data) = params.data else {
        return Ok(redirect);
    };

    // failure redirects are not always signed; a signed one must verify
    let payload = esewa::decode_payload(&data)?;
    if payload.contains_key("signature") {
        esewa::verify_callback(&state.config.esewa_secret_key, &data)?;
    }
    let Some(transaction_uuid) = payload.get("transaction_uuid").and_then(Value::as_str) else {
        return Ok(redirect);
    };

    if let Some(payment) = state
        .payment
        .find_by_transaction_uuid(transaction_uuid)
        .await?
    {
        if state
            .payment
            .mark_failed(&payment.payment_id, &payment.order_id)
            .await?
        {
            info!("Payment {} failed", payment.payment_id);
            if let Some(order) = state.order.read(&payment.order_id).await? {
                notify(
                    &state,
                    order.user_id,
                    NotificationKind::Payment,
                    "Payment failed",
                    format!("The payment for order #{} did not go through.", order.order_id),
                )
                .await;
            }
        }
    }
    Ok(redirect)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_order_payments(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(order_id): Path<i32>,
) -> Result<Json<Vec<PaymentDTO>>, AppError> {
    let order = state
        .order
        .read(&order_id)
        .await?
        .filter(|o| current_user.role == UserRole::Admin || o.user_id == current_user.user_id)
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    let payments = state.payment.list_by_order(&order.order_id).await?;
    Ok(Json(payments.into_iter().map(PaymentDTO::from).collect()))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn esewa_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(transaction_uuid): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_role(&current_user, &[UserRole::Admin])?;
    let payment = state
        .payment
        .find_by_transaction_uuid(&transaction_uuid)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;

    let status = esewa::check_status(
        &state.http,
        &state.config,
        &payment.transaction_uuid,
        payment.amount,
    )
    .await?;
    debug!(local_status = ?payment.status, "Gateway status fetched");
    if payment.status == PaymentStatus::Pending {
        info!("Payment still pending locally, gateway says {}", status);
    }
    Ok(Json(status))
}
