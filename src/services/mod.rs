//! Services module - HTTP handlers grouped by resource.
//!
//! Handlers validate input, enforce roles and ownership, call the
//! repositories and fan out notifications.

pub mod appointment;
pub mod category;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod staff;
pub mod user;
pub mod vehicle;
pub mod wash_service;
pub mod webhook;

pub use appointment::{
    assign_appointment, cancel_appointment, create_appointment, get_appointment,
    list_appointments, update_appointment_status,
};
pub use category::{create_category, delete_category, list_categories, update_category};
pub use notification::{
    delete_notification, list_notifications, mark_all_notifications_read,
    mark_notification_read, notify, notify_admins, unread_count,
};
pub use order::{assign_order, cancel_order, create_order, get_order, list_orders, update_order_status};
pub use payment::{
    esewa_failure, esewa_status, esewa_success, initiate_esewa_payment, list_order_payments,
};
pub use product::{create_product, delete_product, get_product, list_products, update_product};
pub use staff::{
    create_review, create_staff, delete_staff, list_reviews, list_staff, my_tasks, update_staff,
};
pub use user::{get_me, list_users, update_me, update_user_role};
pub use vehicle::{create_vehicle, delete_vehicle, list_vehicles};
pub use wash_service::{create_service, delete_service, get_service, list_services, update_service};
pub use webhook::identity_webhook;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
