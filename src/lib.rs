//! Washbay - car wash booking and shop backend

pub mod core;
pub mod dtos;
pub mod entities;
pub mod integrations;
pub mod realtime;
pub mod repositories;
pub mod services;

pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{any, delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    use core::authentication_middleware;
    use realtime::ws_handler;
    use services::*;

    let cors = build_cors(&state.config.frontend_url);

    Router::new()
        .route("/", get(root))
        .route("/webhooks/identity", post(identity_webhook))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/categories", configure_category_routes(state.clone()))
        .nest("/services", configure_service_routes(state.clone()))
        .nest("/vehicles", configure_vehicle_routes(state.clone()))
        .nest("/staff", configure_staff_routes(state.clone()))
        .nest("/appointments", configure_appointment_routes(state.clone()))
        .nest("/products", configure_product_routes(state.clone()))
        .nest("/orders", configure_order_routes(state.clone()))
        .nest("/payments", configure_payment_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Only the storefront origin may call the API; an unparsable origin falls
/// back to a permissive policy.
fn build_cors(frontend_url: &str) -> CorsLayer {
    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => CorsLayer::permissive(),
    }
}

fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me).patch(update_me))
        .route("/{user_id}/role", patch(update_user_role))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_category_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    let public_routes = Router::new().route("/", get(list_categories));

    let admin_routes = Router::new()
        .route("/", post(create_category))
        .route(
            "/{category_id}",
            patch(update_category).delete(delete_category),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(admin_routes)
}

fn configure_service_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{authentication_middleware, optional_authentication_middleware};
    use services::*;

    // admins see inactive services through the optional session
    let public_routes = Router::new()
        .route("/", get(list_services))
        .route("/{service_id}", get(get_service))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_authentication_middleware,
        ));

    let admin_routes = Router::new()
        .route("/", post(create_service))
        .route(
            "/{service_id}",
            patch(update_service).delete(delete_service),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(admin_routes)
}

fn configure_vehicle_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/{vehicle_id}", delete(delete_vehicle))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_staff_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    let public_routes = Router::new().route("/{employee_id}/reviews", get(list_reviews));

    let member_routes = Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/me/tasks", get(my_tasks))
        .route(
            "/{employee_id}",
            patch(update_staff).delete(delete_staff),
        )
        .route("/{employee_id}/reviews", post(create_review))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(member_routes)
}

fn configure_appointment_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/{appointment_id}", get(get_appointment))
        .route("/{appointment_id}/status", patch(update_appointment_status))
        .route("/{appointment_id}/assign", patch(assign_appointment))
        .route("/{appointment_id}/cancel", post(cancel_appointment))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_product_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{authentication_middleware, optional_authentication_middleware};
    use services::*;

    let public_routes = Router::new()
        .route("/", get(list_products))
        .route("/{product_id}", get(get_product))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_authentication_middleware,
        ));

    let admin_routes = Router::new()
        .route("/", post(create_product))
        .route(
            "/{product_id}",
            patch(update_product).delete(delete_product),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(admin_routes)
}

fn configure_order_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/status", patch(update_order_status))
        .route("/{order_id}/assign", patch(assign_order))
        .route("/{order_id}/cancel", post(cancel_order))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_payment_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    // the gateway redirects the browser here, no session attached
    let callback_routes = Router::new()
        .route("/esewa/success", get(esewa_success))
        .route("/esewa/failure", get(esewa_failure));

    let member_routes = Router::new()
        .route("/esewa/initiate", post(initiate_esewa_payment))
        .route("/esewa/status/{transaction_uuid}", get(esewa_status))
        .route("/order/{order_id}", get(list_order_payments))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    callback_routes.merge(member_routes)
}

fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/{notification_id}", delete(delete_notification))
        .route("/{notification_id}/read", patch(mark_notification_read))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
