//! Notification services - inbox endpoints and the helpers every other
//! service uses to notify people.

use crate::core::{AppError, AppState};
use crate::dtos::{NewNotification, NotificationDTO, NotificationQuery, UnreadCountDTO};
use crate::entities::{NotificationKind, User};
use crate::realtime::{self, ADMIN_CHANNEL, RealtimeEvent, user_channel};
use crate::repositories::Create;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Stores a notification for `user_id` and pushes it on `user-{id}`.
/// Failures are logged: the caller's own write already succeeded.
#[instrument(skip(state, message))]
pub async fn notify(
    state: &AppState,
    user_id: i32,
    kind: NotificationKind,
    title: &str,
    message: String,
) {
    let new = NewNotification {
        user_id,
        kind,
        title: title.to_string(),
        message,
    };
    match state.notification.create(&new).await {
        Ok(notification) => {
            let data = serde_json::to_value(NotificationDTO::from(notification))
                .unwrap_or(Value::Null);
            realtime::publish(
                state,
                &user_channel(user_id),
                RealtimeEvent::new("notification", data),
            );
            debug!("Notification delivered");
        }
        Err(e) => error!("Failed to store notification: {}", e),
    }
}

/// Pushes an event on the `admin` channel. Nothing is stored.
pub fn notify_admins(state: &AppState, kind: &str, data: Value) {
    realtime::publish(state, ADMIN_CHANNEL, RealtimeEvent::new(kind, data));
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationDTO>>, AppError> {
    let notifications = state
        .notification
        .list_for_user(&current_user.user_id, params.unread.unwrap_or(false))
        .await?;
    debug!("Found {} notifications", notifications.len());
    Ok(Json(
        notifications.into_iter().map(NotificationDTO::from).collect(),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<UnreadCountDTO>, AppError> {
    let unread = state
        .notification
        .unread_count(&current_user.user_id)
        .await?;
    Ok(Json(UnreadCountDTO { unread }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(notification_id): Path<i32>,
) -> Result<Json<NotificationDTO>, AppError> {
    let notification = state
        .notification
        .mark_read(&notification_id, &current_user.user_id)
        .await?
        .ok_or_else(|| {
            warn!("Notification not found for user");
            AppError::not_found("Notification not found")
        })?;
    Ok(Json(NotificationDTO::from(notification)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let updated = state
        .notification
        .mark_all_read(&current_user.user_id)
        .await?;
    info!("{} notifications marked read", updated);
    Ok(Json(json!({ "updated": updated })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(notification_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if !state
        .notification
        .delete_owned(&notification_id, &current_user.user_id)
        .await?
    {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
