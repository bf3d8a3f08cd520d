//! Identity-provider webhook - keeps the local users table in sync

use crate::core::{AppError, AppState};
use crate::integrations::identity::{IdentityEvent, WebhookVerifier, parse_event};
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::HeaderMap,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[instrument(skip_all)]
pub async fn identity_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let Some(secret) = &state.config.identity_webhook_secret else {
        warn!("Webhook received but IDENTITY_WEBHOOK_SECRET is not set");
        return Err(AppError::service_unavailable("Webhook not configured"));
    };
    WebhookVerifier::new(secret)?.verify(&headers, &body)?;

    match parse_event(&body)? {
        IdentityEvent::Upsert(data) => {
            let user = state.user.upsert(&data).await?;
            info!(user_id = user.user_id, "User synchronised from identity provider");
            Ok(Json(json!({ "status": "ok", "user_id": user.user_id })))
        }
        IdentityEvent::Deleted { auth_id } => {
            let removed = state.user.delete_by_auth_id(&auth_id).await?;
            info!(removed, "User deletion processed");
            Ok(Json(json!({ "status": "ok", "deleted": removed })))
        }
        IdentityEvent::Ignored(kind) => {
            info!(event = %kind, "Ignoring webhook event");
            Ok(Json(json!({ "status": "ignored" })))
        }
    }
}
