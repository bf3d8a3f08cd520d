use crate::integrations::esewa::SignatureError;
use crate::integrations::identity::WebhookError;
use crate::repositories::PlaceOrderError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: &'static str,
    details: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: &'static str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),

            sqlx::Error::Database(db_err) => {
                warn!("Database error: {}", db_err);
                if db_err.is_unique_violation() {
                    Self::conflict("Resource already exists")
                } else if db_err.is_foreign_key_violation() {
                    Self::bad_request("Referenced resource does not exist")
                } else {
                    Self::bad_request("Database error")
                }
            }

            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                error!("Database pool unavailable: {}", err);
                Self::service_unavailable("Database unavailable")
            }

            other => {
                error!("Unexpected database error: {}", other);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::internal_server_error("Internal server error").with_details(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request("Validation error").with_details(err.to_string())
    }
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        warn!("Payment callback rejected: {}", err);
        Self::bad_request("Invalid payment callback").with_details(err.to_string())
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        warn!("Identity webhook rejected: {}", err);
        match err {
            WebhookError::MissingHeader(_) | WebhookError::MalformedPayload(_) => {
                Self::bad_request("Invalid webhook request").with_details(err.to_string())
            }
            WebhookError::InvalidSecret => {
                Self::internal_server_error("Webhook verification is misconfigured")
            }
            WebhookError::Stale | WebhookError::InvalidSignature => {
                Self::unauthorized("Invalid webhook signature")
            }
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::ProductUnavailable(_) => {
                Self::bad_request("Product unavailable").with_details(err.to_string())
            }
            PlaceOrderError::InsufficientStock { .. } => {
                Self::conflict("Insufficient stock").with_details(err.to_string())
            }
            PlaceOrderError::Database(db_err) => Self::from(db_err),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        error!("Upstream request failed: {}", err);
        Self::bad_gateway("Payment gateway unavailable")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            error!(status = %self.status, details = ?self.details, "{}", self.message);
        }
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pool_timeout_maps_to_503() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn signature_errors_are_bad_requests() {
        let err = AppError::from(SignatureError::Mismatch);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid payment callback");
    }

    #[test]
    fn webhook_signature_errors_are_unauthorized() {
        assert_eq!(
            AppError::from(WebhookError::InvalidSignature).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(WebhookError::MissingHeader("svix-id")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn stock_shortage_is_a_conflict() {
        let err = AppError::from(PlaceOrderError::InsufficientStock {
            product_id: 2,
            requested: 5,
            available: 2,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(PlaceOrderError::ProductUnavailable(3)).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
