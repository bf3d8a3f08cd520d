//! Session verification for tokens minted by the hosted identity provider.
//!
//! The provider signs short-lived JWTs whose `sub` is its own user id; the
//! local `users.auth_id` column maps that id onto our records. Users are
//! created through the provider's webhook, never through this middleware.

use crate::core::{AppError, AppState, Config};
use crate::entities::{User, UserRole};
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Claims carried by an identity-provider session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // identity provider user id
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>, // session id
}

/// Key material and validation rules for session tokens.
pub struct SessionKeys {
    key: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        if let Some(pem) = &config.identity_jwt_public_key {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| format!("Invalid IDENTITY_JWT_PUBLIC_KEY: {}", e))?;
            return Ok(Self::new(key, Algorithm::RS256));
        }
        match &config.identity_jwt_secret {
            Some(secret) => Ok(Self::hs256(secret)),
            None => Err("No session token key configured".to_string()),
        }
    }

    pub fn hs256(secret: &str) -> Self {
        Self::new(DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
    }

    fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }
}

#[instrument(skip(token, keys))]
pub fn decode_session_token(
    token: &str,
    keys: &SessionKeys,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    debug!("Decoding session token");
    decode::<Claims>(token, &keys.key, &keys.validation)
        .map(|data| {
            debug!("Session token decoded for subject {}", data.claims.sub);
            data
        })
        .map_err(|e| {
            error!("Failed to decode session token: {:?}", e);
            e
        })
}

/// Token of a `Bearer <token>` header value; the scheme is case-insensitive.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden(
                "Please add the session token to the header",
            ));
        }
    };

    let token = bearer_token(auth_header).ok_or_else(|| {
        warn!("Authorization header is not a bearer token");
        AppError::forbidden("Authorization header must be 'Bearer <token>'")
    })?;

    let token_data = decode_session_token(token, &state.session_keys).map_err(|_| {
        warn!("Failed to decode session token");
        AppError::unauthorized("Unable to decode token")
    })?;

    let current_user = match state.user.find_by_auth_id(&token_data.claims.sub).await? {
        Some(user) => {
            info!("User authenticated: {}", user.user_id);
            user
        }
        None => {
            warn!("No local user for subject {}", token_data.claims.sub);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Caller of a public route, when a valid session token came along.
#[derive(Clone, Debug, Default)]
pub struct OptionalUser(pub Option<User>);

/// Like [`authentication_middleware`] but never rejects: a missing or
/// invalid token just means an anonymous caller.
pub async fn optional_authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let subject = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| decode_session_token(token, &state.session_keys).ok())
        .map(|data| data.claims.sub);

    let user = match subject {
        Some(sub) => state.user.find_by_auth_id(&sub).await?,
        None => None,
    };
    req.extensions_mut().insert(OptionalUser(user));
    Ok(next.run(req).await)
}

/// Checks that the user holds one of the allowed roles.
#[instrument(skip(user), fields(user_id = %user.user_id))]
pub fn require_role(user: &User, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    if !allowed_roles.contains(&user.role) {
        warn!(
            "User {} has insufficient role {:?}, required one of: {:?}",
            user.user_id, user.role, allowed_roles
        );
        return Err(AppError::forbidden("Insufficient role").with_details(format!(
            "This action requires one of the following roles: {:?}",
            allowed_roles
        )));
    }
    debug!("Role check passed with role {:?}", user.role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(sub: &str, secret: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + expires_in).timestamp() as usize,
            iat: now.timestamp() as usize,
            sid: Some("sess_1".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn user_with_role(role: UserRole) -> User {
        User {
            user_id: 7,
            auth_id: "user_7".to_string(),
            email: "seven@washbay.test".to_string(),
            first_name: None,
            last_name: None,
            image_url: None,
            phone: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn decodes_valid_token() {
        let keys = SessionKeys::hs256("secret");
        let data = decode_session_token(&token("user_abc", "secret", Duration::minutes(5)), &keys)
            .unwrap();
        assert_eq!(data.claims.sub, "user_abc");
        assert_eq!(data.claims.sid.as_deref(), Some("sess_1"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let keys = SessionKeys::hs256("secret");
        assert!(
            decode_session_token(&token("user_abc", "other", Duration::minutes(5)), &keys).is_err()
        );
        assert!(
            decode_session_token(&token("user_abc", "secret", Duration::hours(-2)), &keys).is_err()
        );
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("  BEARER   abc.def "), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
    }

    #[test]
    fn require_role_rejects_other_roles() {
        let customer = user_with_role(UserRole::Customer);
        assert!(require_role(&customer, &[UserRole::Customer]).is_ok());
        let err = require_role(&customer, &[UserRole::Admin, UserRole::Staff]).unwrap_err();
        assert_eq!(err.status(), http::StatusCode::FORBIDDEN);
    }
}
