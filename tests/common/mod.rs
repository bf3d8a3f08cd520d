#![allow(dead_code)]

use axum_test::TestServer;
use axum_test::http::HeaderName;
use sqlx::MySqlPool;
use std::sync::Arc;
use washbay::core::{AppState, Config};

pub const TEST_JWT_SECRET: &str = "washbay-test-session-secret-change-me";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_d2FzaGJheS13ZWJob29rLXNpZ25pbmcta2V5LTAwMDE=";

pub const ADMIN: &str = "user_admin_alice";
pub const BOB: &str = "user_customer_bob";
pub const CAROL: &str = "user_staff_carol";
pub const DAVE: &str = "user_customer_dave";

/// AppState wired with the test session secret and webhook secret
pub fn create_test_state(pool: MySqlPool) -> Arc<AppState> {
    let config = Config {
        identity_jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        identity_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        ..Config::default()
    };
    Arc::new(AppState::new(pool, config).expect("Failed to build test state"))
}

pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = washbay::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

pub fn test_server(pool: MySqlPool) -> TestServer {
    create_test_server(create_test_state(pool))
}

/// Session token as the identity provider would mint it, valid for one hour
pub fn create_test_jwt(auth_id: &str) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use washbay::core::Claims;

    let now = Utc::now();
    let claims = Claims {
        sub: auth_id.to_string(),
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
        sid: Some("sess_test".to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create JWT token")
}

pub fn auth_header() -> HeaderName {
    HeaderName::from_static("authorization")
}

pub fn bearer(auth_id: &str) -> String {
    format!("Bearer {}", create_test_jwt(auth_id))
}
