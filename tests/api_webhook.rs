//! Integration tests for POST /webhooks/identity

mod common;

#[cfg(test)]
mod webhook_tests {
    use super::common::*;
    use axum_test::TestServer;
    use axum_test::http::{HeaderName, StatusCode};
    use chrono::Utc;
    use serde_json::{Value, json};
    use sqlx::MySqlPool;
    use washbay::integrations::identity::WebhookVerifier;

    async fn deliver(server: &TestServer, body: &Value, timestamp: i64) -> axum_test::TestResponse {
        let raw = body.to_string();
        let signature = WebhookVerifier::new(TEST_WEBHOOK_SECRET)
            .unwrap()
            .sign("msg_test", timestamp, raw.as_bytes())
            .unwrap();
        server
            .post("/webhooks/identity")
            .add_header(HeaderName::from_static("svix-id"), "msg_test")
            .add_header(HeaderName::from_static("svix-timestamp"), timestamp.to_string())
            .add_header(
                HeaderName::from_static("svix-signature"),
                format!("v1,{}", signature),
            )
            .add_header(HeaderName::from_static("content-type"), "application/json")
            .bytes(raw.into())
            .await
    }

    fn user_created(id: &str, role: Option<&str>) -> Value {
        json!({
            "type": "user.created",
            "data": {
                "id": id,
                "email_addresses": [{ "id": "idn_1", "email_address": "erin@washbay.test" }],
                "primary_email_address_id": "idn_1",
                "first_name": "Erin",
                "last_name": "Example",
                "public_metadata": role.map(|r| json!({ "role": r })).unwrap_or(json!({}))
            }
        })
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_user_created_then_signs_in(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = deliver(&server, &user_created("user_new_erin", None), Utc::now().timestamp()).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");

        let response = server
            .get("/users/me")
            .add_header(auth_header(), bearer("user_new_erin"))
            .await;
        response.assert_status_ok();
        let me: Value = response.json();
        assert_eq!(me["email"], "erin@washbay.test");
        assert_eq!(me["role"], "CUSTOMER");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_repeated_create_updates(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);
        let now = Utc::now().timestamp();

        let first: Value = deliver(&server, &user_created("user_new_erin", None), now).await.json();
        let second = deliver(&server, &user_created("user_new_erin", Some("staff")), now).await;
        second.assert_status_ok();
        let second: Value = second.json();
        assert_eq!(first["user_id"], second["user_id"]);

        let response = server
            .get("/users/me")
            .add_header(auth_header(), bearer("user_new_erin"))
            .await;
        assert_eq!(response.json::<Value>()["role"], "STAFF");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_user_deleted(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);
        let body = json!({ "type": "user.deleted", "data": { "id": DAVE, "deleted": true } });

        let response = deliver(&server, &body, Utc::now().timestamp()).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["deleted"], true);
        server
            .get("/users/me")
            .add_header(auth_header(), bearer(DAVE))
            .await
            .assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_unknown_event_is_ignored(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);
        let body = json!({ "type": "session.created", "data": { "id": "sess_1" } });

        let response = deliver(&server, &body, Utc::now().timestamp()).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ignored");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_rejects_bad_signature_and_stale_delivery(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);
        let body = user_created("user_new_erin", None);

        deliver(&server, &body, Utc::now().timestamp() - 3600)
            .await
            .assert_status_unauthorized();

        server
            .post("/webhooks/identity")
            .add_header(HeaderName::from_static("svix-id"), "msg_test")
            .add_header(
                HeaderName::from_static("svix-timestamp"),
                Utc::now().timestamp().to_string(),
            )
            .add_header(HeaderName::from_static("svix-signature"), "v1,AAAA")
            .json(&body)
            .await
            .assert_status_unauthorized();

        server
            .post("/webhooks/identity")
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .get("/users/me")
            .add_header(auth_header(), bearer("user_new_erin"))
            .await
            .assert_status_unauthorized();
        Ok(())
    }
}
