//! Integration tests for the notification inbox

mod common;

#[cfg(test)]
mod notification_tests {
    use super::common::*;
    use axum_test::http::StatusCode;
    use serde_json::Value;
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_list_and_filter_unread(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .get("/notifications")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Value>>().len(), 2);

        let response = server
            .get("/notifications?unread=true")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        let unread: Vec<Value> = response.json();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0]["kind"], "APPOINTMENT");

        let response = server
            .get("/notifications/unread-count")
            .add_header(auth_header(), bearer(BOB))
            .await;
        assert_eq!(response.json::<Value>()["unread"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_mark_read_is_scoped_to_owner(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .patch("/notifications/3/read")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status_not_found();

        let response = server
            .patch("/notifications/1/read")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["is_read"], true);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_mark_all_read(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .post("/notifications/read-all")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["updated"], 1);

        // dave's inbox is untouched
        let response = server
            .get("/notifications/unread-count")
            .add_header(auth_header(), bearer(DAVE))
            .await;
        assert_eq!(response.json::<Value>()["unread"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_delete_notification(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .delete("/notifications/3")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status_not_found();
        server
            .delete("/notifications/2")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = server
            .get("/notifications")
            .add_header(auth_header(), bearer(BOB))
            .await;
        assert_eq!(response.json::<Vec<Value>>().len(), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_inbox_requires_session(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server.get("/notifications").await.assert_status_forbidden();
        server
            .get("/notifications")
            .add_header(auth_header(), "Bearer not-a-token")
            .await
            .assert_status_unauthorized();
        Ok(())
    }
}
