//! Integration tests for bookings and staff
//!
//! - /appointments
//! - /staff, /staff/{id}/reviews, /staff/me/tasks

mod common;

#[cfg(test)]
mod appointment_tests {
    use super::common::*;
    use axum_test::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::MySqlPool;

    // ============================================================
    // POST /appointments
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_book_appointment(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .post("/appointments")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({
                "service_id": 1,
                "vehicle_id": 1,
                "scheduled_at": "2031-06-01T10:00:00Z",
                "notes": "Morning please"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let appointment: Value = response.json();
        assert_eq!(appointment["status"], "PENDING");
        assert_eq!(appointment["user_id"], 2);
        assert!(appointment["employee_id"].is_null());

        let response = server
            .get("/notifications/unread-count")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["unread"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_book_with_foreign_vehicle_is_not_found(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .post("/appointments")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({
                "service_id": 1,
                "vehicle_id": 2,
                "scheduled_at": "2031-06-01T10:00:00Z"
            }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_book_in_the_past_is_rejected(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .post("/appointments")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "service_id": 1, "scheduled_at": "2020-01-01T10:00:00Z" }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_book_inactive_service_is_not_found(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .post("/appointments")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "service_id": 3, "scheduled_at": "2031-06-01T10:00:00Z" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // GET /appointments
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_list_is_scoped_by_role(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let count = |response: axum_test::TestResponse| response.json::<Vec<Value>>().len();

        let bob = server.get("/appointments").add_header(auth_header(), bearer(BOB)).await;
        bob.assert_status_ok();
        assert_eq!(count(bob), 3);

        let carol = server.get("/appointments").add_header(auth_header(), bearer(CAROL)).await;
        carol.assert_status_ok();
        assert_eq!(count(carol), 3);

        let admin = server.get("/appointments").add_header(auth_header(), bearer(ADMIN)).await;
        admin.assert_status_ok();
        assert_eq!(count(admin), 4);

        let completed = server
            .get("/appointments?status=COMPLETED")
            .add_header(auth_header(), bearer(BOB))
            .await;
        completed.assert_status_ok();
        assert_eq!(count(completed), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_foreign_appointment_is_not_found(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .get("/appointments/3")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status_not_found();
        server
            .get("/appointments/1")
            .add_header(auth_header(), bearer(CAROL))
            .await
            .assert_status_not_found();
        server
            .get("/appointments/1")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status_ok();
        Ok(())
    }

    // ============================================================
    // status / assign / cancel
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_assign_confirms_pending_appointment(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .patch("/appointments/1/assign")
            .add_header(auth_header(), bearer(ADMIN))
            .json(&json!({ "employee_id": 1 }))
            .await;

        response.assert_status_ok();
        let appointment: Value = response.json();
        assert_eq!(appointment["employee_id"], 1);
        assert_eq!(appointment["status"], "CONFIRMED");

        // the linked staff account is told about the task
        let response = server
            .get("/notifications")
            .add_header(auth_header(), bearer(CAROL))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Value>>().len(), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_assign_unknown_employee(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .patch("/appointments/1/assign")
            .add_header(auth_header(), bearer(ADMIN))
            .json(&json!({ "employee_id": 99 }))
            .await
            .assert_status_not_found();
        server
            .patch("/appointments/1/assign")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "employee_id": 1 }))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_staff_updates_status(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .patch("/appointments/2/status")
            .add_header(auth_header(), bearer(CAROL))
            .json(&json!({ "status": "IN_PROGRESS" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "IN_PROGRESS");

        server
            .patch("/appointments/2/status")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "status": "COMPLETED" }))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_cancel_rules(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .post("/appointments/2/cancel")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "CANCELLED");

        server
            .post("/appointments/4/cancel")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post("/appointments/1/cancel")
            .add_header(auth_header(), bearer(DAVE))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // staff and reviews
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_list_available_staff(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        server.get("/staff").await.assert_status_forbidden();

        let response = server
            .get("/staff?available=true")
            .add_header(auth_header(), bearer(BOB))
            .await;
        response.assert_status_ok();
        let staff: Vec<Value> = response.json();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0]["name"], "Carol Staff");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_review_completed_appointment(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .post("/staff/1/reviews")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "appointment_id": 4, "rating": 5, "comment": "Spotless" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        server
            .post("/staff/1/reviews")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "appointment_id": 4, "rating": 4 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let response = server.get("/staff/1/reviews").await;
        response.assert_status_ok();
        let summary: Value = response.json();
        assert_eq!(summary["review_count"], 1);
        assert_eq!(summary["average_rating"], "5.00");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_review_rejects_unfinished_or_foreign_appointment(
        pool: MySqlPool,
    ) -> sqlx::Result<()> {
        let server = test_server(pool);

        server
            .post("/staff/1/reviews")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "appointment_id": 2, "rating": 5 }))
            .await
            .assert_status_bad_request();
        server
            .post("/staff/1/reviews")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "appointment_id": 3, "rating": 5 }))
            .await
            .assert_status_bad_request();
        server
            .post("/staff/1/reviews")
            .add_header(auth_header(), bearer(BOB))
            .json(&json!({ "rating": 6 }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "staff", "appointments")))]
    async fn test_my_tasks(pool: MySqlPool) -> sqlx::Result<()> {
        let server = test_server(pool);

        let response = server
            .get("/staff/me/tasks")
            .add_header(auth_header(), bearer(CAROL))
            .await;
        response.assert_status_ok();
        let tasks: Value = response.json();
        assert_eq!(tasks["employee"]["employee_id"], 1);
        assert_eq!(tasks["appointments"].as_array().map(Vec::len), Some(3));

        server
            .get("/staff/me/tasks")
            .add_header(auth_header(), bearer(BOB))
            .await
            .assert_status_forbidden();
        Ok(())
    }
}
