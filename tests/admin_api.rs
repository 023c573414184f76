//! Admin surface: appointment triage, dashboard and customer listing.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;

#[tokio::test]
async fn admin_routes_reject_customers_and_anonymous_callers() {
    let app = TestApp::new().await;
    let (_, token) = app.user("customer", false).await;

    for uri in ["/api/admin/appointments", "/api/admin/dashboard", "/api/admin/users"] {
        let resp = app.send(get(uri, None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let resp = app.send(get(uri, Some(&token))).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let resp = app
        .send(json_request(
            "PUT",
            "/api/admin/appointments/1/status",
            Some(&token),
            json!({ "status": "confirmed" }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_appointments_include_owner_contact() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", true).await;
    let (uid, _) = app.user("client", false).await;
    app.appointment(uid, "2024-06-01", "10:00", &["Peyzaj Düzenleme"], &["p.png"])
        .await;

    let json = body_json(app.send(get("/api/admin/appointments", Some(&admin))).await).await;
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["full_name"], "client Full");
    assert_eq!(list[0]["phone"], "5551234567");
    assert_eq!(list[0]["email"], "client@example.com");
    assert_eq!(list[0]["services"], json!(["Peyzaj Düzenleme"]));
    assert_eq!(list[0]["images"], json!(["p.png"]));
}

#[tokio::test]
async fn status_transition_validates_and_persists() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", true).await;
    let (uid, user_token) = app.user("client", false).await;
    let id = app.appointment(uid, "2024-06-01", "10:00", &[], &[]).await;
    let uri = format!("/api/admin/appointments/{id}/status");

    for bad in [
        json!({ "status": "done" }),
        json!({ "status": "PENDING" }),
        json!({}),
        json!({ "status": 5 }),
        json!({ "status": ["confirmed"] }),
    ] {
        let resp = app.send(json_request("PUT", &uri, Some(&admin), bad)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    let resp = app
        .send(json_request(
            "PUT",
            "/api/admin/appointments/first/status",
            Some(&admin),
            json!({ "status": "confirmed" }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let mine = body_json(app.send(get("/api/appointments/my", Some(&user_token))).await).await;
    assert_eq!(mine[0]["status"], "pending");

    let resp = app
        .send(json_request("PUT", &uri, Some(&admin), json!({ "status": "confirmed" })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mine = body_json(app.send(get("/api/appointments/my", Some(&user_token))).await).await;
    assert_eq!(mine[0]["status"], "confirmed");

    // no transition graph: back to pending is allowed
    let resp = app
        .send(json_request("PUT", &uri, Some(&admin), json!({ "status": "pending" })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_transition_on_missing_appointment_is_not_found() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", true).await;

    let resp = app
        .send(json_request(
            "PUT",
            "/api/admin/appointments/777/status",
            Some(&admin),
            json!({ "status": "cancelled" }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "APPOINTMENT_NOT_FOUND");
}

#[tokio::test]
async fn dashboard_counts() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", true).await;
    let (uid, _) = app.user("client", false).await;
    app.user("client2", false).await;

    let today = Utc::now().date_naive();
    let fmt = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
    app.appointment(uid, &fmt(today), "10:00", &[], &[]).await;
    app.appointment(uid, &fmt(today - Duration::days(7)), "10:00", &[], &[])
        .await;
    let old = app
        .appointment(uid, &fmt(today - Duration::days(30)), "10:00", &[], &[])
        .await;
    app.send(json_request(
        "PUT",
        &format!("/api/admin/appointments/{old}/status"),
        Some(&admin),
        json!({ "status": "completed" }),
    ))
    .await;

    let resp = app.send(get("/api/admin/dashboard", Some(&admin))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(
        json,
        json!({
            "totalAppointments": 3,
            "pendingAppointments": 2,
            "totalUsers": 2,
            "thisWeekAppointments": 2,
        })
    );
}

#[tokio::test]
async fn users_listing_hides_admins_and_passwords() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", true).await;
    app.user("client", false).await;

    let json = body_json(app.send(get("/api/admin/users", Some(&admin))).await).await;
    let users = json.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "client");
    assert!(users[0].get("password").is_none());
    assert!(users[0].get("is_admin").is_none());
}
