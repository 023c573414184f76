//! Store behaviour against an in-memory SQLite database.

mod common;

use chrono::{NaiveDate, NaiveTime};
use common::TestApp;
use garden_booking::{
    models::{AppointmentStatus, NewAppointment},
    services::stats,
    store::{AppointmentScope, Store, StoreError},
};

fn new_appointment(user_id: i32, services: &[&str], images: &[&str]) -> NewAppointment {
    NewAppointment {
        user_id,
        appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        notes: Some("front lawn".into()),
        services: services.iter().map(|s| s.to_string()).collect(),
        images: images.iter().map(|s| s.to_string()).collect(),
    }
}

async fn fail_inserts_into(app: &TestApp, table: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER fail_{table} BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;"
    ))
    .execute(app.store.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn creation_rolls_back_when_an_image_insert_fails() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("atomic", false).await;
    fail_inserts_into(&app, "appointment_images").await;

    let err = app
        .store
        .create_appointment(&new_appointment(uid, &["Çim Biçme", "Akıllı Bahçe"], &["x.png"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));

    assert_eq!(app.count("appointments").await, 0);
    assert_eq!(app.count("appointment_services").await, 0);
    assert_eq!(app.count("appointment_images").await, 0);
}

#[tokio::test]
async fn creation_rolls_back_when_a_service_insert_fails() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("atomic2", false).await;
    fail_inserts_into(&app, "appointment_services").await;

    let res = app
        .store
        .create_appointment(&new_appointment(uid, &["Çim Biçme"], &[]))
        .await;
    assert!(res.is_err());

    assert_eq!(app.count("appointments").await, 0);
    assert_eq!(app.count("appointment_services").await, 0);

    // the store keeps working after the rollback
    let views = app
        .store
        .list_appointments(AppointmentScope::User(uid))
        .await
        .unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn appointment_for_unknown_user_is_rejected() {
    let app = TestApp::new().await;
    let res = app
        .store
        .create_appointment(&new_appointment(9999, &["Çim Biçme"], &[]))
        .await;
    assert!(matches!(res, Err(StoreError::Database(_))));
    assert_eq!(app.count("appointments").await, 0);
    assert_eq!(app.count("appointment_services").await, 0);
}

#[tokio::test]
async fn listing_matches_child_rows_exactly() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("children", false).await;

    let id = app
        .store
        .create_appointment(&new_appointment(
            uid,
            &["Çim Biçme", "Çim Havalandırma", "Bahçe Aydınlatma"],
            &["1.png", "2.png", "3.gif"],
        ))
        .await
        .unwrap();

    let views = app
        .store
        .list_appointments(AppointmentScope::User(uid))
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, id);
    assert_eq!(views[0].notes.as_deref(), Some("front lawn"));
    assert_eq!(
        views[0].services,
        vec!["Çim Biçme", "Çim Havalandırma", "Bahçe Aydınlatma"]
    );
    assert_eq!(views[0].images, vec!["1.png", "2.png", "3.gif"]);
}

#[tokio::test]
async fn admin_scope_orders_by_date_then_time_and_attaches_owner() {
    let app = TestApp::new().await;
    let (a, _) = app.user("alice", false).await;
    let (b, _) = app.user("bob", false).await;

    let early = app.appointment(a, "2024-06-01", "08:00", &[], &[]).await;
    let late_same_day = app.appointment(b, "2024-06-01", "16:00", &[], &[]).await;
    let newest = app.appointment(a, "2024-07-01", "08:00", &[], &[]).await;

    let views = app.store.list_appointments(AppointmentScope::All).await.unwrap();
    let ids: Vec<i32> = views.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![newest, late_same_day, early]);

    let owner = views[1].owner.as_ref().unwrap();
    assert_eq!(owner.full_name, "bob Full");
    assert_eq!(owner.email, "bob@example.com");
}

#[tokio::test]
async fn status_update_hits_exactly_one_row() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("status", false).await;
    let first = app.appointment(uid, "2024-06-01", "08:00", &["Çim Biçme"], &[]).await;
    let second = app.appointment(uid, "2024-06-02", "08:00", &[], &[]).await;

    app.store
        .set_appointment_status(first, AppointmentStatus::Cancelled)
        .await
        .unwrap();
    // any state may follow any other
    app.store
        .set_appointment_status(first, AppointmentStatus::Pending)
        .await
        .unwrap();
    app.store
        .set_appointment_status(first, AppointmentStatus::Completed)
        .await
        .unwrap();

    let views = app
        .store
        .list_appointments(AppointmentScope::User(uid))
        .await
        .unwrap();
    let by_id = |id| views.iter().find(|v| v.id == id).unwrap();
    assert_eq!(by_id(first).status, "completed");
    assert_eq!(by_id(first).services, vec!["Çim Biçme"]);
    assert_eq!(by_id(second).status, "pending");

    let missing = app
        .store
        .set_appointment_status(4242, AppointmentStatus::Confirmed)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn dashboard_window_is_rolling_and_inclusive() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("stats", false).await;
    app.user("admin", true).await;
    app.user("second", false).await;

    // today fixed at 2024-03-10 -> window [2024-03-03, 2024-03-10]
    let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    app.appointment(uid, "2024-03-02", "10:00", &[], &[]).await; // day before window
    app.appointment(uid, "2024-03-03", "10:00", &[], &[]).await; // first day
    app.appointment(uid, "2024-03-07", "10:00", &[], &[]).await;
    app.appointment(uid, "2024-03-10", "23:00", &[], &[]).await; // today
    let confirmed = app.appointment(uid, "2024-03-11", "10:00", &[], &[]).await; // tomorrow
    app.store
        .set_appointment_status(confirmed, AppointmentStatus::Confirmed)
        .await
        .unwrap();

    let s = stats::dashboard(app.store.as_ref(), today).await.unwrap();
    assert_eq!(s.total_appointments, 5);
    assert_eq!(s.pending_appointments, 4);
    assert_eq!(s.total_users, 2);
    assert_eq!(s.this_week_appointments, 3);
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = TestApp::new().await;
    app.user("taken", false).await;

    assert!(
        app.store
            .username_or_email_taken("taken", "fresh@example.com")
            .await
            .unwrap()
    );
    assert!(
        app.store
            .username_or_email_taken("fresh", "taken@example.com")
            .await
            .unwrap()
    );
    assert!(
        !app.store
            .username_or_email_taken("fresh", "fresh@example.com")
            .await
            .unwrap()
    );

    let res = app
        .store
        .create_user(&garden_booking::models::NewUser {
            username: "taken".into(),
            password_hash: "x".into(),
            email: "other@example.com".into(),
            phone: "1".into(),
            full_name: "Dup".into(),
            address: None,
            is_admin: false,
        })
        .await;
    assert!(matches!(res, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn review_mutations_respect_ownership() {
    let app = TestApp::new().await;
    let (owner, _) = app.user("owner", false).await;
    let (intruder, _) = app.user("intruder", false).await;

    let id = app.store.create_review(owner, 5, "great").await.unwrap();

    assert!(matches!(
        app.store.update_review(id, intruder, 1, "bad").await,
        Err(StoreError::NotOwner)
    ));
    assert!(matches!(
        app.store.delete_review(id, intruder).await,
        Err(StoreError::NotOwner)
    ));
    assert!(matches!(
        app.store.delete_review(id + 100, owner).await,
        Err(StoreError::NotFound)
    ));

    app.store.update_review(id, owner, 4, "good").await.unwrap();
    let mine = app.store.list_reviews_by_user(owner).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].rating, 4);
    assert_eq!(mine[0].comment, "good");

    app.store.delete_review(id, owner).await.unwrap();
    assert!(app.store.list_reviews().await.unwrap().is_empty());
}

#[tokio::test]
async fn revoked_and_expired_sessions_are_not_found() {
    let app = TestApp::new().await;
    let (uid, _) = app.user("sess", false).await;
    let now = chrono::Utc::now().naive_utc();

    app.store
        .create_session(uid, "live", now + chrono::Duration::hours(1))
        .await
        .unwrap();
    app.store
        .create_session(uid, "stale", now - chrono::Duration::hours(1))
        .await
        .unwrap();

    let live = app.store.find_session("live", now).await.unwrap().unwrap();
    assert_eq!(live.user_id, uid);
    assert!(!live.is_admin);
    assert!(app.store.find_session("stale", now).await.unwrap().is_none());

    app.store.revoke_session(live.session_id).await.unwrap();
    assert!(app.store.find_session("live", now).await.unwrap().is_none());
}
