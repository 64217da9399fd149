//! Runs against a real PostgreSQL when `TEST_DATABASE_URL` is set; skipped otherwise.

use abuseguard_database::{sqlx, Database, DatabaseConfig};
use abuseguard_engine::{AbuseError, ActivityEventStore, AdministratorDirectory, AlertStore, NotificationStore};
use abuseguard_models::{
    AbuseType, ActionFilter, ActivityEvent, AdminIdentity, AdminNotification, AlertStatus, CheckKind, LifecycleAction,
    Severity, TimeWindow, ViolationFlags, ViolationRecord,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

async fn setup_test_db() -> Option<Database> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db = Database::new(&DatabaseConfig::new(url).with_max_connections(5))
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");
    Some(db)
}

fn violation() -> ViolationRecord {
    ViolationRecord {
        check: CheckKind::MinuteAiBurst,
        action: "ai_requests".to_string(),
        limit: 10,
        observed_count: 31,
        window: TimeWindow::Minute,
        severity: Severity::Critical,
        abuse_type: AbuseType::ApiAbuse,
        reason: "AI request burst".to_string(),
        flags: ViolationFlags { possible_bot: false, possible_attack: true },
    }
}

#[tokio::test]
async fn test_activity_counts() {
    let Some(db) = setup_test_db().await else { return };
    let store = db.repositories().activity();
    let user = format!("test_{}", Uuid::new_v4());
    let now = Utc::now();

    store.append(&ActivityEvent::new(&user, "ai_chat").at(now)).await.unwrap();
    store.append(&ActivityEvent::new(&user, "ai_analysis").at(now)).await.unwrap();
    store.append(&ActivityEvent::new(&user, "booking_create").at(now - Duration::hours(2))).await.unwrap();

    let since = now - Duration::minutes(1);
    let ai = ActionFilter::AnyOf(vec!["ai_chat".into(), "ai_analysis".into()]);
    assert_eq!(store.count_events(&user, &ai, since).await.unwrap(), 2);
    assert_eq!(store.count_events(&user, &ActionFilter::All, since).await.unwrap(), 2);
    assert_eq!(
        store
            .count_events(&user, &ActionFilter::Exact("booking_create".into()), now - Duration::days(1))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_alert_transitions_and_counters() {
    let Some(db) = setup_test_db().await else { return };
    let store = db.repositories().alerts();
    let user = format!("test_{}", Uuid::new_v4());

    let before = store.get_stats().await.unwrap();
    let alert = store.create(&violation(), &user, Some("t@example.com"), None).await.unwrap();

    let fetched = store.get(alert.id).await.unwrap().unwrap();
    assert_eq!(fetched.details.metadata["possible_attack"], true);
    assert_eq!(store.list_by_user(&user, 10).await.unwrap().len(), 1);

    let (previous, resolved) = store
        .apply_transition(
            alert.id,
            &LifecycleAction::Resolve { resolver_id: "admin".into(), notes: Some("ok".into()) },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(previous, AlertStatus::Pending);
    assert_eq!(resolved.resolved_by.as_deref(), Some("admin"));

    let again = store
        .apply_transition(alert.id, &LifecycleAction::Dismiss { dismissed_by: None, notes: None }, Utc::now())
        .await;
    assert!(matches!(again, Err(AbuseError::InvalidTransition { .. })));

    let after = store.get_stats().await.unwrap();
    assert_eq!(after.total_alerts, before.total_alerts + 1);
    assert_eq!(after.resolved_alerts, before.resolved_alerts + 1);
    assert_eq!(after.pending_alerts, before.pending_alerts);
}

#[tokio::test]
async fn test_notifications_and_directory() {
    let Some(db) = setup_test_db().await else { return };
    let repos = db.repositories();
    let admin = AdminIdentity::new(format!("test_admin_{}", Uuid::new_v4()));

    let directory = repos.administrators();
    directory.upsert(&admin).await.unwrap();
    assert!(directory.is_administrator(&admin.user_id).await.unwrap());

    let alert = repos.alerts().create(&violation(), "test_user", None, None).await.unwrap();
    let notifications = repos.notifications();
    let notification = AdminNotification::for_alert(&admin, &alert, Utc::now());
    notifications.create(&notification).await.unwrap();

    assert!(matches!(
        notifications.mark_read(notification.id, "someone_else").await,
        Err(AbuseError::NotFound(_))
    ));
    assert!(notifications.mark_read(notification.id, &admin.user_id).await.unwrap().read);
    assert!(notifications
        .list_for_admin(&admin.user_id, true, Utc::now())
        .await
        .unwrap()
        .is_empty());

    // expired notifications drop out of the inbox but stay stored
    assert!(notifications
        .list_for_admin(&admin.user_id, false, Utc::now() + Duration::days(8))
        .await
        .unwrap()
        .is_empty());
    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_notifications WHERE id = $1")
        .bind(notification.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(stored, 1);
}
