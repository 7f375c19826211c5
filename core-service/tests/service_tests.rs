//! End-to-end tests for the sync service façade over SQLite stores

use bridge_traits::{FixedClock, RecordStore};
use chrono::{TimeZone, Utc};
use core_content::{AdminEntity, AdminStatus, CanonicalEntity, DatabaseConfig};
use core_runtime::config::CoreConfig;
use core_service::{bootstrap, AuthDecision, ServiceError, SyncService, SyncStatus};
use std::sync::Arc;

async fn service() -> SyncService {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ));
    bootstrap(DatabaseConfig::in_memory(), CoreConfig::builder().clock(clock))
        .await
        .unwrap()
}

fn admin_user() -> AuthDecision {
    AuthDecision::allowed("admin@portal")
}

#[tokio::test]
async fn test_denied_request_is_rejected_before_sync() {
    let service = service().await;
    let admin = service.coordinator().config().admin_store.clone();
    admin
        .insert(AdminEntity::new("Hidden", "hidden", "Body").to_record())
        .await
        .unwrap();

    let result = service
        .sync_all("admin-to-canonical", &AuthDecision::denied("not an admin"))
        .await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));

    let canonical = service.coordinator().config().canonical_store.clone();
    assert!(canonical.list_all(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_direction_is_rejected() {
    let service = service().await;

    let result = service.sync_all("both-ways", &admin_user()).await;
    assert!(matches!(result, Err(ServiceError::InvalidDirection(ref d)) if d == "both-ways"));

    let result = service.sync_one("1", "", &admin_user()).await;
    assert!(matches!(result, Err(ServiceError::InvalidDirection(_))));
}

#[tokio::test]
async fn test_sync_all_response_shape() {
    let service = service().await;
    let admin = service.coordinator().config().admin_store.clone();
    let mut entry = AdminEntity::new("Future of AI", "future-of-ai", "Machines that learn.");
    entry.status = AdminStatus::Published;
    admin.insert(entry.to_record()).await.unwrap();
    admin
        .insert(AdminEntity::new("Second", "second", "Body").to_record())
        .await
        .unwrap();

    let response = service
        .sync_all("admin-to-canonical", &admin_user())
        .await
        .unwrap();

    assert_eq!(response.total_synced, 2);
    assert_eq!(response.created, 2);
    assert!(response.failed.is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["totalSynced"], 2);
    assert_eq!(json["direction"], "admin-to-canonical");
    assert_eq!(json["failed"], serde_json::json!([]));
    assert!(json.get("sourceError").is_none());

    let again = service
        .sync_all("admin-to-canonical", &admin_user())
        .await
        .unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.updated, 2);
}

#[tokio::test]
async fn test_sync_one_created_then_updated() {
    let service = service().await;
    let canonical = service.coordinator().config().canonical_store.clone();
    let mut post = CanonicalEntity::new("Exam Tips", "exam-tips", "Sleep well.");
    post.published = true;
    let saved = canonical.insert(post.to_record()).await.unwrap();
    let id = CanonicalEntity::from_record(&saved).unwrap().id;

    let first = service
        .sync_one(&id, "canonical-to-admin", &admin_user())
        .await
        .unwrap();
    assert_eq!(first.status, SyncStatus::Created);
    assert_eq!(first.target_id.as_deref(), Some(id.as_str()));

    let second = service
        .sync_one(&id, "canonical-to-admin", &admin_user())
        .await
        .unwrap();
    assert_eq!(second.status, SyncStatus::Updated);

    let json = serde_json::to_value(&second).unwrap();
    assert_eq!(json["status"], "updated");
    assert_eq!(json["targetId"], id.as_str());
    assert!(json.get("reason").is_none());
}

#[tokio::test]
async fn test_sync_one_missing_source_is_a_failed_outcome() {
    let service = service().await;

    let response = service
        .sync_one("BLOG0000", "admin-to-canonical", &admin_user())
        .await
        .unwrap();

    assert_eq!(response.status, SyncStatus::Failed);
    assert_eq!(response.id, "BLOG0000");
    assert_eq!(response.reason.as_deref(), Some("SourceNotFound"));
    assert!(response.message.is_some());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["reason"], "SourceNotFound");
}
