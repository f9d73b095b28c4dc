#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` using wiremock. The live hub is
// disabled throughout -- hub reactions are driven directly through
// `apply_hub_event`, which is what the bridge task calls.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devdock_core::model::HubEvent;
use devdock_core::{
    AddDeviceOutcome, CachedUser, Coordinator, CoreError, Notice, Notification, Role,
    ServiceConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn coordinator(server: &MockServer) -> Coordinator {
    let config = ServiceConfig {
        url: server.uri().parse().unwrap(),
        hub_enabled: false,
        ..ServiceConfig::default()
    };
    Coordinator::new(config).unwrap()
}

fn secret(s: &str) -> SecretString {
    s.to_owned().into()
}

fn device_json(id: i64, name: &str) -> serde_json::Value {
    json!({ "id": id, "deviceName": name, "description": "test", "createdBy": "alice" })
}

async fn mount_login(server: &MockServer, role: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "alice",
            "role": role,
            "userId": "u-42"
        })))
        .mount(server)
        .await;
}

async fn mount_list_once(server: &MockServer, deleted: bool, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .and(query_param("deleted", if deleted { "true" } else { "false" }))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer, deleted: bool, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .and(query_param("deleted", if deleted { "true" } else { "false" }))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_notifications(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/device/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Sign-in & partitions ────────────────────────────────────────────

#[tokio::test]
async fn admin_sign_in_loads_both_partitions() {
    let server = MockServer::start().await;
    mount_login(&server, "Admin").await;
    mount_list(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_list(&server, true, json!([device_json(2, "Old-Cam")])).await;
    mount_notifications(&server, json!([])).await;

    let coord = coordinator(&server);
    let session = coord.sign_in("alice", &secret("pw")).await.unwrap();

    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.user_id.as_deref(), Some("u-42"));

    let active = coord.devices().active();
    let deleted = coord.devices().deleted();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Sensor-A");
    assert!(!active[0].deleted);
    assert_eq!(deleted.len(), 1);
    assert!(deleted[0].deleted);
}

#[tokio::test]
async fn regular_sign_in_skips_deleted_partition() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_notifications(&server, json!([])).await;

    // The deleted partition must never be requested for regular users.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .and(query_param("deleted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();

    assert_eq!(coord.devices().active().len(), 1);
    assert!(coord.devices().deleted().is_empty());
}

#[tokio::test]
async fn resume_probe_failure_expires() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    let result = coord
        .resume(CachedUser {
            username: "alice".into(),
            role: Role::User,
        })
        .await;

    assert!(matches!(result, Err(CoreError::SessionExpired)));
    assert!(!coord.session().is_signed_in());
}

// ── Soft-delete scenario ────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_moves_device_between_partitions() {
    let server = MockServer::start().await;
    mount_login(&server, "Admin").await;

    // Before the delete: Sensor-A active, nothing deleted.
    mount_list_once(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_list_once(&server, true, json!([])).await;
    mount_notifications(&server, json!([])).await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();
    assert_eq!(coord.devices().active().len(), 1);

    // After the delete the partitions swap.
    Mock::given(method("DELETE"))
        .and(path("/api/device/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(&server, false, json!([])).await;
    mount_list(
        &server,
        true,
        json!([{ "id": 1, "deviceName": "Sensor-A", "description": "test",
                 "createdBy": "alice", "isDeleted": true }]),
    )
    .await;

    coord.remove_device(1).await.unwrap();

    let active = coord.devices().active();
    let deleted = coord.devices().deleted();
    assert!(active.is_empty());
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].name, "Sensor-A");
    assert!(deleted[0].deleted);
}

// ── Add-conflict flow ───────────────────────────────────────────────

#[tokio::test]
async fn add_conflict_uses_server_id_when_present() {
    let server = MockServer::start().await;
    mount_login(&server, "Admin").await;
    mount_list(&server, false, json!([])).await;
    mount_list(&server, true, json!([])).await;
    mount_notifications(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Device name already exists even if deleted",
            "deviceId": 77
        })))
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();

    let outcome = coord.add_device("Sensor-A", "").await.unwrap();
    assert_eq!(
        outcome,
        AddDeviceOutcome::ConflictWithDeleted {
            restore_id: Some(77),
            message: "Device name already exists even if deleted".into(),
        }
    );
}

#[tokio::test]
async fn add_conflict_falls_back_to_deleted_partition_match() {
    let server = MockServer::start().await;
    mount_login(&server, "Admin").await;
    mount_list(&server, false, json!([])).await;
    // The deleted partition holds the record the name collides with.
    mount_list(&server, true, json!([device_json(12, "Sensor-A")])).await;
    mount_notifications(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "A device with this name exists even if deleted"
        })))
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();

    // Case-insensitive match against the cached deleted partition.
    let outcome = coord.add_device("sensor-a", "").await.unwrap();
    match outcome {
        AddDeviceOutcome::ConflictWithDeleted { restore_id, .. } => {
            assert_eq!(restore_id, Some(12));
        }
        other => panic!("expected conflict outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_name_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_notifications(&server, json!([])).await;

    // The create endpoint must never be hit.
    Mock::given(method("POST"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();

    let result = coord.add_device("  sensor-a  ", "dup").await;
    assert!(matches!(result, Err(CoreError::DuplicateName { .. })));
}

// ── Fail-safe partition reset ───────────────────────────────────────

#[tokio::test]
async fn refresh_failure_resets_the_partition() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list_once(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_notifications(&server, json!([])).await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();
    assert_eq!(coord.devices().active().len(), 1);

    // Next fetch blows up; the partition must reset, not go stale.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .and(query_param("deleted", "false"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let result = coord.reload_devices().await;
    assert!(result.is_err());
    assert!(coord.devices().active().is_empty());
}

// ── Optimistic mark-read ────────────────────────────────────────────

#[tokio::test]
async fn mark_all_read_is_optimistic_even_when_confirmation_fails() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list(&server, false, json!([])).await;
    mount_notifications(
        &server,
        json!([
            { "id": 1, "message": "a", "createdAt": "2026-03-01T10:00:00Z", "isRead": false },
            { "id": 2, "message": "b", "createdAt": "2026-03-01T09:00:00Z", "isRead": true },
            { "id": 3, "message": "c", "createdAt": "2026-03-01T08:00:00Z", "isRead": false }
        ]),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/device/notifications/markallread"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();
    assert_eq!(coord.notifications().unread_count(), 2);

    coord.mark_all_notifications_read().await;

    // Local state wins regardless of the confirmation outcome.
    assert_eq!(coord.notifications().unread_count(), 0);
    assert!(coord.notifications().entries().iter().all(|n| n.read));
}

// ── Hub event reactions ─────────────────────────────────────────────

#[tokio::test]
async fn notification_event_prepends_and_notifies() {
    let server = MockServer::start().await;
    let coord = coordinator(&server);
    let mut notices = coord.notices();

    coord
        .apply_hub_event(HubEvent::NotificationCreated(Notification {
            id: 9,
            message: "alice added device \"Sensor-A\"".into(),
            created_at: chrono::Utc::now(),
            read: false,
        }))
        .await;

    assert_eq!(coord.notifications().entries().len(), 1);
    assert_eq!(coord.notifications().unread_count(), 1);
    assert_eq!(
        notices.try_recv().unwrap(),
        Notice::NotificationReceived {
            message: "alice added device \"Sensor-A\"".into(),
        }
    );
}

#[tokio::test]
async fn device_updated_event_refreshes_both_states() {
    let server = MockServer::start().await;
    mount_list(&server, false, json!([device_json(1, "Renamed")])).await;
    mount_notifications(
        &server,
        json!([{ "id": 1, "message": "renamed", "createdAt": "2026-03-01T10:00:00Z",
                 "isRead": false }]),
    )
    .await;

    let coord = coordinator(&server);
    let mut notices = coord.notices();

    coord
        .apply_hub_event(HubEvent::DeviceUpdated {
            device_name: "Renamed".into(),
            updated_by: "bob".into(),
        })
        .await;

    assert_eq!(coord.devices().active()[0].name, "Renamed");
    assert_eq!(coord.notifications().entries().len(), 1);
    assert_eq!(
        notices.try_recv().unwrap(),
        Notice::DeviceUpdated {
            device_name: "Renamed".into(),
            updated_by: "bob".into(),
        }
    );
}

#[tokio::test]
async fn device_added_by_someone_else_only_notifies() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list_once(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_notifications(&server, json!([])).await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();

    // Any further device fetch would change the view; forbid it.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut notices = coord.notices();
    coord
        .apply_hub_event(HubEvent::DeviceAdded {
            device_name: "Sensor-B".into(),
            added_by: "bob".into(),
            user_id: Some("u-99".into()),
        })
        .await;

    assert!(matches!(
        notices.try_recv().unwrap(),
        Notice::DeviceAdded { .. }
    ));
    // The partitions are untouched until the next explicit refresh.
    assert_eq!(coord.devices().active().len(), 1);
}

#[tokio::test]
async fn device_added_by_self_triggers_refresh() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list_once(&server, false, json!([])).await;
    mount_notifications(&server, json!([])).await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();
    assert!(coord.devices().active().is_empty());

    mount_list(&server, false, json!([device_json(5, "Sensor-B")])).await;

    coord
        .apply_hub_event(HubEvent::DeviceAdded {
            device_name: "Sensor-B".into(),
            added_by: "alice".into(),
            user_id: Some("u-42".into()),
        })
        .await;

    assert_eq!(coord.devices().active().len(), 1);
    assert_eq!(coord.devices().active()[0].id, 5);
}

// ── Session expiry ──────────────────────────────────────────────────

#[tokio::test]
async fn irrecoverable_expiry_clears_everything() {
    let server = MockServer::start().await;
    mount_login(&server, "User").await;
    mount_list_once(&server, false, json!([device_json(1, "Sensor-A")])).await;
    mount_notifications(
        &server,
        json!([{ "id": 1, "message": "a", "createdAt": "2026-03-01T10:00:00Z",
                 "isRead": false }]),
    )
    .await;

    let coord = coordinator(&server);
    coord.sign_in("alice", &secret("pw")).await.unwrap();
    assert!(coord.session().is_signed_in());

    // Both the data endpoint and the refresh endpoint now reject.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut notices = coord.notices();
    let result = coord.reload_devices().await;

    assert!(matches!(result, Err(CoreError::SessionExpired)));
    assert!(!coord.session().is_signed_in());
    assert!(coord.devices().active().is_empty());
    assert!(coord.notifications().entries().is_empty());
    assert_eq!(notices.try_recv().unwrap(), Notice::SessionExpired);
}
