#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devdock_api::{ApiClient, DevicePayload, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

fn secret(s: &str) -> SecretString {
    s.to_owned().into()
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "username": "alice" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/; HttpOnly")
                .set_body_json(json!({
                    "username": "alice",
                    "role": "Admin",
                    "userId": "u-42"
                })),
        )
        .mount(&server)
        .await;

    let info = client.login("alice", &secret("hunter2!A")).await.unwrap();

    assert_eq!(info.username, "alice");
    assert_eq!(info.role, "Admin");
    assert_eq!(info.user_id, "u-42");

    // The session cookie must land in the jar for hub auth.
    let cookie = client.cookie_header().unwrap();
    assert!(cookie.contains("session=abc123"), "got: {cookie}");
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let result = client.login("alice", &secret("wrong")).await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert!(
                message.contains("Invalid credentials"),
                "expected server message, got: {message}"
            );
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_register_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_partial_json(json!({ "role": "User" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Registered successfully" })),
        )
        .mount(&server)
        .await;

    let ack = client.register("bob", &secret("hunter2!A")).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Registered successfully"));
}

// ── Refresh-and-retry tests ─────────────────────────────────────────

#[tokio::test]
async fn test_expired_session_refreshes_and_retries_once() {
    let (server, client) = setup().await;

    // First hit: expired session.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    // Exactly one silent refresh.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Retry: fresh data, equivalent to a clean call.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "deviceName": "Sensor-A", "description": "hall", "createdBy": "alice" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices(false).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "Sensor-A");
    assert!(!devices[0].is_deleted);
}

#[tokio::test]
async fn test_failed_refresh_expires_session_without_retry() {
    let (server, client) = setup().await;

    // Original request 401s -- and must never be retried.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    // Refresh also rejected: the session is gone.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.list_devices(false).await;

    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_second_401_after_refresh_is_not_refreshed_again() {
    let (server, client) = setup().await;

    // Both the original call and its retry come back 401.
    Mock::given(method("GET"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    // The refresh endpoint must be hit exactly once.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.list_devices(false).await;

    // The retried response is returned as-is: a plain API error, not a loop.
    match result {
        Err(Error::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected Api error with status 401, got: {other:?}"),
    }
}

// ── Device tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_deleted_partition() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device"))
        .and(query_param("deleted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "deviceName": "Old-Cam", "description": "attic", "createdBy": "bob" }
        ])))
        .mount(&server)
        .await;

    let devices = client.list_devices(true).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 7);
    // The partition flag is stamped client-side.
    assert!(devices[0].is_deleted);
}

#[tokio::test]
async fn test_create_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device"))
        .and(body_partial_json(json!({ "deviceName": "Sensor-B" })))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    client
        .create_device(&DevicePayload {
            device_name: "Sensor-B".into(),
            description: "yard".into(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_conflict_with_deleted_record() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Device name already exists even if deleted",
            "deviceId": 12
        })))
        .mount(&server)
        .await;

    let result = client
        .create_device(&DevicePayload {
            device_name: "Sensor-A".into(),
            description: String::new(),
        })
        .await;

    match result {
        Err(Error::NameConflict { device_id, .. }) => assert_eq!(device_id, Some(12)),
        other => panic!("expected NameConflict, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_conflict_without_server_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "A device with this name exists even if deleted"
        })))
        .mount(&server)
        .await;

    let result = client
        .create_device(&DevicePayload {
            device_name: "Sensor-A".into(),
            description: String::new(),
        })
        .await;

    match result {
        Err(Error::NameConflict { device_id, .. }) => assert!(device_id.is_none()),
        other => panic!("expected NameConflict, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_restore_device() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/device/restore/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.restore_device(12).await.unwrap();
}

#[tokio::test]
async fn test_delete_device_error_surfaces_message() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/device/3"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Admins only" })),
        )
        .mount(&server)
        .await;

    let result = client.delete_device(3).await;

    match result {
        Err(Error::Api { status, ref message }) => {
            assert_eq!(status, 403);
            assert!(message.contains("Admins only"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── Notification tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_notifications() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "message": "alice added device \"Sensor-A\"",
                "createdAt": "2026-03-01T10:00:00Z",
                "isRead": false
            },
            {
                "id": 2,
                "message": "bob updated device \"Old-Cam\"",
                "createdAt": "2026-03-01T09:00:00Z",
                "isRead": true
            }
        ])))
        .mount(&server)
        .await;

    let feed = client.list_notifications().await.unwrap();

    assert_eq!(feed.len(), 2);
    assert!(!feed[0].is_read);
    assert!(feed[1].is_read);
}

#[tokio::test]
async fn test_unread_count() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 3 })))
        .mount(&server)
        .await;

    assert_eq!(client.unread_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_mark_all_read() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/device/notifications/markallread"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.mark_all_read().await.unwrap();
}

// ── Average trigger ─────────────────────────────────────────────────

#[tokio::test]
async fn test_calculate_average_ack() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device/calculate-average"))
        .and(body_partial_json(json!({ "columnName": "Temperature" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Temperature queued for calculation"
        })))
        .mount(&server)
        .await;

    let ack = client.calculate_average("Temperature").await.unwrap();
    assert_eq!(
        ack.message.as_deref(),
        Some("Temperature queued for calculation")
    );
}
