//! Live hub event stream with auto-reconnect.
//!
//! Connects to the service's `/deviceHub` WebSocket endpoint and streams
//! named events through a [`tokio::sync::broadcast`] channel. The hub
//! speaks a JSON framing: record-separator-delimited frames, opened by a
//! `{"protocol":"json","version":1}` handshake, followed by invocation
//! (type 1), ping (type 6), and close (type 7) messages. Reconnection with
//! exponential backoff + jitter is handled automatically, and connection
//! lifecycle transitions are published on a [`tokio::sync::watch`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use devdock_api::hub::{HubHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let hub_url = Url::parse("wss://devices.example.com/deviceHub")?;
//!
//! let handle = HubHandle::connect(hub_url, ReconnectConfig::default(), cancel.clone(), None)?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     println!("{}: {}", msg.target, msg.data);
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Channel capacities / protocol constants ──────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Frames on the wire are JSON objects terminated by U+001E.
const RECORD_SEPARATOR: char = '\u{1e}';

/// Interval between client-side keepalive pings.
const PING_INTERVAL: Duration = Duration::from_secs(15);

// ── HubStatus ────────────────────────────────────────────────────────

/// Connection lifecycle state, mutated only by the hub loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HubStatus {
    Connected,
    Reconnecting,
    #[default]
    Disconnected,
}

// ── HubMessage ───────────────────────────────────────────────────────

/// A named event received from the hub.
///
/// `data` is the raw first invocation argument. Producers are not
/// consistent about payload key casing -- consumers normalize once at
/// their boundary (see `devdock-core`).
#[derive(Debug, Clone)]
pub struct HubMessage {
    /// Invocation target, e.g. `"DeviceAdded"`, `"NewNotification"`.
    pub target: String,
    /// First invocation argument; `Null` for argument-less events.
    pub data: serde_json::Value,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for hub reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── HubHandle ────────────────────────────────────────────────────────

/// Handle to a running hub event stream.
///
/// Subscribers registered before a disconnect keep receiving after the
/// reconnect -- the broadcast channel outlives individual connections.
/// Call [`shutdown`](Self::shutdown) to tear down the background task.
pub struct HubHandle {
    event_rx: broadcast::Receiver<Arc<HubMessage>>,
    status_rx: watch::Receiver<HubStatus>,
    cancel: CancellationToken,
}

impl HubHandle {
    /// Spawn the hub connection loop.
    ///
    /// Returns immediately once the background task is spawned; the first
    /// connection attempt happens asynchronously. If `cookie` is provided
    /// it is attached to the WebSocket upgrade request (session auth).
    pub fn connect(
        hub_url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        cookie: Option<String>,
    ) -> Result<Self, Error> {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(HubStatus::Disconnected);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            hub_loop(hub_url, event_tx, status_tx, reconnect, task_cancel, cookie).await;
        });

        Ok(Self {
            event_rx,
            status_rx,
            cancel,
        })
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// Multiple consumers can subscribe concurrently. If a consumer falls
    /// behind, it receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HubMessage>> {
        self.event_rx.resubscribe()
    }

    /// Observe connection lifecycle transitions.
    pub fn status(&self) -> watch::Receiver<HubStatus> {
        self.status_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn hub_loop(
    hub_url: Url,
    event_tx: broadcast::Sender<Arc<HubMessage>>,
    status_tx: watch::Sender<HubStatus>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    cookie: Option<String>,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&hub_url, &event_tx, &status_tx, &cancel, cookie.as_deref()) => {
                match result {
                    // Clean disconnect (server close message or stream end).
                    // Reset attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("hub disconnected cleanly, reconnecting");
                        let _ = status_tx.send(HubStatus::Reconnecting);
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "hub error");
                        let _ = status_tx.send(HubStatus::Reconnecting);

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "hub reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    let _ = status_tx.send(HubStatus::Disconnected);

    #[allow(unreachable_code)]
    { tracing::debug!("hub loop exiting"); }
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection, run the handshake, then read
/// frames until the connection drops.
///
/// If `cookie` is provided, it's injected as a `Cookie` header on the
/// upgrade request (required for session-cookie auth).
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<HubMessage>>,
    status_tx: &watch::Sender<HubStatus>,
    cancel: &CancellationToken,
    cookie: Option<&str>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to hub");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::HubConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(cookie_val) = cookie {
        request = request.with_header("Cookie", cookie_val);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    // Protocol negotiation must complete before any event flows.
    write
        .send(tungstenite::Message::text(handshake_request()))
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    let mut handshake_done = false;
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = ping.tick(), if handshake_done => {
                write
                    .send(tungstenite::Message::text(ping_frame()))
                    .await
                    .map_err(|e| Error::HubConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        for raw in split_frames(&text) {
                            if handshake_done {
                                if let Some(close_err) = dispatch_frame(raw, event_tx) {
                                    return close_err;
                                }
                            } else {
                                check_handshake(raw)?;
                                handshake_done = true;
                                tracing::info!("hub connected");
                                let _ = status_tx.send(HubStatus::Connected);
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("hub transport ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "hub close frame received"
                            );
                        } else {
                            tracing::info!("hub close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::HubConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("hub stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

/// Handle one post-handshake frame.
///
/// Returns `Some(result)` when the connection must end: the server sent a
/// close message (`Ok` for a plain close, `Err` when it carried an error).
fn dispatch_frame(
    raw: &str,
    event_tx: &broadcast::Sender<Arc<HubMessage>>,
) -> Option<Result<(), Error>> {
    match parse_frame(raw) {
        Some(HubFrame::Invocation { target, mut arguments }) => {
            let data = if arguments.is_empty() {
                serde_json::Value::Null
            } else {
                arguments.swap_remove(0)
            };
            // Ignore send errors -- just means no active subscribers.
            let _ = event_tx.send(Arc::new(HubMessage { target, data }));
            None
        }
        Some(HubFrame::Ping) => {
            tracing::trace!("hub ping");
            None
        }
        Some(HubFrame::Close { error: None }) => {
            tracing::info!("hub close message received");
            Some(Ok(()))
        }
        Some(HubFrame::Close { error: Some(reason) }) => {
            Some(Err(Error::HubClosed { reason }))
        }
        Some(HubFrame::Other) | None => {
            tracing::debug!(frame = raw, "ignoring unrecognized hub frame");
            None
        }
    }
}

// ── Frame codec ──────────────────────────────────────────────────────

/// One decoded hub frame.
#[derive(Debug)]
enum HubFrame {
    /// `{"type":1,"target":...,"arguments":[...]}`
    Invocation {
        target: String,
        arguments: Vec<serde_json::Value>,
    },
    /// `{"type":6}` keepalive.
    Ping,
    /// `{"type":7}` server-initiated close.
    Close { error: Option<String> },
    /// Completion/stream frames the client doesn't consume.
    Other,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

/// The opening frame: `{"protocol":"json","version":1}` + record separator.
fn handshake_request() -> String {
    format!("{{\"protocol\":\"json\",\"version\":1}}{RECORD_SEPARATOR}")
}

/// Keepalive frame: `{"type":6}` + record separator.
fn ping_frame() -> String {
    format!("{{\"type\":6}}{RECORD_SEPARATOR}")
}

/// Split a text payload into individual frames, dropping the trailing
/// empty segment the record separator leaves behind.
fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR).filter(|s| !s.is_empty())
}

/// Validate the handshake response: `{}` on success, `{"error":...}`
/// when the server rejects the protocol.
fn check_handshake(raw: &str) -> Result<(), Error> {
    #[derive(Deserialize)]
    struct HandshakeResponse {
        #[serde(default)]
        error: Option<String>,
    }

    let resp: HandshakeResponse = serde_json::from_str(raw)
        .map_err(|e| Error::HubConnect(format!("invalid handshake response: {e}")))?;

    match resp.error {
        Some(err) => Err(Error::HubConnect(format!("handshake rejected: {err}"))),
        None => Ok(()),
    }
}

/// Decode a single frame. Returns `None` for unparseable input.
fn parse_frame(raw: &str) -> Option<HubFrame> {
    let frame: RawFrame = serde_json::from_str(raw).ok()?;
    Some(match frame.frame_type {
        1 => HubFrame::Invocation {
            target: frame.target.unwrap_or_default(),
            arguments: frame.arguments.unwrap_or_default(),
        },
        6 => HubFrame::Ping,
        7 => HubFrame::Close { error: frame.error },
        _ => HubFrame::Other,
    })
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config
        .initial_delay
        .as_secs_f64()
        * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn handshake_request_is_terminated() {
        let hs = handshake_request();
        assert!(hs.ends_with(RECORD_SEPARATOR));
        assert!(hs.starts_with("{\"protocol\":\"json\""));
    }

    #[test]
    fn split_frames_drops_trailing_empty() {
        let payload = format!("{{\"type\":6}}{RECORD_SEPARATOR}{{\"type\":6}}{RECORD_SEPARATOR}");
        let frames: Vec<&str> = split_frames(&payload).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], "{\"type\":6}");
    }

    #[test]
    fn check_handshake_accepts_empty_object() {
        check_handshake("{}").unwrap();
    }

    #[test]
    fn check_handshake_rejects_error() {
        let result = check_handshake("{\"error\":\"unsupported protocol\"}");
        assert!(matches!(result, Err(Error::HubConnect(_))));
    }

    #[test]
    fn parse_invocation_frame() {
        let raw = r#"{
            "type": 1,
            "target": "DeviceAdded",
            "arguments": [{"DeviceName": "Sensor-A", "AddedBy": "alice"}]
        }"#;

        match parse_frame(raw) {
            Some(HubFrame::Invocation { target, arguments }) => {
                assert_eq!(target, "DeviceAdded");
                assert_eq!(arguments.len(), 1);
                assert_eq!(arguments[0]["DeviceName"], "Sensor-A");
            }
            other => panic!("expected Invocation, got {other:?}"),
        }
    }

    #[test]
    fn parse_ping_and_close_frames() {
        assert!(matches!(parse_frame("{\"type\":6}"), Some(HubFrame::Ping)));
        assert!(matches!(
            parse_frame("{\"type\":7}"),
            Some(HubFrame::Close { error: None })
        ));
        assert!(matches!(
            parse_frame("{\"type\":7,\"error\":\"shutting down\"}"),
            Some(HubFrame::Close { error: Some(_) })
        ));
    }

    #[test]
    fn parse_frame_tolerates_garbage() {
        assert!(parse_frame("not json at all").is_none());
    }

    #[test]
    fn dispatch_broadcasts_invocation() {
        let (tx, mut rx) = broadcast::channel(16);

        let raw = r#"{"type":1,"target":"NewNotification","arguments":[{"message":"hi"}]}"#;
        assert!(dispatch_frame(raw, &tx).is_none());

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.target, "NewNotification");
        assert_eq!(msg.data["message"], "hi");
    }

    #[test]
    fn dispatch_ends_connection_on_close() {
        let (tx, _rx) = broadcast::channel(16);

        let result = dispatch_frame("{\"type\":7}", &tx);
        assert!(matches!(result, Some(Ok(()))));

        let result = dispatch_frame("{\"type\":7,\"error\":\"bye\"}", &tx);
        assert!(matches!(result, Some(Err(Error::HubClosed { .. }))));
    }

    #[test]
    fn subscribers_survive_status_transitions() {
        let (event_tx, mut rx) = broadcast::channel(16);
        let (status_tx, status_rx) = watch::channel(HubStatus::Connected);

        // Simulate a drop + reconnect between two events.
        let raw = r#"{"type":1,"target":"DeviceDeleted","arguments":[]}"#;
        assert!(dispatch_frame(raw, &event_tx).is_none());
        status_tx.send(HubStatus::Reconnecting).unwrap();
        status_tx.send(HubStatus::Connected).unwrap();
        assert!(dispatch_frame(raw, &event_tx).is_none());

        assert_eq!(rx.try_recv().unwrap().target, "DeviceDeleted");
        assert_eq!(rx.try_recv().unwrap().target, "DeviceDeleted");
        assert_eq!(*status_rx.borrow(), HubStatus::Connected);
    }
}
