//! Supabase Realtime client for order-table changes.
//!
//! Speaks the Phoenix channel protocol over a websocket: join one topic with
//! a `postgres_changes` filter, heartbeat every 30 seconds, and reconnect
//! with capped exponential backoff when the connection drops.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::remote::{ChangeKind, TableChange};

/// Channel topic joined for order changes.
pub const ORDERS_TOPIC: &str = "realtime:realtime-orders";

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Base delay between reconnection attempts (exponential backoff).
const RECONNECT_BASE_DELAY_MS: u64 = 1000;

/// Maximum delay between reconnection attempts.
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// Errors from a single realtime connection.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel join rejected: {0}")]
    JoinRejected(String),

    #[error("invalid realtime URL: {0}")]
    InvalidUrl(String),
}

/// Handle to the background connection task.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct RealtimeChannel {
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    pub(super) fn spawn(
        base_url: &str,
        anon_key: SecretString,
        changes: broadcast::Sender<TableChange>,
    ) -> Self {
        let url = websocket_url(base_url, anon_key.expose_secret());
        let task = tokio::spawn(connection_loop(url, anon_key, changes));
        Self { task }
    }

    /// Close the connection.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reconnect forever; the loop ends only when the task is aborted.
async fn connection_loop(
    url: Result<String, RealtimeError>,
    anon_key: SecretString,
    changes: broadcast::Sender<TableChange>,
) {
    let url = match url {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Realtime disabled");
            return;
        }
    };

    let mut attempts = 0u32;
    loop {
        match run_connection(&url, &anon_key, &changes, &mut attempts).await {
            Ok(()) => info!("Realtime connection closed by server"),
            Err(e) => warn!(error = %e, attempts, "Realtime connection failed"),
        }
        attempts = attempts.saturating_add(1);
        tokio::time::sleep(backoff_delay(attempts)).await;
    }
}

/// Run one connection until it closes.
///
/// Resets `attempts` once the channel join is acknowledged.
async fn run_connection(
    url: &str,
    anon_key: &SecretString,
    changes: &broadcast::Sender<TableChange>,
    attempts: &mut u32,
) -> Result<(), RealtimeError> {
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut next_ref = 1u64;
    write
        .send(Message::Text(join_message(next_ref, anon_key.expose_secret()).into()))
        .await?;
    let join_ref = next_ref.to_string();

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                next_ref += 1;
                write.send(Message::Text(heartbeat_message(next_ref).into())).await?;
            }
            msg = read.next() => {
                let Some(msg) = msg else { return Ok(()) };
                match msg? {
                    Message::Text(text) => match parse_frame(text.as_str())? {
                        Frame::Change(change) => {
                            debug!(event = ?change.event_type, table = %change.table, "Realtime change");
                            // No receivers is fine
                            let _ = changes.send(change);
                        }
                        Frame::Reply { reference, ok, detail } if reference.as_deref() == Some(join_ref.as_str()) => {
                            if !ok {
                                return Err(RealtimeError::JoinRejected(detail));
                            }
                            info!(topic = ORDERS_TOPIC, "Realtime channel joined");
                            *attempts = 0;
                        }
                        Frame::Reply { .. } | Frame::Other => {}
                        Frame::Error(detail) => return Err(RealtimeError::JoinRejected(detail)),
                    },
                    Message::Ping(data) => write.send(Message::Pong(data)).await?,
                    Message::Close(_) => return Ok(()),
                    _ => {}
                }
            }
        }
    }
}

/// Build the websocket URL from the project URL.
fn websocket_url(base_url: &str, anon_key: &str) -> Result<String, RealtimeError> {
    let rest = if let Some(host) = base_url.strip_prefix("https://") {
        format!("wss://{host}")
    } else if let Some(host) = base_url.strip_prefix("http://") {
        format!("ws://{host}")
    } else {
        return Err(RealtimeError::InvalidUrl(base_url.to_owned()));
    };
    Ok(format!(
        "{}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0",
        rest.trim_end_matches('/')
    ))
}

fn join_message(reference: u64, access_token: &str) -> String {
    serde_json::json!({
        "topic": ORDERS_TOPIC,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": "orders" }
                ]
            },
            "access_token": access_token
        },
        "ref": reference.to_string(),
        "join_ref": reference.to_string()
    })
    .to_string()
}

fn heartbeat_message(reference: u64) -> String {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string()
    })
    .to_string()
}

/// Capped exponential backoff with up to 20% jitter.
fn backoff_delay(attempts: u32) -> Duration {
    let base = RECONNECT_BASE_DELAY_MS
        .saturating_mul(1 << attempts.min(6))
        .min(MAX_RECONNECT_DELAY_MS);
    let jitter = rand::rng().random_range(0..=base / 5);
    Duration::from_millis(base + jitter)
}

// =============================================================================
// Frames
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    table: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Change(TableChange),
    Reply {
        reference: Option<String>,
        ok: bool,
        detail: String,
    },
    Error(String),
    Other,
}

fn parse_frame(text: &str) -> Result<Frame, RealtimeError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    Ok(match raw.event.as_str() {
        "postgres_changes" => raw
            .payload
            .get("data")
            .cloned()
            .and_then(|data| serde_json::from_value::<ChangeData>(data).ok())
            .map_or(Frame::Other, |data| {
                Frame::Change(TableChange::new(data.kind, data.table))
            }),
        "phx_reply" => Frame::Reply {
            reference: raw.reference,
            ok: raw.payload.get("status").and_then(serde_json::Value::as_str) == Some("ok"),
            detail: raw.payload.get("response").map_or_else(String::new, ToString::to_string),
        },
        "phx_error" | "system" if is_error_payload(&raw.payload) => {
            Frame::Error(raw.payload.to_string())
        }
        _ => Frame::Other,
    })
}

fn is_error_payload(payload: &serde_json::Value) -> bool {
    payload.get("status").and_then(serde_json::Value::as_str) == Some("error")
        || payload.as_object().is_some_and(serde_json::Map::is_empty)
}
