//! Realtime notifications.
//!
//! The backend pushes `{type, message, data}` payloads over a socket
//! authenticated by user id. Payloads land in a [`NotificationHub`] that
//! fans them out to any number of [`Subscription`]s; a subscription ends
//! when it is dropped, so listener lifetime follows view lifetime with
//! no manual bookkeeping. The transport sits behind the
//! [`NotificationSource`] trait; everything above it is testable with an
//! in-memory source.

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use serde::{Deserialize, Serialize};

const HUB_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Quiz,
    Package,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Fan-out point between one transport and many listening views.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver to current subscribers; returns how many there were.
    pub fn publish(&self, notification: Notification) -> usize {
        self.tx.send(notification).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<Notification>,
}

impl Subscription {
    /// Next notification, or `None` once the hub is gone. A slow
    /// subscriber that lags the buffer skips ahead rather than erroring
    /// out.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscription lagged; skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A transport yielding raw notification payloads.
#[async_trait]
pub trait NotificationSource: Send {
    /// The next raw payload, or `None` when the transport is closed.
    async fn next_payload(&mut self) -> Option<String>;
}

/// WebSocket transport against the backend's notification socket.
pub struct WsSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsSource {
    /// Connect and authenticate by user id (carried in the query string,
    /// matching the backend's socket contract).
    pub async fn connect(ws_url: &str, user_id: &str) -> Result<Self, NotifyError> {
        let url = format!("{ws_url}?user={user_id}");
        let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
        tracing::debug!(user = user_id, "notification socket connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl NotificationSource for WsSource {
    async fn next_payload(&mut self) -> Option<String> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "notification socket error");
                    return None;
                }
            }
        }
        None
    }
}

/// Handle to the listener task; aborts on shutdown or drop so no reader
/// outlives the view that started it.
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Pump a source into the hub until the source closes. Malformed
/// payloads are logged and dropped; one bad message must not end the
/// stream.
pub fn spawn_listener<S>(mut source: S, hub: NotificationHub) -> ListenerHandle
where
    S: NotificationSource + 'static,
{
    let task = tokio::spawn(async move {
        while let Some(payload) = source.next_payload().await {
            match serde_json::from_str::<Notification>(&payload) {
                Ok(notification) => {
                    hub.publish(notification);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding malformed notification");
                }
            }
        }
        tracing::debug!("notification source closed");
    });
    ListenerHandle { task }
}
