//! Public stream client handle.
//!
//! [`StreamClient`] is an explicit, caller-constructed object with a
//! single-instance lifecycle: construct it at application startup, call
//! [`StreamClient::connect`] once a token is available, and
//! [`StreamClient::disconnect`] at shutdown. The WebSocket itself lives
//! in a background task; the handle talks to it over a command channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vesta_core::{Envelope, EncodeError, NotifyEvent, SubscriberId};

use crate::connection::{ConnCmd, ConnectionContext, connection_task};
use crate::notify::{NotificationBridge, Notifier};
use crate::registry::TopicRegistry;
use crate::settings::StreamSettings;
use crate::state::{StatusFlag, StreamStatus};
use crate::url::resolve_stream_url;

/// Capacity of the command channel into the connection task.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Handle over a spawned connection task.
struct ConnectionHandle {
    cmd_tx: mpsc::Sender<ConnCmd>,
    task: JoinHandle<()>,
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        // Best-effort shutdown signal for handles dropped without an
        // explicit disconnect.
        let _ = self.cmd_tx.try_send(ConnCmd::Shutdown);
    }
}

/// Persistent, auto-reconnecting event-stream client.
///
/// One long-lived WebSocket connection multiplexes all topics;
/// subscribers register callbacks per topic and receive decoded payloads
/// in socket-receipt order. Subscriptions are independent of the
/// connection lifecycle and survive reconnects.
pub struct StreamClient {
    registry: Arc<Mutex<TopicRegistry>>,
    status: Arc<StatusFlag>,
    bridge: Arc<NotificationBridge>,
    settings: StreamSettings,
    conn: Mutex<Option<ConnectionHandle>>,
}

impl StreamClient {
    /// Create a client with the given settings and an optional platform
    /// notification backend.
    #[must_use]
    pub fn new(settings: StreamSettings, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(TopicRegistry::new())),
            status: Arc::new(StatusFlag::new()),
            bridge: Arc::new(NotificationBridge::new(notifier)),
            settings,
            conn: Mutex::new(None),
        }
    }

    /// Open the stream connection.
    ///
    /// `base_url` is an HTTP(S) URL; the scheme is rewritten to the
    /// WebSocket equivalent and `/v1/ws` appended. A no-op when a
    /// connection already exists — never an error, so callers may invoke
    /// this from several places without coordination.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect(&self, base_url: &str, access_token: &str) {
        let mut conn = self.conn.lock();
        if conn.is_some() {
            debug!("connect ignored, stream connection already exists");
            return;
        }

        let url = resolve_stream_url(base_url, access_token, self.settings.server_id.as_deref());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let ctx = ConnectionContext {
            url,
            access_token: access_token.to_owned(),
            registry: Arc::clone(&self.registry),
            status: Arc::clone(&self.status),
            bridge: Arc::clone(&self.bridge),
            reconnect_delay: Duration::from_millis(self.settings.reconnect_delay_ms),
        };
        let task = tokio::spawn(connection_task(ctx, cmd_rx));
        *conn = Some(ConnectionHandle { cmd_tx, task });
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Waits for the background task to finish, so no reconnect attempt
    /// can occur after this returns. A no-op when not connected.
    /// In-flight sends are not flushed.
    pub async fn disconnect(&self) {
        let handle = self.conn.lock().take();
        let Some(mut handle) = handle else {
            debug!("disconnect ignored, no stream connection");
            return;
        };

        if handle.cmd_tx.send(ConnCmd::Shutdown).await.is_err() {
            // Task already gone; nothing to wait for.
            handle.task.abort();
            return;
        }
        if let Some(e) = (&mut handle.task).await.err().filter(|e| !e.is_cancelled()) {
            warn!(error = %e, "connection task ended abnormally");
        }
    }

    /// Serialize `message` to JSON and transmit it.
    ///
    /// Silently drops the message when disconnected — this layer offers
    /// no send-side durability; callers needing guarantees must buffer
    /// externally.
    pub fn send<T: Serialize>(&self, message: &T) {
        match serde_json::to_string(message) {
            Ok(json) => self.send_raw(json),
            Err(e) => warn!(error = %e, "unserializable outbound message, dropping"),
        }
    }

    /// Encode `body` into an envelope under `query` and transmit it.
    pub fn send_query<T: Serialize>(&self, query: &str, body: &T) -> Result<(), EncodeError> {
        let wire = Envelope::encode(query, body)?.to_wire()?;
        self.send_raw(wire);
        Ok(())
    }

    fn send_raw(&self, json: String) {
        let conn = self.conn.lock();
        match conn.as_ref() {
            Some(handle) => {
                if handle.cmd_tx.try_send(ConnCmd::Send(json)).is_err() {
                    debug!("command channel full or closed, dropping message");
                }
            }
            None => debug!("send while disconnected, dropping message"),
        }
    }

    /// Register `callback` for `topic` under the given subscriber id.
    ///
    /// Re-subscribing with the same id replaces the prior callback.
    /// Works whether or not the stream is currently connected.
    pub fn subscribe<F>(&self, topic: &str, id: impl Into<SubscriberId>, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry
            .lock()
            .subscribe(topic, id.into(), Arc::new(callback));
    }

    /// Remove the subscription for `(topic, id)`; no-op when absent.
    pub fn unsubscribe(&self, topic: &str, id: impl Into<SubscriberId>) {
        self.registry.lock().unsubscribe(topic, &id.into());
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> StreamStatus {
        self.status.get()
    }

    /// Observe status transitions.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.subscribe()
    }

    /// Raise a local notification directly, independent of the stream.
    ///
    /// Goes through the same permission negotiation as the reserved
    /// `html5_notify` topic.
    pub async fn notify(&self, event: NotifyEvent) {
        self.bridge.deliver(event).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vesta_core::topics;

    fn test_client() -> StreamClient {
        StreamClient::new(StreamSettings::default(), None)
    }

    #[tokio::test]
    async fn starts_offline() {
        let client = test_client();
        assert_eq!(client.status(), StreamStatus::Offline);
    }

    #[tokio::test]
    async fn send_while_disconnected_is_silently_dropped() {
        let client = test_client();
        client.send(&serde_json::json!({ "query": "noop" }));
        let _ = client.send_query("noop", &serde_json::json!({}));
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_manage_the_registry() {
        let client = test_client();
        client.subscribe("t", "a", |_payload| {});
        client.subscribe("t", "b", |_payload| {});
        assert_eq!(client.registry.lock().subscriber_count("t"), 2);

        client.unsubscribe("t", "a");
        assert_eq!(client.registry.lock().subscriber_count("t"), 1);
    }

    #[tokio::test]
    async fn subscriptions_work_before_connect() {
        let client = test_client();
        client.subscribe(topics::GET_SERVER_VERSION, "probe", |_payload| {});
        assert_eq!(
            client
                .registry
                .lock()
                .subscriber_count(topics::GET_SERVER_VERSION),
            1
        );
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_a_noop() {
        let client = test_client();
        client.disconnect().await;
        assert_eq!(client.status(), StreamStatus::Offline);
    }

    #[tokio::test]
    async fn connect_twice_keeps_a_single_task() {
        // Port 9 (discard) on localhost is refused; the task just retries.
        let client = test_client();
        client.connect("http://127.0.0.1:9", "tok");
        client.connect("http://127.0.0.1:9", "tok");
        assert!(client.conn.lock().is_some());
        client.disconnect().await;
        assert!(client.conn.lock().is_none());
    }

    #[tokio::test]
    async fn disconnect_cancels_pending_reconnect() {
        // The refused connection puts the task into its retry sleep
        // (1000 ms default); disconnect must not wait it out.
        let client = test_client();
        client.connect("http://127.0.0.1:9", "tok");
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_millis(500), client.disconnect())
            .await
            .expect("disconnect should cancel the retry sleep promptly");
        assert_eq!(client.status(), StreamStatus::Offline);
    }
}
