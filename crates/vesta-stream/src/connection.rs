//! Background task owning the WebSocket connection.
//!
//! One task per [`crate::client::StreamClient`] connection. Lifecycle:
//!
//! 1. Open the transport and send the bootstrap frames
//! 2. Enter the event loop: read frames + process commands
//! 3. On close or transport error: flip the status flag to offline and
//!    retry at a fixed interval, indefinitely, until shutdown
//!
//! The socket handle never outlives one pass of the loop — each
//! successful reconnect binds a fresh stream. No error escapes the task;
//! everything is logged and folded into the retry loop.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use vesta_core::{Envelope, NotifyEvent, envelope, topics};

use crate::notify::NotificationBridge;
use crate::registry::{self, TopicRegistry};
use crate::state::{StatusFlag, StreamStatus};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands sent from the public client handle to the connection task.
pub(crate) enum ConnCmd {
    /// Transmit a pre-serialized JSON text frame.
    Send(String),
    /// Close the connection and stop the task.
    Shutdown,
}

/// Everything the connection task needs, bundled at spawn time.
pub(crate) struct ConnectionContext {
    /// Full stream URL (scheme rewritten, token and server id applied).
    pub url: String,
    /// Access token repeated inside the bootstrap handshake.
    pub access_token: String,
    /// Shared subscriber registry for fan-out.
    pub registry: Arc<Mutex<TopicRegistry>>,
    /// Online/offline flag, written only by this task.
    pub status: Arc<StatusFlag>,
    /// Bridge handling the reserved notification topic.
    pub bridge: Arc<NotificationBridge>,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
}

/// Why the event loop stopped.
enum LoopExit {
    /// Caller asked to disconnect; the task must end.
    Shutdown,
    /// The transport dropped; the task should reconnect.
    ConnectionLost,
}

/// Entry point of the background task.
pub(crate) async fn connection_task(ctx: ConnectionContext, mut cmd_rx: mpsc::Receiver<ConnCmd>) {
    loop {
        match connect_async(&ctx.url).await {
            Ok((mut ws, _response)) => {
                debug!("stream transport opened");
                ctx.status.set(StreamStatus::Online);

                let exit = match send_bootstrap(&mut ws, &ctx.access_token).await {
                    Ok(()) => drive(&mut ws, &mut cmd_rx, &ctx).await,
                    Err(e) => {
                        warn!(error = %e, "bootstrap send failed");
                        LoopExit::ConnectionLost
                    }
                };

                let _ = ws.close(None).await;
                ctx.status.set(StreamStatus::Offline);

                if matches!(exit, LoopExit::Shutdown) {
                    debug!("stream disconnected by caller");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "stream connection attempt failed");
            }
        }

        if !wait_before_retry(&mut cmd_rx, ctx.reconnect_delay).await {
            return;
        }
    }
}

/// Send the two bootstrap frames required after every open: the opaque
/// `init` handshake carrying the access token, then the server-version
/// query.
///
/// The handshake predates the envelope format and keeps its raw shape:
/// `{"body": base64("init"), "access_token": <token>}`.
async fn send_bootstrap(
    ws: &mut WsStream,
    access_token: &str,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let init = serde_json::json!({
        "body": BASE64.encode("init"),
        "access_token": access_token,
    });
    ws.send(Message::Text(init.to_string().into())).await?;

    match Envelope::query_only(topics::GET_SERVER_VERSION).to_wire() {
        Ok(wire) => ws.send(Message::Text(wire.into())).await?,
        Err(e) => warn!(error = %e, "failed to encode server-version query"),
    }
    Ok(())
}

/// The connected event loop: multiplex between caller commands and
/// inbound frames until one side ends the connection.
async fn drive(
    ws: &mut WsStream,
    cmd_rx: &mut mpsc::Receiver<ConnCmd>,
    ctx: &ConnectionContext,
) -> LoopExit {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ConnCmd::Send(json)) => {
                    if let Err(e) = ws.send(Message::Text(json.into())).await {
                        warn!(error = %e, "send failed, connection lost");
                        return LoopExit::ConnectionLost;
                    }
                }
                Some(ConnCmd::Shutdown) | None => return LoopExit::Shutdown,
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(text.as_str(), ctx).await,
                Some(Ok(Message::Ping(payload))) => {
                    let _ = ws.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Binary(_))) => {
                    debug!("ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("server closed the stream");
                    return LoopExit::ConnectionLost;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "transport error");
                    return LoopExit::ConnectionLost;
                }
                None => {
                    debug!("stream ended");
                    return LoopExit::ConnectionLost;
                }
            },
        }
    }
}

/// Decode one text frame and route it: reserved notification topic first,
/// then generic fan-out to topic subscribers.
async fn handle_frame(raw: &str, ctx: &ConnectionContext) {
    match envelope::decode(raw) {
        Ok(None) => debug!("non-protocol frame from the stream, dropping"),
        Ok(Some(decoded)) => {
            if decoded.query == topics::HTML5_NOTIFY {
                match serde_json::from_value::<NotifyEvent>(decoded.body) {
                    Ok(event) => ctx.bridge.deliver(event).await,
                    Err(e) => warn!(error = %e, "malformed html5_notify payload"),
                }
                return;
            }

            // Snapshot under the lock, invoke outside it, so a callback
            // that touches the registry cannot deadlock.
            let entries = ctx.registry.lock().snapshot(&decoded.query);
            registry::invoke_all(&decoded.query, &entries, &decoded.body);
        }
        Err(e) => warn!(error = %e, "protocol violation: dropping frame with undecodable body"),
    }
}

/// Sleep for the fixed retry interval, still servicing commands.
///
/// Returns `false` when a shutdown arrived during the wait — the pending
/// reconnect is cancelled and the task must end. Sends that arrive while
/// offline are dropped, matching the no-durability contract.
async fn wait_before_retry(cmd_rx: &mut mpsc::Receiver<ConnCmd>, delay: Duration) -> bool {
    debug!(?delay, "scheduling reconnect");
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ConnCmd::Send(_)) => {
                    debug!("send while offline, dropping message");
                }
                Some(ConnCmd::Shutdown) | None => return false,
            },
            () = &mut sleep => return true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retry_wait_elapses_without_commands() {
        let (_tx, mut rx) = mpsc::channel(4);
        assert!(wait_before_retry(&mut rx, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_wait_is_cancelled_by_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(ConnCmd::Shutdown).await.unwrap();
        assert!(!wait_before_retry(&mut rx, Duration::from_secs(3600)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_wait_drops_offline_sends_and_keeps_waiting() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(ConnCmd::Send("{}".to_owned())).await.unwrap();
        assert!(wait_before_retry(&mut rx, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_wait_ends_when_all_senders_drop() {
        let (tx, mut rx) = mpsc::channel::<ConnCmd>(4);
        drop(tx);
        assert!(!wait_before_retry(&mut rx, Duration::from_secs(3600)).await);
    }
}
