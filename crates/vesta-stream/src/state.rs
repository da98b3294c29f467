//! Observable connection state.
//!
//! A single `online`/`offline` flag written exclusively by the connection
//! task and read by any number of observers through a `watch` channel.
//! Downstream consumers (status bars, reconnect indicators) subscribe
//! and react to transitions.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Whether the stream connection is currently established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// The transport is open and the bootstrap handshake was sent.
    Online,
    /// No transport, or the transport was closed / errored.
    Offline,
}

/// Single-writer handle over the status channel.
///
/// Held by the connection task; observers get [`watch::Receiver`]s via
/// [`StatusFlag::subscribe`]. Transitions are deduplicated so each
/// open/close event produces exactly one observable change.
#[derive(Debug)]
pub(crate) struct StatusFlag {
    tx: watch::Sender<StreamStatus>,
}

impl StatusFlag {
    /// Create a new flag, initially [`StreamStatus::Offline`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StreamStatus::Offline);
        Self { tx }
    }

    /// Current status.
    pub fn get(&self) -> StreamStatus {
        *self.tx.borrow()
    }

    /// Create a new observer of status transitions.
    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.tx.subscribe()
    }

    /// Record a transition; a no-op when the status is unchanged.
    pub fn set(&self, status: StreamStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            info!(?status, "stream status changed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_offline() {
        let flag = StatusFlag::new();
        assert_eq!(flag.get(), StreamStatus::Offline);
    }

    #[test]
    fn set_online_is_observable() {
        let flag = StatusFlag::new();
        let rx = flag.subscribe();
        flag.set(StreamStatus::Online);
        assert_eq!(*rx.borrow(), StreamStatus::Online);
    }

    #[tokio::test]
    async fn duplicate_set_produces_no_second_notification() {
        let flag = StatusFlag::new();
        let mut rx = flag.subscribe();

        flag.set(StreamStatus::Online);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), StreamStatus::Online);

        // Same value again: the receiver must not see a new change.
        flag.set(StreamStatus::Online);
        assert!(!rx.has_changed().unwrap());

        flag.set(StreamStatus::Offline);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StreamStatus::Online).unwrap(),
            "\"online\""
        );
        assert_eq!(
            serde_json::to_string(&StreamStatus::Offline).unwrap(),
            "\"offline\""
        );
    }
}
