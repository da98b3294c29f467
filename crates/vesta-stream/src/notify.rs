//! Notification bridge: reserved-topic payloads → platform notifications.
//!
//! The platform notification capability is modelled as a trait object
//! that may simply be absent — on headless hosts the bridge degrades to
//! a warning. Permission follows the three-state model of platform
//! notification APIs: granted, denied, or not yet decided.
//!
//! Delivery is one-shot and fire-and-forget: no queuing, no
//! deduplication, and no error ever escapes the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use vesta_core::NotifyEvent;

use crate::errors::NotifyError;

/// Platform notification permission state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyPermission {
    /// The user has allowed notifications.
    Granted,
    /// The user has blocked notifications.
    Denied,
    /// The user has not decided yet; asking is allowed.
    Undetermined,
}

/// Capability seam over the platform notification API.
///
/// Implementations wrap whatever the host offers (desktop notification
/// daemon, test recorder); absence of any backend is represented by
/// constructing the bridge with `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Current permission state.
    fn permission(&self) -> NotifyPermission;

    /// Ask the user for permission; resolves to the new state.
    async fn request_permission(&self) -> NotifyPermission;

    /// Raise a notification now.
    fn show(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Converts reserved-topic payloads into platform notification requests,
/// negotiating permission on the way.
pub struct NotificationBridge {
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationBridge {
    /// Create a bridge over an optional platform backend.
    #[must_use]
    pub fn new(notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { notifier }
    }

    /// Whether a platform backend is present.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.notifier.is_some()
    }

    /// Deliver one notification request, negotiating permission.
    ///
    /// - no backend → warn and return
    /// - permission granted → show immediately
    /// - permission undetermined → request, show only if granted
    /// - permission denied → no-op
    pub async fn deliver(&self, event: NotifyEvent) {
        let Some(notifier) = &self.notifier else {
            warn!(title = %event.title, "platform notifications unavailable, dropping request");
            return;
        };

        match notifier.permission() {
            NotifyPermission::Granted => show_logged(notifier.as_ref(), &event),
            NotifyPermission::Denied => {
                debug!(title = %event.title, "notification permission denied, dropping request");
            }
            NotifyPermission::Undetermined => {
                match notifier.request_permission().await {
                    NotifyPermission::Granted => show_logged(notifier.as_ref(), &event),
                    outcome => {
                        debug!(title = %event.title, ?outcome, "notification permission not granted");
                    }
                }
            }
        }
    }
}

fn show_logged(notifier: &dyn Notifier, event: &NotifyEvent) {
    if let Err(e) = notifier.show(event) {
        warn!(title = %event.title, error = %e, "failed to raise notification");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn door_event() -> NotifyEvent {
        serde_json::from_value(serde_json::json!({
            "title": "Door",
            "options": { "body": "opened" },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn absent_backend_is_a_noop() {
        let bridge = NotificationBridge::new(None);
        assert!(!bridge.is_available());
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn granted_permission_shows_immediately() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Granted);
        let _ = notifier
            .expect_show()
            .withf(|e| e.title == "Door")
            .times(1)
            .returning(|_| Ok(()));
        let _ = notifier.expect_request_permission().times(0);

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn denied_permission_shows_nothing() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Denied);
        let _ = notifier.expect_show().times(0);
        let _ = notifier.expect_request_permission().times(0);

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn undetermined_requests_then_shows_when_granted() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Undetermined);
        let _ = notifier
            .expect_request_permission()
            .times(1)
            .returning(|| NotifyPermission::Granted);
        let _ = notifier.expect_show().times(1).returning(|_| Ok(()));

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn undetermined_requests_then_drops_when_denied() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Undetermined);
        let _ = notifier
            .expect_request_permission()
            .times(1)
            .returning(|| NotifyPermission::Denied);
        let _ = notifier.expect_show().times(0);

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn show_failure_is_swallowed() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Granted);
        let _ = notifier
            .expect_show()
            .times(1)
            .returning(|_| Err(NotifyError("daemon gone".to_owned())));

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
    }

    #[tokio::test]
    async fn repeat_delivery_produces_repeat_attempts() {
        let mut notifier = MockNotifier::new();
        let _ = notifier
            .expect_permission()
            .return_const(NotifyPermission::Granted);
        let _ = notifier.expect_show().times(2).returning(|_| Ok(()));

        let bridge = NotificationBridge::new(Some(Arc::new(notifier)));
        bridge.deliver(door_event()).await;
        bridge.deliver(door_event()).await;
    }
}
