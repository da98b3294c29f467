//! Payload types for the reserved `html5_notify` topic.
//!
//! The shape aligns with platform notification option sets (body text,
//! icon, tag); unknown option keys are preserved in `extra` so a richer
//! platform backend can forward them untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A notification request received on the reserved topic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyEvent {
    /// Notification title.
    pub title: String,
    /// Presentation options.
    #[serde(default)]
    pub options: NotifyOptions,
}

/// Presentation options for a notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyOptions {
    /// Body text shown under the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Icon URL or resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Tag for platform-side coalescing of related notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Any further options the platform backend may understand.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
