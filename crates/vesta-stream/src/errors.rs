//! Error types for the stream client.
//!
//! Transport failures never escape the connection task — they are logged
//! and fed into the reconnect loop. What remains visible to callers is
//! deliberately small: settings loading and platform notification
//! delivery.

use thiserror::Error;

/// Errors that can occur when loading or parsing stream settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// A platform notification backend failed to raise a notification.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
