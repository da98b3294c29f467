//! Error types for the envelope codec.
//!
//! The taxonomy distinguishes two very different failure modes on the
//! inbound path:
//!
//! - A frame that is not a protocol envelope at all (plain-text
//!   keep-alives) is **not** an error — [`crate::envelope::decode`]
//!   returns `Ok(None)` and the caller drops it at debug level.
//! - A structurally valid envelope whose `body` fails base64 or JSON
//!   decoding is a protocol violation worth surfacing as
//!   [`DecodeError`]; the frame is dropped but the connection survives.

use thiserror::Error;

/// Failure to encode an outbound envelope.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The payload could not be serialized to JSON.
    #[error("payload is not JSON-serializable: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure to decode the `body` of a structurally valid envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The `body` field was not valid base64.
    #[error("envelope body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded `body` bytes were not valid JSON.
    #[error("envelope body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
