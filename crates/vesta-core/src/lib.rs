//! # vesta-core
//!
//! Wire vocabulary shared by every Vesta stream consumer:
//!
//! - **Branded IDs**: [`CorrelationId`], [`SubscriberId`] as newtypes for type safety
//! - **Envelope codec**: outer JSON frame with a base64-encoded JSON `body`
//! - **Reserved topics**: well-known query names ([`topics`])
//! - **Notification payloads**: [`NotifyEvent`] / [`NotifyOptions`]
//! - **Errors**: [`EncodeError`] / [`DecodeError`] via `thiserror`

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod notify_event;
pub mod topics;

pub use envelope::{Decoded, Envelope, decode};
pub use errors::{DecodeError, EncodeError};
pub use ids::{CorrelationId, SubscriberId};
pub use notify_event::{NotifyEvent, NotifyOptions};
