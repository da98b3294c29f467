//! # vesta-stream
//!
//! Persistent, auto-reconnecting WebSocket event-stream client.
//!
//! A single long-lived connection multiplexes many logical topics
//! between the client process and the server:
//!
//! - **Transport**: connect/close lifecycle with fixed-interval
//!   reconnection, owned by a background task
//! - **Fan-out**: topic → subscriber callback dispatch in receipt order
//! - **State**: observable `online`/`offline` flag via a `watch` channel
//! - **Notifications**: the reserved `html5_notify` topic is bridged to
//!   a platform notification backend with permission negotiation
//! - **Settings**: layered JSON file + env configuration carrying the
//!   cached server id and the reconnect interval
//!
//! # Usage
//!
//! ```no_run
//! use vesta_stream::{StreamClient, StreamSettings};
//!
//! # async fn run(token: &str) {
//! let client = StreamClient::new(StreamSettings::default(), None);
//! client.subscribe("state_changed", "dashboard", |payload| {
//!     println!("state: {payload}");
//! });
//! client.connect("https://gate.example.org", token);
//! // ... application runs ...
//! client.disconnect().await;
//! # }
//! ```

#![deny(unsafe_code)]

pub mod client;
mod connection;
pub mod errors;
pub mod notify;
pub mod registry;
pub mod settings;
pub mod state;
mod url;

pub use client::StreamClient;
pub use errors::{NotifyError, SettingsError};
pub use notify::{NotificationBridge, Notifier, NotifyPermission};
pub use registry::{TopicCallback, TopicRegistry};
pub use settings::{StreamSettings, load_settings, load_settings_from_path, settings_path};
pub use state::StreamStatus;
