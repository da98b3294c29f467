//! Well-known topic and query names on the stream.
//!
//! Topic names are open-ended strings; only the names listed here carry
//! special meaning to the client itself.

/// Reserved inbound topic carrying a platform notification request.
///
/// Frames with this query are intercepted by the notification bridge
/// before fan-out and are never delivered to ordinary subscribers.
pub const HTML5_NOTIFY: &str = "html5_notify";

/// Query asking the server to report its version, sent once per
/// successful connection as part of the bootstrap sequence.
pub const GET_SERVER_VERSION: &str = "event_get_server_version";
