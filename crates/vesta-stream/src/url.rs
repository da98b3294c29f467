//! Stream URL construction.
//!
//! The caller supplies an HTTP(S) base URL; the stream endpoint lives at
//! `/v1/ws` behind the WebSocket upgrade of the same host, so the scheme
//! is rewritten `http`→`ws` / `https`→`wss` before connecting.

use std::fmt::Write as _;

/// Build the full stream URL from a base URL, access token, and the
/// optionally cached server identifier.
///
/// `https://host` with token `tok` becomes
/// `wss://host/v1/ws?access_token=tok`.
pub(crate) fn resolve_stream_url(
    base_url: &str,
    access_token: &str,
    server_id: Option<&str>,
) -> String {
    let normalized = base_url.trim().trim_end_matches('/');
    // https must be rewritten before http, or "wss" would never match.
    let ws_base = if let Some(rest) = normalized.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = normalized.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        normalized.to_owned()
    };

    let mut url = format!("{ws_base}/v1/ws?access_token={access_token}");
    if let Some(id) = server_id {
        let _ = write!(url, "&server_id={id}");
    }
    url
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
