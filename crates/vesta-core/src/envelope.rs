//! Envelope codec for the event stream wire protocol.
//!
//! Every protocol frame is an outer JSON object with a correlation `id`,
//! a `query` naming the logical topic, and an optional `body` holding a
//! base64-encoded JSON payload:
//!
//! ```json
//! { "id": "<uuid>", "query": "state_changed", "body": "<base64 JSON>" }
//! ```
//!
//! The wire also allows plain-text frames that carry no semantic payload
//! (keep-alives and the like); [`decode`] tolerates those by returning
//! `Ok(None)` instead of an error.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DecodeError, EncodeError};
use crate::ids::CorrelationId;

/// Outbound protocol frame.
///
/// `body` is already base64-encoded JSON; use [`Envelope::encode`] to
/// build one from a serializable payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Client-generated correlation ID, used for traceability only.
    pub id: CorrelationId,
    /// Logical topic the frame belongs to.
    pub query: String,
    /// Base64-encoded JSON payload; absent for payload-less queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Envelope {
    /// Encode a payload under a fresh correlation ID.
    pub fn encode<T: Serialize>(query: &str, body: &T) -> Result<Self, EncodeError> {
        Self::encode_with_id(CorrelationId::new(), query, body)
    }

    /// Encode a payload under an explicit correlation ID.
    pub fn encode_with_id<T: Serialize>(
        id: CorrelationId,
        query: &str,
        body: &T,
    ) -> Result<Self, EncodeError> {
        let json = serde_json::to_vec(body)?;
        Ok(Self {
            id,
            query: query.to_owned(),
            body: Some(BASE64.encode(json)),
        })
    }

    /// Build a payload-less frame (e.g. the server-version query).
    #[must_use]
    pub fn query_only(query: &str) -> Self {
        Self {
            id: CorrelationId::new(),
            query: query.to_owned(),
            body: None,
        }
    }

    /// Serialize to the wire representation (outer JSON text).
    pub fn to_wire(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A successfully decoded inbound frame, with the `body` already
/// base64-decoded and parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    /// Correlation ID, when the server set one.
    pub id: Option<CorrelationId>,
    /// Logical topic the frame belongs to.
    pub query: String,
    /// Decoded payload; `Value::Null` when the frame carried no body.
    pub body: Value,
}

/// Inbound shape: like [`Envelope`] but every field may be absent.
#[derive(Deserialize)]
struct WireEnvelope {
    id: Option<CorrelationId>,
    query: String,
    body: Option<String>,
}

/// Decode a raw text frame.
///
/// Returns:
/// - `Ok(Some(_))` for a valid envelope with a decodable payload;
/// - `Ok(None)` when the frame is not a protocol envelope at all
///   (non-JSON text, or JSON without a `query`) — the caller should
///   drop it at debug level;
/// - `Err(_)` when a structurally valid envelope carries a corrupt
///   `body` — a protocol violation worth logging, but not fatal to
///   the connection.
///
/// An envelope with no `body` field at all is still a protocol frame:
/// it decodes with a `Value::Null` payload and is dispatched, rather
/// than dropped. Bootstrap responses and acknowledgements carry no
/// body, and subscribers to such topics still want the signal.
pub fn decode(raw: &str) -> Result<Option<Decoded>, DecodeError> {
    let Ok(wire) = serde_json::from_str::<WireEnvelope>(raw) else {
        return Ok(None);
    };

    let body = match wire.body {
        None => Value::Null,
        Some(encoded) => {
            let bytes = BASE64.decode(encoded.as_bytes())?;
            serde_json::from_slice(&bytes).map_err(DecodeError::Json)?
        }
    };

    Ok(Some(Decoded {
        id: wire.id,
        query: wire.query,
        body,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn encode_then_decode_recovers_query_and_body() {
        let payload = json!({ "entity": "light.kitchen", "state": "on", "level": 80 });
        let env = Envelope::encode("state_changed", &payload).unwrap();
        let wire = env.to_wire().unwrap();

        let decoded = decode(&wire).unwrap().expect("should be a protocol frame");
        assert_eq!(decoded.query, "state_changed");
        assert_eq!(decoded.body, payload);
        assert_eq!(decoded.id.unwrap(), env.id);
    }

    #[test]
    fn encode_with_id_preserves_id() {
        let id = CorrelationId::from("fixed-id");
        let env = Envelope::encode_with_id(id.clone(), "q", &json!(1)).unwrap();
        assert_eq!(env.id, id);
    }

    #[test]
    fn body_is_base64_on_the_wire() {
        let env = Envelope::encode("q", &json!("payload")).unwrap();
        let wire = env.to_wire().unwrap();
        let outer: Value = serde_json::from_str(&wire).unwrap();
        let body = outer["body"].as_str().unwrap();
        let bytes = BASE64.decode(body).unwrap();
        assert_eq!(bytes, b"\"payload\"");
    }

    #[test]
    fn query_only_omits_body_field() {
        let env = Envelope::query_only("event_get_server_version");
        let wire = env.to_wire().unwrap();
        let outer: Value = serde_json::from_str(&wire).unwrap();
        assert!(outer.get("body").is_none(), "body should be omitted: {wire}");
        assert!(outer.get("id").is_some());
    }

    #[test]
    fn non_json_frame_decodes_to_none() {
        assert_eq!(decode("just a keep-alive string").unwrap(), None);
    }

    #[test]
    fn json_without_query_decodes_to_none() {
        assert_eq!(decode(r#"{"hello": "world"}"#).unwrap(), None);
        assert_eq!(decode("\"quoted string\"").unwrap(), None);
    }

    #[test]
    fn corrupt_base64_body_is_a_decode_error() {
        let raw = r#"{"id":"1","query":"q","body":"@@@not-base64@@@"}"#;
        assert_matches!(decode(raw), Err(DecodeError::Base64(_)));
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        // base64("not json at all")
        let b64 = BASE64.encode("not json at all");
        let raw = format!(r#"{{"id":"1","query":"q","body":"{b64}"}}"#);
        assert_matches!(decode(&raw), Err(DecodeError::Json(_)));
    }

    #[test]
    fn missing_body_decodes_to_null_payload() {
        let decoded = decode(r#"{"id":"1","query":"pong"}"#).unwrap().unwrap();
        assert_eq!(decoded.body, Value::Null);
        assert_eq!(decoded.id.unwrap().as_str(), "1");
    }

    #[test]
    fn missing_id_is_tolerated() {
        let b64 = BASE64.encode("{}");
        let raw = format!(r#"{{"query":"q","body":"{b64}"}}"#);
        let decoded = decode(&raw).unwrap().unwrap();
        assert!(decoded.id.is_none());
    }

    proptest! {
        #[test]
        fn roundtrip_law_holds_for_string_payloads(
            query in "[a-z_.]{1,32}",
            payload in ".*",
        ) {
            let env = Envelope::encode(&query, &payload).unwrap();
            let decoded = decode(&env.to_wire().unwrap()).unwrap().unwrap();
            prop_assert_eq!(decoded.query, query);
            prop_assert_eq!(decoded.body, Value::String(payload));
        }
    }
}
