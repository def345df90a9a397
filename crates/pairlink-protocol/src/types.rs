//! Core protocol types for Pairlink's wire format.
//!
//! Everything in this module travels "on the wire": a client sends
//! [`Request`]s, the relay answers each one with exactly one [`Response`],
//! and anything published on a session topic reaches the client as an
//! [`Event`].
//!
//! The JSON shapes are fixed by deployed clients, so the serde attributes
//! here matter as much as the field types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire tag for a host claiming (or re-claiming) a session.
pub const HOST_SESSION: &str = "hostSession";

/// Wire tag for a guest joining an existing session.
pub const JOIN_SESSION: &str = "joinSession";

// ---------------------------------------------------------------------------
// MessageKind: what a request asks for
// ---------------------------------------------------------------------------

/// The operation a [`Request`] names.
///
/// On the wire this is a plain string (`"hostSession"`, `"joinSession"`,
/// ...). We map it to a closed enum at the serde boundary so that the
/// handler matches on variants, never on raw strings.
///
/// `#[serde(from = "String", into = "String")]` tells serde to go through
/// the `From` impls below instead of the default enum representation. The
/// mapping is total: any tag we don't recognize becomes
/// [`MessageKind::Unsupported`] carrying the original string, so decoding a
/// request never fails just because its tag is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// `"hostSession"`: create or resume a session as its host.
    HostSession,

    /// `"joinSession"`: join an existing session as its guest.
    JoinSession,

    /// Any other tag, kept verbatim for logging.
    Unsupported(String),
}

impl MessageKind {
    /// Returns the wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HostSession => HOST_SESSION,
            Self::JoinSession => JOIN_SESSION,
            Self::Unsupported(tag) => tag,
        }
    }
}

/// A request with no `message` field decodes as an empty, unsupported tag.
impl Default for MessageKind {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            HOST_SESSION => Self::HostSession,
            JOIN_SESSION => Self::JoinSession,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unsupported(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request: client → relay
// ---------------------------------------------------------------------------

/// A single client request.
///
/// ```text
/// { "id": 1, "message": "hostSession", "data": { "id": "...", "key": "..." } }
/// ```
///
/// Every field has a serde default. A request that omits its `id` decodes
/// with id `0` and is then rejected by the handler as an invalid request ID,
/// rather than failing to decode at all. The handler, not the codec, owns
/// the protocol rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Caller-chosen correlation id, echoed back in the [`Response`].
    /// Valid ids are `>= 1`; signed so that bad ids still decode and can be
    /// echoed.
    #[serde(default)]
    pub id: i64,

    /// Which operation to perform.
    #[serde(default)]
    pub message: MessageKind,

    /// Operation-specific parameters.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl Request {
    /// Creates a request with the given parameters.
    pub fn new<I, K, V>(id: i64, message: MessageKind, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id,
            message,
            data: data
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response: relay → client
// ---------------------------------------------------------------------------

/// The relay's answer to one [`Request`].
///
/// ```text
/// { "requestId": 1 }                                         ← success
/// { "requestId": 1, "error": "invalid session id", "fatal": true }
/// ```
///
/// `fatal` tells the client (and the relay's own connection loop) whether
/// the connection is about to be closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The `id` of the request this answers, even if that id was invalid.
    pub request_id: i64,

    /// Empty on success. Skipped in JSON when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// `true` means the connection must be closed after this response.
    #[serde(default, skip_serializing_if = "is_false")]
    pub fatal: bool,
}

impl Response {
    /// A success response for `request_id`.
    pub fn ok(request_id: i64) -> Self {
        Self {
            request_id,
            error: String::new(),
            fatal: false,
        }
    }

    /// An error response for `request_id`.
    pub fn error(
        request_id: i64,
        message: impl Into<String>,
        fatal: bool,
    ) -> Self {
        Self {
            request_id,
            error: message.into(),
            fatal,
        }
    }

    /// Returns `true` if this response carries no error.
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Event: published on a session topic
// ---------------------------------------------------------------------------

/// An opaque message published on a session topic and delivered to every
/// connection subscribed to it.
///
/// The relay never looks inside events; what host and guest say to each
/// other is their business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event name chosen by the publisher.
    pub event: String,

    /// Event payload.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl Event {
    /// Creates an event with an empty payload.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: HashMap::new(),
        }
    }

    /// Adds one payload field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. Clients parse these messages directly, so a
    //! renamed field is a protocol break.

    use super::*;

    // =====================================================================
    // MessageKind
    // =====================================================================

    #[test]
    fn test_message_kind_known_tags_map_to_variants() {
        assert_eq!(MessageKind::from("hostSession"), MessageKind::HostSession);
        assert_eq!(MessageKind::from("joinSession"), MessageKind::JoinSession);
    }

    #[test]
    fn test_message_kind_unknown_tag_is_kept_verbatim() {
        let kind = MessageKind::from("publishEvent");
        assert_eq!(kind, MessageKind::Unsupported("publishEvent".into()));
        assert_eq!(kind.to_string(), "publishEvent");
    }

    #[test]
    fn test_message_kind_tags_are_case_sensitive() {
        assert!(matches!(
            MessageKind::from("HostSession"),
            MessageKind::Unsupported(_)
        ));
    }

    #[test]
    fn test_message_kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&MessageKind::JoinSession).unwrap();
        assert_eq!(json, "\"joinSession\"");
    }

    // =====================================================================
    // Request
    // =====================================================================

    #[test]
    fn test_request_decodes_wire_shape() {
        let json = r#"{
            "id": 7,
            "message": "hostSession",
            "data": { "id": "abc", "key": "def" }
        }"#;
        let req: Request = serde_json::from_str(json).unwrap();

        assert_eq!(req.id, 7);
        assert_eq!(req.message, MessageKind::HostSession);
        assert_eq!(req.data["id"], "abc");
        assert_eq!(req.data["key"], "def");
    }

    #[test]
    fn test_request_missing_fields_take_defaults() {
        // Missing fields must not fail decoding; the handler rejects
        // the request with a proper response instead.
        let req: Request = serde_json::from_str("{}").unwrap();

        assert_eq!(req.id, 0);
        assert_eq!(req.message, MessageKind::Unsupported(String::new()));
        assert!(req.data.is_empty());
    }

    #[test]
    fn test_request_negative_id_decodes() {
        let req: Request =
            serde_json::from_str(r#"{"id": -3, "message": "joinSession"}"#)
                .unwrap();
        assert_eq!(req.id, -3);
    }

    #[test]
    fn test_request_new_collects_data() {
        let req = Request::new(
            1,
            MessageKind::JoinSession,
            [("id", "s"), ("key", "k")],
        );
        assert_eq!(req.data.len(), 2);
        assert_eq!(req.data["key"], "k");
    }

    #[test]
    fn test_request_non_string_data_value_fails() {
        let json = r#"{"id": 1, "message": "hostSession", "data": {"id": 5}}"#;
        let result: Result<Request, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    // =====================================================================
    // Response
    // =====================================================================

    #[test]
    fn test_response_ok_json_omits_error_and_fatal() {
        let json = serde_json::to_value(Response::ok(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "requestId": 3 }));
    }

    #[test]
    fn test_response_error_json_format() {
        let res = Response::error(4, "invalid session id", true);
        let json = serde_json::to_value(&res).unwrap();

        assert_eq!(json["requestId"], 4);
        assert_eq!(json["error"], "invalid session id");
        assert_eq!(json["fatal"], true);
    }

    #[test]
    fn test_response_non_fatal_error_omits_fatal() {
        let res = Response::error(5, "no such session: abc", false);
        let json = serde_json::to_value(&res).unwrap();

        assert_eq!(json["error"], "no such session: abc");
        assert!(json.get("fatal").is_none());
    }

    #[test]
    fn test_response_decodes_minimal_success() {
        let res: Response = serde_json::from_str(r#"{"requestId": 9}"#).unwrap();
        assert_eq!(res, Response::ok(9));
        assert!(res.is_ok());
    }

    // =====================================================================
    // Event
    // =====================================================================

    #[test]
    fn test_event_json_format() {
        let event = Event::new("Web3Request").with("id", "42");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "Web3Request");
        assert_eq!(json["data"]["id"], "42");
    }
}
