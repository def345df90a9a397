//! Error types for the relay.
//!
//! Three kinds of failure exist, and they never mix:
//!
//! - [`RequestError`]: a client request was rejected. Each one becomes
//!   exactly one `Response` on the wire; nothing propagates past
//!   [`MessageHandler::handle`](crate::MessageHandler::handle).
//! - [`ConfigurationError`]: a handler or server was assembled wrong.
//!   Only ever returned at construction time.
//! - [`RelayError`]: the server itself failed (bind, I/O, codec).

use pairlink_protocol::{ProtocolError, Response};
use pairlink_transport::TransportError;

/// Why a request was rejected.
///
/// The `Display` text of each variant is exactly the `error` string sent
/// to the client, so changing one is a protocol change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The request's `id` was below 1.
    #[error("invalid request ID")]
    InvalidRequestId,

    /// The session id failed the validator.
    #[error("invalid session id")]
    InvalidSessionId,

    /// The session key failed the validator.
    #[error("invalid session key")]
    InvalidSessionKey,

    /// A session with this id exists, but under a different key.
    #[error("incorrect session key")]
    IncorrectSessionKey,

    /// A guest asked to join a session nobody has hosted yet.
    #[error("no such session: {0}")]
    NoSuchSession(String),

    /// The request's message tag isn't one we handle.
    #[error("unsupported message")]
    UnsupportedMessage,

    /// A collaborator (store, closed handler) failed. The cause is logged
    /// where it happens and never sent to the client.
    #[error("internal error")]
    Internal,
}

impl RequestError {
    /// Whether the connection must be closed after reporting this error.
    ///
    /// Everything is fatal except [`NoSuchSession`](Self::NoSuchSession):
    /// a guest may keep polling until the host has created the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoSuchSession(_))
    }

    /// Builds the wire response for this error.
    pub fn into_response(self, request_id: i64) -> Response {
        let fatal = self.is_fatal();
        Response::error(request_id, self.to_string(), fatal)
    }
}

/// A [`MessageHandler`](crate::MessageHandler) or
/// [`RelayServer`](crate::RelayServer) was configured incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No outbound response sender was supplied.
    #[error("outbound sender must be provided")]
    MissingSender,

    /// No store was supplied.
    #[error("store must be provided")]
    MissingStore,

    /// No pub/sub hub was supplied.
    #[error("pubsub hub must be provided")]
    MissingPubSub,

    /// The outbound sender's receiver is already gone, so no response
    /// could ever be delivered.
    #[error("outbound channel is already closed")]
    SenderClosed,

    /// A channel capacity of zero was requested.
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),
}

/// Top-level error for running the relay.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server or a handler was misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display_matches_wire_strings() {
        assert_eq!(RequestError::InvalidRequestId.to_string(), "invalid request ID");
        assert_eq!(RequestError::InvalidSessionId.to_string(), "invalid session id");
        assert_eq!(RequestError::InvalidSessionKey.to_string(), "invalid session key");
        assert_eq!(
            RequestError::IncorrectSessionKey.to_string(),
            "incorrect session key"
        );
        assert_eq!(
            RequestError::NoSuchSession("abc".into()).to_string(),
            "no such session: abc"
        );
        assert_eq!(RequestError::UnsupportedMessage.to_string(), "unsupported message");
        assert_eq!(RequestError::Internal.to_string(), "internal error");
    }

    #[test]
    fn test_request_error_only_no_such_session_is_non_fatal() {
        assert!(!RequestError::NoSuchSession("abc".into()).is_fatal());

        for err in [
            RequestError::InvalidRequestId,
            RequestError::InvalidSessionId,
            RequestError::InvalidSessionKey,
            RequestError::IncorrectSessionKey,
            RequestError::UnsupportedMessage,
            RequestError::Internal,
        ] {
            assert!(err.is_fatal(), "{err} should be fatal");
        }
    }

    #[test]
    fn test_request_error_into_response_echoes_id() {
        let res = RequestError::InvalidRequestId.into_response(-4);
        assert_eq!(res, Response::error(-4, "invalid request ID", true));
    }

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::other("gone"));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_configuration_error() {
        let relay_err: RelayError = ConfigurationError::MissingStore.into();
        assert!(matches!(relay_err, RelayError::Configuration(_)));
        assert_eq!(relay_err.to_string(), "store must be provided");
    }
}
