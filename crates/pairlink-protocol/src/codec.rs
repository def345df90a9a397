//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The relay doesn't care HOW messages are serialized, it just needs
//! something that implements [`Codec`].
//!
//! Today the only codec is [`JsonCodec`]: the browser and mobile clients
//! speak JSON text frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task in the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Serializes a value into a text frame.
    ///
    /// The default goes through [`encode`](Self::encode) and requires the
    /// output to be UTF-8. Text codecs can override it to skip the check.
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` if the encoded bytes aren't UTF-8.
    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|e| {
            ProtocolError::InvalidMessage(format!("not utf-8: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use pairlink_protocol::{Codec, JsonCodec, MessageKind, Request};
///
/// let codec = JsonCodec;
///
/// let req: Request = codec
///     .decode(br#"{"id":1,"message":"joinSession","data":{}}"#)
///     .unwrap();
/// assert_eq!(req.message, MessageKind::JoinSession);
///
/// let text = codec.encode_text(&req).unwrap();
/// assert!(text.contains("\"joinSession\""));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        // serde_json always produces UTF-8, no need to re-validate.
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Response, Request};

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<Request, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encode_text_matches_wire_shape() {
        let text = JsonCodec
            .encode_text(&Response::error(2, "unsupported message", true))
            .unwrap();
        assert_eq!(
            text,
            r#"{"requestId":2,"error":"unsupported message","fatal":true}"#
        );
    }

    #[test]
    fn test_default_encode_text_rejects_non_utf8() {
        // A codec that emits raw bytes can't produce text frames.
        struct RawCodec;

        impl Codec for RawCodec {
            fn encode<T: Serialize>(
                &self,
                _value: &T,
            ) -> Result<Vec<u8>, ProtocolError> {
                Ok(vec![0xff, 0xfe])
            }

            fn decode<T: DeserializeOwned>(
                &self,
                _data: &[u8],
            ) -> Result<T, ProtocolError> {
                Err(ProtocolError::InvalidMessage("unused".into()))
            }
        }

        let result = RawCodec.encode_text(&Response::ok(1));
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }
}
