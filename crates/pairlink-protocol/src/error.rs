//! Error types for the protocol layer.
//!
//! Each Pairlink crate defines its own error enum, so a `ProtocolError`
//! always means "the bytes were wrong", never "the network broke" or
//! "the store failed".

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, or a field with the wrong type
    /// (e.g. a number where `data` expects strings).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but can't be used as a message, e.g. it isn't
    /// valid UTF-8 for a text codec.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
