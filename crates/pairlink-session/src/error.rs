//! Error types for the session layer.

/// Errors a [`Store`](crate::Store) can return.
///
/// The message handler never shows these to clients. It logs them and
/// answers with a generic "internal error".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The value couldn't be turned into bytes for storage.
    #[error("failed to serialize value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stored bytes couldn't be turned back into the requested type.
    /// Usually means the record was written by an incompatible version.
    #[error("failed to deserialize value for {key}: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend itself failed (connection lost, timeout, disk full...).
    #[error("store backend error: {0}")]
    Backend(String),
}
