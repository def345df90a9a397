//! Error types for the transport layer.

/// Errors that can occur while accepting or talking to a connection.
///
/// Each variant keeps the underlying I/O error as its source so the
/// connection loop can log the real cause.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame failed; the peer is most likely gone.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed (protocol violation or reset).
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding, accepting, or the WebSocket upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
