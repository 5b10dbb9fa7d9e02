//! Error types for the refund channel.

/// Boxed error source from a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of the underlying duplex connection.
///
/// Transport failures always lead to a reconnect, never to a rejection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(#[source] BoxError),
    /// A frame could not be sent.
    #[error("send failed: {0}")]
    Send(#[source] BoxError),
    /// A frame could not be received.
    #[error("receive failed: {0}")]
    Receive(#[source] BoxError),
    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
}

/// Fatal channel misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel URL is not `ws://` or `wss://`.
    #[error("refund channel URL must use ws or wss, got {0:?}")]
    UnsupportedScheme(String),
}
