/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a connection or completing its upgrade failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Sending a frame failed; the peer is likely gone.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// The peer sent a binary frame that was not valid UTF-8.
    /// The wire carries JSON events only, so this is a protocol
    /// violation from the peer.
    #[error("non-UTF-8 frame received")]
    InvalidFrame,
}
