//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an event to frame text failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame could not be parsed as a known event. Covers malformed
    /// JSON, unknown event names, and wrongly-typed fields.
    #[error("invalid request: {0}")]
    Decode(#[source] serde_json::Error),
}
