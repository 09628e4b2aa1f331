//! Error types for the registry.

use emurelay_protocol::RoomCode;

/// Request-scoped failures. None of these terminate a connection or
/// touch state belonging to other rooms; the hub reports them back to
/// the originating connection as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The given code matches no active room.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// A session-entry operation was called with an empty session id.
    #[error("session ID required")]
    SessionIdRequired,

    /// The session id is unknown, or its room no longer exists.
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// Room-code generation exhausted its retry budget. Only plausible
    /// when the code space is nearly saturated, so it is surfaced as a
    /// capacity error rather than retried forever.
    #[error("no free room codes available")]
    CodesExhausted,

    /// A required field was missing from the request.
    #[error("{0}")]
    InvalidRequest(&'static str),
}
