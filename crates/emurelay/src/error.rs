//! Unified error type for the relay binary and its embedding API.

use emurelay_protocol::ProtocolError;
use emurelay_registry::RegistryError;
use emurelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When embedding the `emurelay` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (room or session lookup, code space).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use emurelay_protocol::RoomCode;

    #[test]
    fn from_transport_error() {
        let err = TransportError::InvalidFrame;
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("non-UTF-8"));
    }

    #[test]
    fn from_protocol_error() {
        let source: Result<emurelay_protocol::ClientEvent, _> =
            serde_json::from_str("{");
        let relay_err: RelayError =
            ProtocolError::Decode(source.unwrap_err()).into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
    }

    #[test]
    fn from_registry_error() {
        let err = RegistryError::RoomNotFound(RoomCode::normalized("AB12CD"));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Registry(_)));
        assert!(relay_err.to_string().contains("AB12CD"));
    }
}
