//! Codec: converts events to and from frame text.
//!
//! The transport carries UTF-8 text frames; something has to turn a
//! [`ServerEvent`](crate::ServerEvent) into one and parse a
//! [`ClientEvent`](crate::ClientEvent) back out. That something is a
//! [`Codec`]. The trait exists so the hub can swap the encoding without
//! touching routing code; [`JsonCodec`] is the only implementation and
//! matches what browser clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to frame text and decodes frame text back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses one frame into a value.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// JSON codec via `serde_json`. Human-readable on the wire, which is
/// what the browser-side client expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
