//! Wire protocol for Emurelay.
//!
//! Every frame on the wire is one JSON object of the shape
//! `{ "event": "<name>", "data": { ... } }`. This crate defines the
//! event catalogue ([`ClientEvent`], [`ServerEvent`]), the identifier
//! and metadata types they carry ([`PlayerId`], [`RoomCode`],
//! [`GameMeta`], [`SessionSummary`]), and the [`Codec`] that converts
//! events to and from frame text.
//!
//! The protocol layer knows nothing about connections or rooms — it
//! only describes what travels between a client and the relay.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, GameMeta, PlayerId, Role, RoomCode, ServerEvent,
    SessionStatus, SessionSummary,
};
