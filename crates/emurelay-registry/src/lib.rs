//! Room registry and relay routing for Emurelay.
//!
//! This crate is the relay's heart: it owns every live player record,
//! every active room, and the session index that maps caller-chosen
//! session ids onto room codes. It decides who may join what, who
//! becomes host when the host leaves, and which connections receive
//! each relayed payload.
//!
//! # Key types
//!
//! - [`Registry`] — all shared state plus every lifecycle and relay
//!   operation
//! - [`Player`] / [`Room`] — the records the registry owns
//! - [`RegistryError`] — request-scoped failures
//!
//! # Concurrency
//!
//! `Registry` is NOT thread-safe by itself — all maps are plain
//! `HashMap`s and every operation is synchronous. The hub wraps it in
//! one `tokio::sync::Mutex`, which serializes all mutations and makes
//! compound operations (session lookup-miss followed by room creation,
//! room destruction together with session-index cleanup) atomic by
//! construction. Event delivery is fire-and-forget through unbounded
//! per-player channels, so no operation ever blocks on a slow receiver.

mod error;
mod player;
mod registry;
mod room;
mod router;

pub use error::RegistryError;
pub use player::{EventSink, Player};
pub use registry::{NewSession, Registry};
pub use room::Room;
