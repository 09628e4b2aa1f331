//! # Emurelay
//!
//! WebSocket session relay for browser-based multiplayer emulation.
//!
//! One player runs the emulator and hosts a room; everyone else joins
//! by room code or lobby session and receives the host's input and
//! state frames. The relay never interprets gameplay payloads — it
//! tracks who is in which room and forwards traffic accordingly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use emurelay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServerBuilder::new()
//!     .bind("0.0.0.0:5000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Commonly used types, re-exported for embedding and tests.
pub mod prelude {
    pub use crate::{RelayError, RelayServer, RelayServerBuilder};
    pub use emurelay_protocol::{
        ClientEvent, Codec, GameMeta, JsonCodec, PlayerId, Role, RoomCode,
        ServerEvent, SessionStatus, SessionSummary,
    };
    pub use emurelay_registry::{NewSession, Registry, RegistryError};
    pub use emurelay_transport::{
        Connection, ConnectionId, Transport, TransportError,
    };
}
