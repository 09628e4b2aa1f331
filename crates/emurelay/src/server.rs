//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running the relay. It ties together the
//! layers: transport → protocol → registry.

use std::sync::Arc;

use emurelay_protocol::JsonCodec;
use emurelay_registry::Registry;
use emurelay_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::RelayError;
use crate::handler::handle_connection;

/// Shared relay state passed to each connection handler task.
///
/// A single `Mutex` over the whole registry. Every operation is a
/// short map manipulation, so there is nothing to gain from finer
/// locking, and compound operations (session lookup-miss followed by
/// room creation, room destruction with session cleanup) stay atomic
/// without any extra coordination.
pub(crate) struct HubState {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use emurelay::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServerBuilder::new()
///     .bind("0.0.0.0:5000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(HubState {
            registry: Mutex::new(Registry::new()),
            codec: JsonCodec,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: WebSocketTransport,
    state: Arc<HubState>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each
    /// one. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!("relay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
