//! Relay server binary.
//!
//! Binds to `EMURELAY_ADDR` (default `0.0.0.0:5000`) and runs until
//! terminated. Log verbosity follows `RUST_LOG`.

use emurelay::{RelayError, RelayServerBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("EMURELAY_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let server = RelayServerBuilder::new().bind(&addr).build().await?;
    if let Ok(local) = server.local_addr() {
        tracing::info!(%local, "listening");
    }
    server.run().await
}
