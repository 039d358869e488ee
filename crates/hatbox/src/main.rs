//! Server binary: installs tracing, reads `HATBOX_ADDR`, runs forever.

use hatbox::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("HATBOX_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let server = HatboxServer::builder().bind(&addr).build().await?;
    tracing::info!(addr = %server.local_addr(), "hatbox listening");

    server.run().await?;
    Ok(())
}
