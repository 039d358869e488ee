//! `HatboxServer` builder and accept loop.
//!
//! This is the entry point for running a hat-game server. It ties
//! together all the layers: transport → protocol → room.

use std::sync::Arc;

use hatbox_protocol::JsonCodec;
use hatbox_room::{DEFAULT_CHANNEL_SIZE, NumberedWords, RoomRegistry, WordSource};
use hatbox_timer::TurnTimings;
use hatbox_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::HatboxError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry mutex guards only map operations; room commands go through
/// handles after the lock is dropped.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a hatbox server.
///
/// # Example
///
/// ```rust,ignore
/// use hatbox::prelude::*;
///
/// let server = HatboxServer::builder()
///     .bind("0.0.0.0:5000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct HatboxServerBuilder {
    bind_addr: String,
    timings: TurnTimings,
    words: Arc<dyn WordSource>,
    channel_capacity: usize,
}

impl HatboxServerBuilder {
    /// Creates a new builder with default settings: loopback bind,
    /// shipped timings, numbered placeholder words.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            timings: TurnTimings::default(),
            words: Arc::new(NumberedWords::default()),
            channel_capacity: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the explanation-phase timings for every room.
    pub fn timings(mut self, timings: TurnTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Sets the source of word pools for new games.
    pub fn word_source(mut self, words: Arc<dyn WordSource>) -> Self {
        self.words = words;
        self
    }

    /// Sets the command-queue capacity of each room actor.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, matching the wire
    /// format hat-game clients speak.
    pub async fn build(self) -> Result<HatboxServer, HatboxError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(
                self.timings.validated(),
                self.words,
                self.channel_capacity,
            )),
            codec: JsonCodec,
        });

        Ok(HatboxServer { transport, state })
    }
}

impl Default for HatboxServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running hat-game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HatboxServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl HatboxServer {
    /// Creates a new builder.
    pub fn builder() -> HatboxServerBuilder {
        HatboxServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), HatboxError> {
        tracing::info!("hatbox server running");

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
