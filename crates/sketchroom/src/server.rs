//! `SketchroomServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::sync::Arc;
use std::time::Duration;

use sketchroom_protocol::{Codec, JsonCodec};
use sketchroom_room::{RoomConfig, RoomRegistry, RoomStore, WordSource};
use sketchroom_transport::{Transport, WebSocketTransport};

use crate::SketchroomError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S, W, C> {
    pub(crate) rooms: RoomRegistry<S, W>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Sketchroom server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sketchroom::prelude::*;
///
/// # async fn run() -> Result<(), SketchroomError> {
/// let server = SketchroomServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(MemoryStore::new()), Arc::new(StaticWordSource::builtin()))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct SketchroomServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
}

impl SketchroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the template config for new rooms.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Drops connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and prepares the server.
    pub async fn build<S: RoomStore, W: WordSource>(
        self,
        store: Arc<S>,
        words: Arc<W>,
    ) -> Result<SketchroomServer<S, W, JsonCodec>, SketchroomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomRegistry::new(store, words, self.room_config),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(SketchroomServer { transport, state })
    }
}

impl Default for SketchroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Sketchroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SketchroomServer<S, W, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, W, C>>,
}

impl SketchroomServer<(), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> SketchroomServerBuilder {
        SketchroomServerBuilder::new()
    }
}

impl<S, W, C> SketchroomServer<S, W, C>
where
    S: RoomStore,
    W: WordSource,
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own handler task.
    pub async fn run(mut self) -> Result<(), SketchroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "sketchroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
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
