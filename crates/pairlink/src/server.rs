//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a Pairlink relay. It ties the
//! layers together: transport → protocol → message handler → store/hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pairlink_protocol::{Event, JsonCodec};
use pairlink_pubsub::PubSub;
use pairlink_session::{HexValidator, SessionValidator, Store};
use pairlink_transport::{Transport, WebSocketTransport};

use crate::connection::handle_connection;
use crate::handler::DEFAULT_SUBSCRIPTION_CAPACITY;
use crate::{ConfigurationError, RelayError};

/// Tunables for a [`RelayServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on. Port `0` picks a free port.
    pub bind_addr: String,
    /// A connection that hasn't bound a session and sends nothing for this
    /// long is closed. Bound connections are never timed out.
    pub idle_timeout_secs: u64,
    /// Responses that may queue per connection before `handle` waits.
    pub outbound_capacity: usize,
    /// Published events that may queue per connection.
    pub subscription_capacity: usize,
}

impl ServerConfig {
    /// The idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Checks that every channel capacity is usable.
    ///
    /// # Errors
    /// [`ConfigurationError::ZeroCapacity`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.outbound_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity("outbound capacity"));
        }
        if self.subscription_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity(
                "subscription capacity",
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 60,
            outbound_capacity: 32,
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
        }
    }
}

/// Shared server state passed to each connection task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The store
/// and hub synchronize internally, so nothing here needs a lock.
pub(crate) struct ServerState<S: Store, V: SessionValidator> {
    pub(crate) store: Arc<S>,
    pub(crate) pubsub: Arc<PubSub<Event>>,
    pub(crate) validator: Arc<V>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use pairlink::prelude::*;
///
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(MemoryStore::new()))
///     .await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder<V = HexValidator> {
    config: ServerConfig,
    validator: Arc<V>,
}

impl RelayServerBuilder<HexValidator> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            validator: Arc::new(HexValidator::default()),
        }
    }
}

impl Default for RelayServerBuilder<HexValidator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: SessionValidator> RelayServerBuilder<V> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration, bind address included.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the validator every connection checks session ids and keys
    /// with.
    pub fn validator<W: SessionValidator>(self, validator: W) -> RelayServerBuilder<W> {
        RelayServerBuilder {
            config: self.config,
            validator: Arc::new(validator),
        }
    }

    /// Binds the listener and assembles the server around `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// [`RelayError::Configuration`] for an invalid config,
    /// [`RelayError::Transport`] if the address can't be bound.
    pub async fn build<S: Store>(
        self,
        store: Arc<S>,
    ) -> Result<RelayServer<S, V>, RelayError> {
        self.config.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            store,
            pubsub: Arc::new(PubSub::new()),
            validator: self.validator,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RelayServer { transport, state })
    }
}

/// A relay ready to accept connections.
///
/// Call [`run()`](Self::run) to start accepting.
pub struct RelayServer<S: Store, V: SessionValidator = HexValidator> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, V>>,
}

impl RelayServer<pairlink_session::MemoryStore, HexValidator> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<S: Store, V: SessionValidator> RelayServer<S, V> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The hub connections subscribe to. Publish on `h.<id>` or `g.<id>`
    /// to reach a session's host or guest.
    pub fn pubsub(&self) -> Arc<PubSub<Event>> {
        Arc::clone(&self.state.pubsub)
    }

    /// The session store.
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.state.store)
    }

    /// The active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop.
    ///
    /// Spawns a task per accepted connection. Runs until the process is
    /// terminated; a failed accept is logged and the loop continues.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Pairlink relay running");

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
