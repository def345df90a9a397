//! # Pairlink
//!
//! A relay that pairs two clients, a host and a guest, around a session
//! they both know the key to.
//!
//! A host sends `hostSession` with a session id and key; the relay creates
//! the session (or resumes it if the key matches) and subscribes the
//! connection to the host topic `h.<id>`. A guest sends `joinSession`
//! with the same pair and is subscribed to `g.<id>`. Anything published on
//! those topics is forwarded to the matching connection.
//!
//! The heart of the crate is [`MessageHandler`], one per connection. The
//! [`RelayServer`] wraps it in a WebSocket accept loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pairlink::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(Arc::new(MemoryStore::new()))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod connection;
mod error;
mod handler;
mod role;
mod server;

pub use error::{ConfigurationError, RelayError, RequestError};
pub use handler::{DEFAULT_SUBSCRIPTION_CAPACITY, MessageHandler, MessageHandlerBuilder};
pub use role::Role;
pub use server::{RelayServer, RelayServerBuilder, ServerConfig};

pub use pairlink_protocol as protocol;
pub use pairlink_pubsub as pubsub;
pub use pairlink_session as session;
pub use pairlink_transport as transport;

/// Everything needed to run a relay or drive a handler by hand.
pub mod prelude {
    pub use crate::{
        ConfigurationError, MessageHandler, MessageHandlerBuilder, RelayError,
        RelayServer, RelayServerBuilder, RequestError, Role, ServerConfig,
    };
    pub use pairlink_protocol::{Event, MessageKind, Request, Response};
    pub use pairlink_pubsub::PubSub;
    pub use pairlink_session::{
        HexValidator, MemoryStore, Session, SessionValidator, Store, StoreError,
    };
}
