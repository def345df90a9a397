//! Wire protocol for Pairlink.
//!
//! This crate defines what clients and the relay say to each other:
//!
//! - **Types** ([`Request`], [`Response`], [`MessageKind`], [`Event`]):
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the message
//! handler (sessions and topics). It knows nothing about either.
//!
//! ```text
//! Transport (frames) → Protocol (Request/Response) → Handler (sessions)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Event, HOST_SESSION, JOIN_SESSION, MessageKind, Request, Response,
};
