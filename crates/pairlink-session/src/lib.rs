//! Session records and their persistence contract for Pairlink.
//!
//! This crate holds everything the relay knows about a session:
//!
//! 1. **The record**: [`Session`]: an id plus a shared secret key, stored
//!    under a key derived from the id alone.
//! 2. **Format checks**: the [`SessionValidator`] trait, with
//!    [`HexValidator`] as the default grammar.
//! 3. **Persistence**: the [`Store`] trait that the handler reads and
//!    writes sessions through, plus an in-process [`MemoryStore`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Message handler (above)  ← finds, creates, and binds sessions
//!     ↕
//! Session layer (this crate)  ← records, validation, storage contract
//!     ↕
//! Durable backend (outside)  ← anything that implements `Store`
//! ```

mod error;
mod session;
mod store;
mod validate;

pub use error::StoreError;
pub use session::{SESSION_KEY_PREFIX, Session};
pub use store::{MemoryStore, Store};
pub use validate::{HexValidator, SessionValidator};
