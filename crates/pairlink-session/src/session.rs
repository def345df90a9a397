//! The session record: what the relay persists about a pairing.
//!
//! A session is tiny on purpose. It has an `id` both endpoints agree on,
//! and a `key` only they know. Whoever presents the right key for an id
//! may host it or join it. Nothing else about the endpoints is recorded.

use serde::{Deserialize, Serialize};

/// Namespace prepended to a session id to form its store key.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// A pairing context: an identifier guarded by a shared secret.
///
/// Once a session has been persisted its `key` never changes. A lookup
/// with a different key is rejected, never "corrected".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The session identifier both endpoints use.
    pub id: String,

    /// The shared secret. Anyone presenting it may bind to the session.
    pub key: String,
}

impl Session {
    /// Creates a session record. Formats are not checked here, that's the
    /// [`SessionValidator`](crate::SessionValidator)'s job.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }

    /// The key this session is stored under.
    pub fn store_key(&self) -> String {
        Self::store_key_for(&self.id)
    }

    /// The store key for a session id, without building a `Session`.
    ///
    /// Only the id participates, so a lookup can be made before the key
    /// has been checked.
    pub fn store_key_for(id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{id}")
    }

    /// Returns `true` if `key` matches this session's secret.
    pub fn key_matches(&self, key: &str) -> bool {
        self.key == key
    }
}
