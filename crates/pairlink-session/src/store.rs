//! The store contract, and an in-memory implementation of it.
//!
//! The relay persists sessions through [`Store`]. Production deployments
//! back it with something durable. [`MemoryStore`] keeps everything in a
//! `HashMap`, which is enough for tests, demos, and single-node setups
//! that don't need sessions to survive a restart.
//!
//! # Concurrency note
//!
//! One store is shared by every connection handler, so implementations
//! must make each `get`/`set` atomic on its own. Creating a session is
//! the one read-then-write the relay does; [`Store::set_if_absent`] exists
//! for it. Nothing in the relay needs multi-key transactions.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio::sync::RwLock;

use crate::StoreError;

/// Key-value persistence for relay records.
///
/// Values are anything serde can handle. Implementations decide the
/// encoding; callers only see typed values.
///
/// Methods return `impl Future + Send` (rather than plain `async fn`) so
/// that handlers holding a store can be driven from spawned Tokio tasks.
/// Implementors can still write `async fn`.
pub trait Store: Send + Sync + 'static {
    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// [`StoreError::Serialize`] if the value can't be encoded,
    /// [`StoreError::Backend`] if the write fails.
    fn set<T>(
        &self,
        key: &str,
        value: &T,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send
    where
        T: Serialize + Sync;

    /// Reads the value under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there. A missing record is
    /// a normal outcome, not an error.
    ///
    /// # Errors
    /// [`StoreError::Deserialize`] if the stored value isn't a `T`,
    /// [`StoreError::Backend`] if the read fails.
    fn get<T>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<T>, StoreError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Writes `value` under `key` only if nothing is stored there yet.
    ///
    /// Returns `Ok(true)` if this call wrote the value, `Ok(false)` if a
    /// value was already present (it is left untouched).
    ///
    /// The default is a `get` followed by a `set`, so two callers racing
    /// on the same fresh key can both see it empty and the later write
    /// wins. Backends that can do better (a lock, `SETNX`, a conditional
    /// put) should override it; [`MemoryStore`] does.
    ///
    /// # Errors
    /// Whatever `get` or `set` return.
    fn set_if_absent<T>(
        &self,
        key: &str,
        value: &T,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            if self.get::<IgnoredAny>(key).await?.is_some() {
                return Ok(false);
            }
            self.set(key, value).await?;
            Ok(true)
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`Store`] that keeps JSON-encoded values in memory.
///
/// Values are stored encoded (not as `Box<dyn Any>`) so that a round trip
/// through `MemoryStore` behaves like a real backend: a `get` returns a
/// fresh copy, and asking for the wrong type is a deserialize error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Encoded values keyed by store key.
    ///
    /// `RwLock` lets many lookups run at once; writes are exclusive.
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the value under `key`. Returns `true` if there was one.
    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Returns `true` if a value is stored under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Returns the number of stored values.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Store for MemoryStore {
    async fn set<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        // Encode before taking the lock so a slow serializer never
        // blocks other connections.
        let bytes =
            serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })?;

        self.entries.write().await.insert(key.to_string(), bytes);
        tracing::trace!(key, "value stored");
        Ok(())
    }

    async fn get<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        // Clone the bytes out so the read lock is released before decoding.
        let bytes = match self.entries.read().await.get(key) {
            Some(bytes) => bytes.clone(),
            None => return Ok(None),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Deserialize {
                key: key.to_string(),
                source,
            })
    }

    async fn set_if_absent<T>(&self, key: &str, value: &T) -> Result<bool, StoreError>
    where
        T: Serialize + Sync,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })?;

        // Check and insert under one write lock.
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), bytes);
        tracing::trace!(key, "value stored");
        Ok(true)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Session;

    // =====================================================================
    // get() / set()
    // =====================================================================

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = MemoryStore::new();

        let found: Option<Session> = store.get("session:nope").await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_returns_same_session() {
        let store = MemoryStore::new();
        let session = Session::new("abc", "secret");

        store.set(&session.store_key(), &session).await.unwrap();
        let found: Option<Session> =
            store.get(&session.store_key()).await.unwrap();

        assert_eq!(found, Some(session));
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_value() {
        let store = MemoryStore::new();
        store.set("k", &Session::new("a", "one")).await.unwrap();
        store.set("k", &Session::new("a", "two")).await.unwrap();

        let found: Session = store.get("k").await.unwrap().unwrap();

        assert_eq!(found.key, "two");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_wrong_type_returns_deserialize_error() {
        let store = MemoryStore::new();
        store.set("k", &42u32).await.unwrap();

        let result: Result<Option<Session>, _> = store.get("k").await;

        assert!(
            matches!(result, Err(StoreError::Deserialize { ref key, .. }) if key == "k"),
            "expected Deserialize error, got {result:?}"
        );
    }

    // =====================================================================
    // set_if_absent()
    // =====================================================================

    #[tokio::test]
    async fn test_set_if_absent_empty_key_writes() {
        let store = MemoryStore::new();

        assert!(store.set_if_absent("k", &Session::new("a", "one")).await.unwrap());

        let found: Session = store.get("k").await.unwrap().unwrap();
        assert_eq!(found.key, "one");
    }

    #[tokio::test]
    async fn test_set_if_absent_existing_key_keeps_first_value() {
        let store = MemoryStore::new();
        store.set("k", &Session::new("a", "one")).await.unwrap();

        assert!(!store.set_if_absent("k", &Session::new("a", "two")).await.unwrap());

        let found: Session = store.get("k").await.unwrap().unwrap();
        assert_eq!(found.key, "one");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_set_if_absent_racing_writers_exactly_one_wins() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let session = Session::new("same", format!("key{i}"));
                store.set_if_absent(&session.store_key(), &session).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len().await, 1);
    }

    /// Only `get`/`set`, so `set_if_absent` takes the trait default.
    #[derive(Default)]
    struct PlainStore(MemoryStore);

    impl Store for PlainStore {
        async fn set<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
        where
            T: Serialize + Sync,
        {
            self.0.set(key, value).await
        }

        async fn get<T>(&self, key: &str) -> Result<Option<T>, StoreError>
        where
            T: DeserializeOwned + Send,
        {
            self.0.get(key).await
        }
    }

    #[tokio::test]
    async fn test_set_if_absent_default_respects_existing_value() {
        let store = PlainStore::default();

        assert!(store.set_if_absent("k", &Session::new("a", "one")).await.unwrap());
        assert!(!store.set_if_absent("k", &Session::new("a", "two")).await.unwrap());

        let found: Session = store.get("k").await.unwrap().unwrap();
        assert_eq!(found.key, "one");
    }

    // =====================================================================
    // remove() / contains() / len() / is_empty()
    // =====================================================================

    #[tokio::test]
    async fn test_remove_deletes_value() {
        let store = MemoryStore::new();
        store.set("k", &"v").await.unwrap();
        assert!(store.contains("k").await);

        assert!(store.remove("k").await);
        assert!(!store.remove("k").await, "second remove finds nothing");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_distinct_keys() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let session = Session::new(format!("s{i}"), "k");
                store.set(&session.store_key(), &session).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 16);
    }
}
